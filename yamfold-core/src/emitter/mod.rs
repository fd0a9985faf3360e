use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use log::trace;
use yamfold_common::{
    CollectionStyle, Event, EventSink, ScalarStyle, Tag, TagDirective, VersionDirective,
    YamlError, YamlResult,
};

use crate::char_utils::is_anchor_char;

mod scalar;

pub use scalar::{looks_like_non_string, EmitResult};
use scalar::{
    analyze, escape_str, write_block_header, write_folded_body,
    write_literal_body, write_single_quoted, write_spaces,
};

const EXPECTED_NODE: &str = "expected SCALAR, SEQUENCE-START, MAPPING-START, or ALIAS";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum EmitterState {
    StreamStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    StreamEnd,
}

struct OpenCollection {
    mapping: bool,
    children: usize,
}

#[derive(Default)]
struct DocumentHeader {
    version: Option<VersionDirective>,
    tags: Vec<TagDirective>,
    implicit: bool,
}

/// Writes structural events as YAML text.
///
/// Events are checked against the stream grammar as they arrive. A document is written out
/// once its `DOCUMENT-END` is received.
#[allow(clippy::module_name_repetitions)]
pub struct YamlEmitter<'a> {
    writer: &'a mut dyn fmt::Write,
    best_indent: usize,
    compact: bool,
    multiline_strings: bool,
    unicode: bool,
    level: isize,
    flow_level: usize,
    state: EmitterState,
    open: Vec<OpenCollection>,
    header: DocumentHeader,
    document: Vec<Event<'static>>,
    documents: usize,
    open_ended: bool,
}

#[derive(Copy, Clone, Default)]
struct Props<'e> {
    anchor: Option<&'e str>,
    tag: Option<&'e Tag>,
}

impl Props<'_> {
    fn is_empty(&self) -> bool {
        self.anchor.is_none() && self.tag.is_none()
    }
}

/// One node of a buffered document.
enum Item<'e> {
    Scalar {
        props: Props<'e>,
        value: &'e str,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    },
    Alias(&'e str),
    Sequence {
        props: Props<'e>,
        style: CollectionStyle,
        items: Vec<Item<'e>>,
    },
    Mapping {
        props: Props<'e>,
        style: CollectionStyle,
        entries: Vec<(Item<'e>, Item<'e>)>,
    },
}

impl Item<'_> {
    fn is_collection(&self) -> bool {
        matches!(self, Item::Sequence { .. } | Item::Mapping { .. })
    }
}

fn build_item<'e>(events: &'e [Event<'static>], pos: &mut usize) -> YamlResult<Item<'e>> {
    let event = events
        .get(*pos)
        .ok_or_else(|| YamlError::emission("document ended inside a node"))?;
    *pos += 1;
    match event {
        Event::Scalar {
            anchor,
            tag,
            value,
            plain_implicit,
            quoted_implicit,
            style,
        } => Ok(Item::Scalar {
            props: Props {
                anchor: anchor.as_deref(),
                tag: tag.as_deref(),
            },
            value: &**value,
            plain_implicit: *plain_implicit,
            quoted_implicit: *quoted_implicit,
            style: *style,
        }),
        Event::Alias { anchor } => Ok(Item::Alias(&**anchor)),
        Event::SequenceStart {
            anchor, tag, style, ..
        } => {
            let mut items = Vec::new();
            while !matches!(events.get(*pos), Some(Event::SequenceEnd)) {
                items.push(build_item(events, pos)?);
            }
            *pos += 1;
            Ok(Item::Sequence {
                props: Props {
                    anchor: anchor.as_deref(),
                    tag: tag.as_deref(),
                },
                style: *style,
                items,
            })
        }
        Event::MappingStart {
            anchor, tag, style, ..
        } => {
            let mut entries = Vec::new();
            while !matches!(events.get(*pos), Some(Event::MappingEnd)) {
                let key = build_item(events, pos)?;
                let value = build_item(events, pos)?;
                entries.push((key, value));
            }
            *pos += 1;
            Ok(Item::Mapping {
                props: Props {
                    anchor: anchor.as_deref(),
                    tag: tag.as_deref(),
                },
                style: *style,
                entries,
            })
        }
        _ => Err(YamlError::emission(EXPECTED_NODE)),
    }
}

fn check_anchor(anchor: &str) -> YamlResult<()> {
    if anchor.is_empty() {
        return Err(YamlError::emission("anchor value must not be empty"));
    }
    if !anchor.bytes().all(is_anchor_char) {
        return Err(YamlError::emission(
            "anchor value must not contain spaces or flow indicators",
        ));
    }
    Ok(())
}

fn check_tag(tag: &Tag) -> YamlResult<()> {
    if tag.handle.is_empty() && tag.suffix.is_empty() {
        return Err(YamlError::emission("tag value must not be empty"));
    }
    Ok(())
}

fn check_props(anchor: Option<&str>, tag: Option<&Tag>) -> YamlResult<()> {
    if let Some(anchor) = anchor {
        check_anchor(anchor)?;
    }
    if let Some(tag) = tag {
        check_tag(tag)?;
    }
    Ok(())
}

fn check_directives(version: Option<VersionDirective>, tags: &[TagDirective]) -> YamlResult<()> {
    if let Some(version) = version {
        if version.major != 1 {
            return Err(YamlError::emission("incompatible %YAML directive"));
        }
    }
    for (i, directive) in tags.iter().enumerate() {
        let handle = directive.handle.as_str();
        if handle.is_empty() {
            return Err(YamlError::emission("tag handle must not be empty"));
        }
        if !handle.starts_with('!') {
            return Err(YamlError::emission("tag handle must start with '!'"));
        }
        if !handle.ends_with('!') {
            return Err(YamlError::emission("tag handle must end with '!'"));
        }
        if handle.len() > 2
            && !handle[1..handle.len() - 1]
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(YamlError::emission(
                "tag handle must contain alphanumerical characters only",
            ));
        }
        if directive.prefix.is_empty() {
            return Err(YamlError::emission("tag prefix must not be empty"));
        }
        if tags[..i].iter().any(|other| other.handle == directive.handle) {
            return Err(YamlError::emission("duplicate %TAG directive"));
        }
    }
    Ok(())
}

impl<'a> YamlEmitter<'a> {
    /// Create a new emitter serializing into `writer`.
    pub fn new(writer: &'a mut dyn fmt::Write) -> Self {
        YamlEmitter {
            writer,
            best_indent: 2,
            compact: true,
            multiline_strings: true,
            unicode: true,
            level: -1,
            flow_level: 0,
            state: EmitterState::StreamStart,
            open: Vec::new(),
            header: DocumentHeader::default(),
            document: Vec::new(),
            documents: 0,
            open_ended: false,
        }
    }

    /// Spaces per indentation level, between 2 and 9.
    pub fn indent(&mut self, indent: usize) {
        self.best_indent = indent.clamp(2, 9);
    }

    #[must_use]
    pub fn best_indent(&self) -> usize {
        self.best_indent
    }

    /// Set 'compact inline notation' on or off, as described for block
    /// [sequences](http://www.yaml.org/spec/1.2/spec.html#id2797382)
    /// and
    /// [mappings](http://www.yaml.org/spec/1.2/spec.html#id2798057).
    ///
    /// With compact notation a collection inside a block sequence starts on the line of its `-`.
    pub fn compact(&mut self, compact: bool) {
        self.compact = compact;
    }

    /// Determine if this emitter is using 'compact inline notation'.
    #[must_use]
    pub fn is_compact(&self) -> bool {
        self.compact
    }

    /// Write multi-line strings of unspecified style as literal blocks.
    pub fn multiline_strings(&mut self, multiline_strings: bool) {
        self.multiline_strings = multiline_strings;
    }

    /// Determine if this emitter will emit multiline strings when appropriate.
    #[must_use]
    pub fn is_multiline_strings(&self) -> bool {
        self.multiline_strings
    }

    /// Write non-ASCII characters as they are. When off they are escaped in double quotes.
    pub fn unicode(&mut self, unicode: bool) {
        self.unicode = unicode;
    }

    #[must_use]
    pub fn is_unicode(&self) -> bool {
        self.unicode
    }

    fn push_content(&mut self, event: Event<'_>) -> YamlResult<()> {
        match &event {
            Event::Scalar {
                anchor,
                tag,
                plain_implicit,
                quoted_implicit,
                ..
            } => {
                check_props(anchor.as_deref(), tag.as_deref())?;
                if tag.is_none() && !plain_implicit && !quoted_implicit {
                    return Err(YamlError::emission(
                        "neither tag nor implicit flags are specified",
                    ));
                }
                self.add_child();
            }
            Event::Alias { anchor } => {
                if anchor.is_empty() {
                    return Err(YamlError::emission("alias value must not be empty"));
                }
                check_anchor(anchor)?;
                self.add_child();
            }
            Event::SequenceStart {
                anchor,
                tag,
                implicit,
                ..
            }
            | Event::MappingStart {
                anchor,
                tag,
                implicit,
                ..
            } => {
                check_props(anchor.as_deref(), tag.as_deref())?;
                if tag.is_none() && !implicit {
                    return Err(YamlError::emission(
                        "neither tag nor implicit flags are specified",
                    ));
                }
                self.add_child();
                self.open.push(OpenCollection {
                    mapping: matches!(event, Event::MappingStart { .. }),
                    children: 0,
                });
            }
            Event::SequenceEnd => match self.open.last() {
                Some(OpenCollection { mapping: false, .. }) => {
                    self.open.pop();
                }
                Some(_) => return Err(YamlError::emission("expected MAPPING-END")),
                None => return Err(YamlError::emission(EXPECTED_NODE)),
            },
            Event::MappingEnd => match self.open.last() {
                Some(OpenCollection {
                    mapping: true,
                    children,
                }) if children % 2 == 0 => {
                    self.open.pop();
                }
                Some(OpenCollection { mapping: true, .. }) => {
                    return Err(YamlError::emission("expected the value of a mapping key"))
                }
                Some(_) => return Err(YamlError::emission("expected SEQUENCE-END")),
                None => return Err(YamlError::emission(EXPECTED_NODE)),
            },
            _ => return Err(YamlError::emission(EXPECTED_NODE)),
        }
        self.document.push(event.into_owned());
        if self.open.is_empty() {
            self.state = EmitterState::DocumentEnd;
        }
        Ok(())
    }

    fn add_child(&mut self) {
        if let Some(open) = self.open.last_mut() {
            open.children += 1;
        }
    }

    fn dump_document(&mut self, events: &[Event<'static>], implicit_end: bool) -> YamlResult<()> {
        let mut pos = 0;
        let root = build_item(events, &mut pos)?;
        let header = mem::take(&mut self.header);
        let has_directives = header.version.is_some() || !header.tags.is_empty();

        if has_directives && self.open_ended {
            writeln!(self.writer, "...")?;
        }
        if let Some(version) = header.version {
            writeln!(self.writer, "%YAML {}.{}", version.major, version.minor)?;
        }
        for directive in &header.tags {
            writeln!(self.writer, "%TAG {} {}", directive.handle, directive.prefix)?;
        }

        self.level = -1;
        self.flow_level = 0;
        let (props, block_collection) = match &root {
            Item::Sequence {
                props,
                style,
                items,
            } => (*props, *style != CollectionStyle::Flow && !items.is_empty()),
            Item::Mapping {
                props,
                style,
                entries,
            } => (*props, *style != CollectionStyle::Flow && !entries.is_empty()),
            _ => (Props::default(), false),
        };
        let marker = !header.implicit
            || has_directives
            || self.documents > 0
            || (block_collection && !props.is_empty());

        if marker {
            self.writer.write_str("---")?;
            if block_collection {
                if !props.is_empty() {
                    self.writer.write_char(' ')?;
                    self.write_props(props, &header.tags)?;
                }
                writeln!(self.writer)?;
                self.emit_block_collection(&root, &header.tags)?;
            } else {
                self.emit_val(false, &root, &header.tags)?;
            }
        } else {
            self.emit_node(&root, &header.tags)?;
        }
        writeln!(self.writer)?;
        if !implicit_end {
            writeln!(self.writer, "...")?;
        }
        self.documents += 1;
        self.open_ended = implicit_end;
        Ok(())
    }

    fn write_indent(&mut self) -> EmitResult {
        if self.level <= 0 {
            return Ok(());
        }
        write_spaces(self.writer, self.level.unsigned_abs() * self.best_indent)
    }

    fn write_props(&mut self, props: Props<'_>, directives: &[TagDirective]) -> EmitResult {
        if let Some(anchor) = props.anchor {
            write!(self.writer, "&{anchor}")?;
        }
        if let Some(tag) = props.tag {
            if props.anchor.is_some() {
                self.writer.write_char(' ')?;
            }
            self.writer.write_str(&tag_text(tag, directives))?;
        }
        Ok(())
    }

    fn is_block_collection(&self, item: &Item<'_>) -> bool {
        self.flow_level == 0
            && match item {
                Item::Sequence { style, items, .. } => {
                    *style != CollectionStyle::Flow && !items.is_empty()
                }
                Item::Mapping { style, entries, .. } => {
                    *style != CollectionStyle::Flow && !entries.is_empty()
                }
                _ => false,
            }
    }

    fn emit_node(&mut self, node: &Item<'_>, directives: &[TagDirective]) -> EmitResult {
        match node {
            Item::Scalar { .. } => {
                let text = self.render_scalar(node, false, directives)?;
                self.writer.write_str(&text)
            }
            Item::Alias(name) => write!(self.writer, "*{name}"),
            Item::Sequence { props, .. } | Item::Mapping { props, .. } => {
                if !self.is_block_collection(node) {
                    if !props.is_empty() {
                        self.write_props(*props, directives)?;
                        self.writer.write_char(' ')?;
                    }
                    return self.emit_flow_collection(node, directives);
                }
                if !props.is_empty() {
                    // Properties of a block collection go on their own line:
                    //       foo: !tag bar: baz // KO
                    //       ---
                    //       foo: !tag // OK
                    //         bar: baz
                    self.write_props(*props, directives)?;
                    self.level += 1;
                    writeln!(self.writer)?;
                    self.write_indent()?;
                    self.level -= 1;
                }
                self.emit_block_collection(node, directives)
            }
        }
    }

    fn emit_block_collection(&mut self, node: &Item<'_>, directives: &[TagDirective]) -> EmitResult {
        match node {
            Item::Sequence { items, .. } => self.emit_sequence(items, directives),
            Item::Mapping { entries, .. } => self.emit_mapping(entries, directives),
            _ => self.emit_node(node, directives),
        }
    }

    fn emit_sequence(&mut self, items: &[Item<'_>], directives: &[TagDirective]) -> EmitResult {
        self.level += 1;
        for (cnt, item) in items.iter().enumerate() {
            if cnt > 0 {
                writeln!(self.writer)?;
                self.write_indent()?;
            }
            self.writer.write_char('-')?;
            self.emit_val(true, item, directives)?;
        }
        self.level -= 1;
        Ok(())
    }

    fn emit_mapping(
        &mut self,
        entries: &[(Item<'_>, Item<'_>)],
        directives: &[TagDirective],
    ) -> EmitResult {
        self.level += 1;
        for (cnt, (key, value)) in entries.iter().enumerate() {
            if cnt > 0 {
                writeln!(self.writer)?;
                self.write_indent()?;
            }
            if key.is_collection() {
                self.writer.write_char('?')?;
                self.emit_val(true, key, directives)?;
                writeln!(self.writer)?;
                self.write_indent()?;
                self.writer.write_char(':')?;
                self.emit_val(true, value, directives)?;
            } else {
                self.emit_key(key, directives)?;
                self.writer.write_char(':')?;
                self.emit_val(false, value, directives)?;
            }
        }
        self.level -= 1;
        Ok(())
    }

    fn emit_key(&mut self, key: &Item<'_>, directives: &[TagDirective]) -> EmitResult {
        match key {
            Item::Alias(name) => write!(self.writer, "*{name} "),
            _ => {
                let text = self.render_scalar(key, true, directives)?;
                self.writer.write_str(&text)
            }
        }
    }

    /// Emit a yaml as a hash or array value: i.e., which should appear
    /// following a ":" or "-", either after a space, or on a new line.
    /// If `inline` is true, then the preceding characters are distinct
    /// and short enough to respect the compact flag.
    fn emit_val(&mut self, inline: bool, val: &Item<'_>, directives: &[TagDirective]) -> EmitResult {
        match val {
            Item::Sequence { props, .. } | Item::Mapping { props, .. }
                if self.is_block_collection(val) =>
            {
                if !props.is_empty() {
                    self.writer.write_char(' ')?;
                    return self.emit_node(val, directives);
                }
                if inline && self.compact {
                    write_spaces(self.writer, self.best_indent - 1)?;
                } else {
                    writeln!(self.writer)?;
                    self.level += 1;
                    self.write_indent()?;
                    self.level -= 1;
                }
                self.emit_block_collection(val, directives)
            }
            Item::Scalar { .. } => {
                let text = self.render_scalar(val, false, directives)?;
                if !text.is_empty() {
                    self.writer.write_char(' ')?;
                    self.writer.write_str(&text)?;
                }
                Ok(())
            }
            _ => {
                self.writer.write_char(' ')?;
                self.emit_node(val, directives)
            }
        }
    }

    fn emit_flow_collection(&mut self, node: &Item<'_>, directives: &[TagDirective]) -> EmitResult {
        self.flow_level += 1;
        match node {
            Item::Sequence { items, .. } => {
                self.writer.write_char('[')?;
                for (cnt, item) in items.iter().enumerate() {
                    if cnt > 0 {
                        self.writer.write_str(", ")?;
                    }
                    self.emit_node(item, directives)?;
                }
                self.writer.write_char(']')?;
            }
            Item::Mapping { entries, .. } => {
                self.writer.write_char('{')?;
                for (cnt, (key, value)) in entries.iter().enumerate() {
                    if cnt > 0 {
                        self.writer.write_str(", ")?;
                    }
                    if key.is_collection() {
                        self.emit_node(key, directives)?;
                    } else {
                        self.emit_key(key, directives)?;
                    }
                    self.writer.write_char(':')?;
                    self.emit_val(false, value, directives)?;
                }
                self.writer.write_char('}')?;
            }
            _ => self.emit_node(node, directives)?,
        }
        self.flow_level -= 1;
        Ok(())
    }

    /// Properties and text of a scalar, in the style it will be written in.
    fn render_scalar(
        &self,
        node: &Item<'_>,
        simple_key: bool,
        directives: &[TagDirective],
    ) -> Result<String, fmt::Error> {
        let Item::Scalar {
            props,
            value,
            plain_implicit,
            quoted_implicit,
            style,
        } = node
        else {
            return Ok(String::new());
        };
        let style = self.select_style(
            value,
            *style,
            *plain_implicit,
            props.tag.is_some(),
            simple_key,
        );
        trace!("Writing {value:?} as {style:?}");

        let mut out = String::new();
        if let Some(anchor) = props.anchor {
            out.push('&');
            out.push_str(anchor);
        }
        let implicit = if style == ScalarStyle::Plain {
            *plain_implicit
        } else {
            *quoted_implicit
        };
        if let Some(tag) = props.tag.filter(|_| !implicit) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&tag_text(tag, directives));
        }
        if !out.is_empty() && !(style == ScalarStyle::Plain && value.is_empty()) {
            out.push(' ');
        }

        match style {
            ScalarStyle::Any | ScalarStyle::Plain => out.push_str(value),
            ScalarStyle::SingleQuoted => {
                write_single_quoted(&mut out, value, self.continuation_indent())?;
            }
            ScalarStyle::DoubleQuoted => escape_str(&mut out, value, self.unicode)?,
            ScalarStyle::Literal | ScalarStyle::Folded => {
                let (indent, hint) = self.block_scalar_indent();
                if style == ScalarStyle::Literal {
                    write_block_header(&mut out, '|', value, hint)?;
                    write_literal_body(&mut out, value, indent)?;
                } else {
                    write_block_header(&mut out, '>', value, hint)?;
                    write_folded_body(&mut out, value, indent)?;
                }
            }
        }
        Ok(out)
    }

    fn select_style(
        &self,
        value: &str,
        requested: ScalarStyle,
        plain_implicit: bool,
        tagged: bool,
        simple_key: bool,
    ) -> ScalarStyle {
        let analysis = analyze(value, self.unicode);
        let flow = self.flow_level > 0;
        let plain_allowed = if flow {
            analysis.flow_plain_allowed
        } else {
            analysis.block_plain_allowed
        } && !(value.is_empty() && (flow || simple_key))
            && (plain_implicit || tagged);
        let block_allowed = analysis.block_allowed && !flow && !simple_key;

        let mut style = match requested {
            ScalarStyle::Any => {
                if plain_allowed && !looks_like_non_string(value) {
                    ScalarStyle::Plain
                } else if analysis.multiline {
                    if self.multiline_strings && block_allowed {
                        ScalarStyle::Literal
                    } else {
                        ScalarStyle::DoubleQuoted
                    }
                } else {
                    ScalarStyle::SingleQuoted
                }
            }
            ScalarStyle::Plain if plain_allowed => ScalarStyle::Plain,
            ScalarStyle::Plain => ScalarStyle::SingleQuoted,
            other => other,
        };
        if style.is_block() && !block_allowed {
            style = ScalarStyle::DoubleQuoted;
        }
        if style == ScalarStyle::SingleQuoted
            && (!analysis.single_quoted_allowed || (analysis.multiline && (flow || simple_key)))
        {
            style = ScalarStyle::DoubleQuoted;
        }
        style
    }

    /// Indentation of the lines a multi-line single-quoted scalar continues on.
    fn continuation_indent(&self) -> usize {
        (self.level + 1).max(1).unsigned_abs() * self.best_indent
    }

    /// Content indentation of a block scalar and the indentation indicator that describes it.
    fn block_scalar_indent(&self) -> (usize, usize) {
        if self.level < 0 {
            // a root block scalar is indented relative to column -1
            let indent = self.best_indent.min(8);
            (indent, indent + 1)
        } else {
            let indent = (self.level.unsigned_abs() + 1) * self.best_indent;
            (indent, self.best_indent)
        }
    }
}

/// Shortest way to write `tag`, using the document's `%TAG` directives first.
fn tag_text(tag: &Tag, directives: &[TagDirective]) -> String {
    let full = tag.full();
    for directive in directives {
        if let Some(rest) = full.strip_prefix(directive.prefix.as_str()) {
            if !rest.is_empty() {
                return format!("{}{rest}", directive.handle);
            }
        }
    }
    tag.to_string()
}

impl EventSink for YamlEmitter<'_> {
    fn on_event(&mut self, event: Event<'_>) -> YamlResult<()> {
        trace!("Emitting {event}");
        match self.state {
            EmitterState::StreamStart => match event {
                Event::StreamStart { .. } => {
                    self.state = EmitterState::DocumentStart;
                    Ok(())
                }
                _ => Err(YamlError::emission("expected STREAM-START")),
            },
            EmitterState::DocumentStart => match event {
                Event::DocumentStart {
                    version,
                    tags,
                    implicit,
                } => {
                    check_directives(version, &tags)?;
                    self.header = DocumentHeader {
                        version,
                        tags,
                        implicit,
                    };
                    self.state = EmitterState::DocumentContent;
                    Ok(())
                }
                Event::StreamEnd => {
                    self.state = EmitterState::StreamEnd;
                    Ok(())
                }
                _ => Err(YamlError::emission("expected DOCUMENT-START or STREAM-END")),
            },
            EmitterState::DocumentContent => self.push_content(event),
            EmitterState::DocumentEnd => match event {
                Event::DocumentEnd { implicit } => {
                    let events = mem::take(&mut self.document);
                    self.dump_document(&events, implicit)?;
                    self.state = EmitterState::DocumentStart;
                    Ok(())
                }
                _ => Err(YamlError::emission("expected DOCUMENT-END")),
            },
            EmitterState::StreamEnd => Err(YamlError::emission("expected nothing after STREAM-END")),
        }
    }
}

#[cfg(test)]
mod test {
    use alloc::borrow::Cow;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use yamfold_common::{
        Encoding, Event, EventSink, ScalarStyle, Tag, TagDirective, VersionDirective, YamlError,
        YamlResult,
    };

    use super::YamlEmitter;
    use crate::encoder::{encode, EncodeOptions};
    use crate::treebuild::load_str;

    fn fold_with(
        input: &str,
        options: EncodeOptions,
        configure: impl FnOnce(&mut YamlEmitter),
    ) -> YamlResult<String> {
        let tree = load_str(input)?;
        let mut out = String::new();
        {
            let mut emitter = YamlEmitter::new(&mut out);
            configure(&mut emitter);
            encode(&tree, &mut emitter, options)?;
        }
        Ok(out)
    }

    fn fold(input: &str) -> String {
        fold_with(input, EncodeOptions::default(), |_| {}).unwrap()
    }

    fn fold_keep(input: &str) -> String {
        fold_with(input, EncodeOptions::default().keep_style(), |_| {}).unwrap()
    }

    fn emit_events(events: Vec<Event<'static>>) -> (String, YamlResult<()>) {
        let mut out = String::new();
        let result = {
            let mut emitter = YamlEmitter::new(&mut out);
            events.into_iter().try_for_each(|ev| emitter.on_event(ev))
        };
        (out, result)
    }

    fn stream_start() -> Event<'static> {
        Event::StreamStart {
            encoding: Encoding::Utf8,
        }
    }

    fn doc_start() -> Event<'static> {
        Event::DocumentStart {
            version: None,
            tags: Vec::new(),
            implicit: true,
        }
    }

    fn scalar(value: &str) -> Event<'static> {
        Event::Scalar {
            anchor: None,
            tag: None,
            value: Cow::Owned(value.into()),
            plain_implicit: true,
            quoted_implicit: true,
            style: ScalarStyle::Any,
        }
    }

    fn map_start() -> Event<'static> {
        Event::MappingStart {
            anchor: None,
            tag: None,
            implicit: true,
            style: Default::default(),
        }
    }

    fn seq_start() -> Event<'static> {
        Event::SequenceStart {
            anchor: None,
            tag: None,
            implicit: true,
            style: Default::default(),
        }
    }

    fn problem(events: Vec<Event<'static>>) -> YamlError {
        emit_events(events).1.unwrap_err()
    }

    #[test]
    fn test_normalize_flow() {
        assert_eq!(
            fold("{a: [1, 2], b: {c: d}}\n"),
            "a:\n  - 1\n  - 2\nb:\n  c: d\n"
        );
        assert_eq!(fold("[[1, 2], {a: b}]\n"), "- - 1\n  - 2\n- a: b\n");
        assert_eq!(fold("a: []\nb: {}\n"), "a: []\nb: {}\n");
    }

    #[test]
    fn test_keep_flow() {
        assert_eq!(fold_keep("{a: [1, 2], b: {c: d}}\n"), "{a: [1, 2], b: {c: d}}\n");
        assert_eq!(fold_keep("- {a: 1}\n- [x]\n"), "- {a: 1}\n- [x]\n");
        assert_eq!(
            fold_keep("[a, 'b c', '', \"d\\ne\"]\n"),
            "[a, 'b c', '', \"d\\ne\"]\n"
        );
    }

    #[test]
    fn test_document_marker() {
        assert_eq!(fold_keep("---\na: 1\n"), "---\na: 1\n");
        assert_eq!(fold("---\na: 1\n"), "a: 1\n");
        assert_eq!(fold("--- &r\n- a\n- b\n"), "--- &r\n- a\n- b\n");
    }

    #[test]
    fn test_anchors_and_aliases() {
        assert_eq!(fold("a: &x\n  b: 1\nc: *x\n"), "a: &x\n  b: 1\nc: *x\n");
        assert_eq!(fold("&k a: 1\n*k : 2\n"), "&k a: 1\n*k : 2\n");
        assert_eq!(
            fold("a: &foo 1\nb: &x # copy of &foo\n  c: 2\nd: *x\ne: *foo\n"),
            "a: &foo 1\nb: &x\n  c: 2\nd: *x\ne: *foo\n"
        );
    }

    #[test]
    fn test_quoting() {
        let input = "\
a: 'true'
b: \"x\"
c: '1.5'
d: ''
e: 'it''s'
f: plain text
g: \"a: b\"
h:
i: null
";
        assert_eq!(
            fold(input),
            "a: 'true'\nb: x\nc: '1.5'\nd: ''\ne: it's\nf: plain text\ng: 'a: b'\nh: ~\ni: null\n"
        );
    }

    #[test]
    fn test_multiline() {
        assert_eq!(
            fold("script: \"echo a\\necho b\\n\"\n"),
            "script: |\n  echo a\n  echo b\n"
        );
        assert_eq!(fold("k: \"  x\\ny\"\n"), "k: |2-\n    x\n  y\n");
        assert_eq!(
            fold_with("k: \"x\\ny\"\n", EncodeOptions::default(), |em| {
                em.multiline_strings(false);
            })
            .unwrap(),
            "k: \"x\\ny\"\n"
        );
    }

    #[test]
    fn test_tags() {
        assert_eq!(
            fold("a: !Ref Bucket\nb: !!str 12\nc: !Sub\n  - x\n"),
            "a: !Ref 'Bucket'\nb: !!str '12'\nc: !Sub\n  - x\n"
        );
    }

    #[test]
    fn test_complex_key() {
        assert_eq!(fold("? [a, b]\n: c\n"), "? - a\n  - b\n: c\n");
        assert_eq!(fold_keep("? [a, b]\n: c\n"), "? [a, b]\n: c\n");
    }

    #[test]
    fn test_settings() {
        let indented = fold_with("a:\n  b:\n  - c\n", EncodeOptions::default(), |em| {
            em.indent(4);
        });
        assert_eq!(indented.unwrap(), "a:\n    b:\n        - c\n");

        let loose = fold_with("[[1, 2], {a: b}]\n", EncodeOptions::default(), |em| {
            em.compact(false);
        });
        assert_eq!(loose.unwrap(), "-\n  - 1\n  - 2\n-\n  a: b\n");

        let ascii = fold_with("a: ü\n", EncodeOptions::default(), |em| em.unicode(false));
        assert_eq!(ascii.unwrap(), "a: \"\\xFC\"\n");

        let mut out = String::new();
        let mut emitter = YamlEmitter::new(&mut out);
        emitter.indent(20);
        assert_eq!(emitter.best_indent(), 9);
        assert!(emitter.is_compact() && emitter.is_multiline_strings() && emitter.is_unicode());
    }

    #[test]
    fn test_directives_and_documents() {
        let tagged = Event::Scalar {
            anchor: None,
            tag: Some(Cow::Owned(Tag::new("tag:example.com,2000:", "x"))),
            value: Cow::Borrowed("v"),
            plain_implicit: false,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        };
        let (out, result) = emit_events(vec![
            stream_start(),
            Event::DocumentStart {
                version: Some(VersionDirective { major: 1, minor: 2 }),
                tags: vec![TagDirective {
                    handle: "!e!".into(),
                    prefix: "tag:example.com,2000:".into(),
                }],
                implicit: true,
            },
            tagged,
            Event::DocumentEnd { implicit: true },
            Event::StreamEnd,
        ]);
        assert_eq!(result, Ok(()));
        assert_eq!(out, "%YAML 1.2\n%TAG !e! tag:example.com,2000:\n--- !e!x v\n");

        let (out, result) = emit_events(vec![
            stream_start(),
            doc_start(),
            scalar("a"),
            Event::DocumentEnd { implicit: true },
            doc_start(),
            scalar("b"),
            Event::DocumentEnd { implicit: false },
            Event::StreamEnd,
        ]);
        assert_eq!(result, Ok(()));
        assert_eq!(out, "a\n--- b\n...\n");
    }

    #[test]
    fn test_stream_protocol() {
        assert_eq!(
            problem(vec![Event::StreamEnd]),
            YamlError::emission("expected STREAM-START")
        );
        assert_eq!(
            problem(vec![stream_start(), scalar("a")]),
            YamlError::emission("expected DOCUMENT-START or STREAM-END")
        );
        assert_eq!(
            problem(vec![stream_start(), doc_start(), scalar("a"), scalar("b")]),
            YamlError::emission("expected DOCUMENT-END")
        );
        assert_eq!(
            problem(vec![stream_start(), doc_start(), Event::StreamEnd]),
            YamlError::emission("expected SCALAR, SEQUENCE-START, MAPPING-START, or ALIAS")
        );
        assert_eq!(
            problem(vec![stream_start(), Event::StreamEnd, Event::StreamEnd]),
            YamlError::emission("expected nothing after STREAM-END")
        );
    }

    #[test]
    fn test_collection_protocol() {
        assert_eq!(
            problem(vec![
                stream_start(),
                doc_start(),
                map_start(),
                scalar("k"),
                Event::MappingEnd,
            ]),
            YamlError::emission("expected the value of a mapping key")
        );
        assert_eq!(
            problem(vec![stream_start(), doc_start(), seq_start(), Event::MappingEnd]),
            YamlError::emission("expected SEQUENCE-END")
        );
        assert_eq!(
            problem(vec![stream_start(), doc_start(), map_start(), Event::SequenceEnd]),
            YamlError::emission("expected MAPPING-END")
        );
    }

    #[test]
    fn test_node_properties() {
        let unflagged = Event::Scalar {
            anchor: None,
            tag: None,
            value: Cow::Borrowed("x"),
            plain_implicit: false,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        };
        assert_eq!(
            problem(vec![stream_start(), doc_start(), unflagged]),
            YamlError::emission("neither tag nor implicit flags are specified")
        );

        let spaced = Event::Scalar {
            anchor: Some(Cow::Borrowed("a b")),
            tag: None,
            value: Cow::Borrowed("x"),
            plain_implicit: true,
            quoted_implicit: true,
            style: ScalarStyle::Plain,
        };
        assert_eq!(
            problem(vec![stream_start(), doc_start(), spaced]),
            YamlError::emission("anchor value must not contain spaces or flow indicators")
        );
        assert_eq!(
            problem(vec![
                stream_start(),
                doc_start(),
                Event::Alias {
                    anchor: Cow::Borrowed("")
                },
            ]),
            YamlError::emission("alias value must not be empty")
        );
    }

    #[test]
    fn test_directive_checks() {
        let with_directives = |version, tags| {
            problem(vec![
                stream_start(),
                Event::DocumentStart {
                    version,
                    tags,
                    implicit: true,
                },
            ])
        };
        assert_eq!(
            with_directives(Some(VersionDirective { major: 2, minor: 0 }), Vec::new()),
            YamlError::emission("incompatible %YAML directive")
        );
        let directive = |handle: &str, prefix: &str| TagDirective {
            handle: handle.into(),
            prefix: prefix.into(),
        };
        assert_eq!(
            with_directives(None, vec![directive("e!", "tag:e,2000:")]),
            YamlError::emission("tag handle must start with '!'")
        );
        assert_eq!(
            with_directives(None, vec![directive("!e", "tag:e,2000:")]),
            YamlError::emission("tag handle must end with '!'")
        );
        assert_eq!(
            with_directives(None, vec![directive("!e!", "")]),
            YamlError::emission("tag prefix must not be empty")
        );
        assert_eq!(
            with_directives(
                None,
                vec![directive("!e!", "tag:a,2000:"), directive("!e!", "tag:b,2000:")]
            ),
            YamlError::emission("duplicate %TAG directive")
        );
    }
}
