use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str::from_utf8;

use hashbrown::HashMap;
use log::{debug, warn};
use saphyr_parser::{Event as SaphyrEvent, Parser, ScalarStyle as SaphyrStyle, Span};
use yamfold_common::{
    CollectionStyle, NodeId, ScalarStyle, Tag, Tree, YamlError, YamlResult, CORE_SCHEMA_PREFIX,
};

use crate::char_utils::{is_anchor_char, is_blank_or_break, is_flow};

/// Parses the first document of `input` into a [`Tree`].
///
/// Every alias in the returned tree has a target. Documents after the first one are ignored.
///
/// # Errors
/// Returns [`YamlError::Parse`] for malformed YAML and [`YamlError::NoDocument`] for a stream
/// without documents.
pub fn load_str(input: &str) -> YamlResult<Tree> {
    YamlLoader::new(input).load()
}

/// Same as [`load_str`], checking that `input` is UTF-8 first.
///
/// # Errors
/// Returns [`YamlError::NonDecodable`] if `input` is not valid UTF-8.
pub fn load_bytes(input: &[u8]) -> YamlResult<Tree> {
    let input = from_utf8(input)?;
    load_str(input)
}

enum Frame {
    Mapping {
        id: NodeId,
        key: Option<NodeId>,
        flow: bool,
    },
    Sequence {
        id: NodeId,
        flow: bool,
    },
}

/// Bridges `saphyr-parser` events into a [`Tree`].
pub struct YamlLoader<'input> {
    source: &'input str,
    char_to_byte: Vec<usize>,
    tree: Tree,
    stack: Vec<Frame>,
    // parser anchor id -> declared name and node
    anchors: HashMap<usize, (String, NodeId)>,
    flow_depth: usize,
}

impl<'input> YamlLoader<'input> {
    #[must_use]
    pub fn new(source: &'input str) -> Self {
        let mut char_to_byte: Vec<usize> = source.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(source.len());
        YamlLoader {
            source,
            char_to_byte,
            tree: Tree::new(),
            stack: Vec::new(),
            anchors: HashMap::new(),
            flow_depth: 0,
        }
    }

    /// Convert a char index from a saphyr marker to a byte index for string slicing.
    fn to_byte(&self, char_idx: usize) -> usize {
        self.char_to_byte
            .get(char_idx)
            .copied()
            .unwrap_or(self.source.len())
    }

    fn byte_at(&self, span: &Span) -> Option<u8> {
        self.source
            .as_bytes()
            .get(self.to_byte(span.start.index()))
            .copied()
    }

    /// Events up to and including the start of the second document. Errors after the end of the
    /// first document are logged and end the stream.
    fn collect_events(&self) -> YamlResult<Vec<(SaphyrEvent<'input>, Span)>> {
        let mut parser = Parser::new_from_str(self.source);
        let mut events = Vec::new();
        let mut documents = 0;
        let mut first_ended = false;
        while let Some(next) = parser.next_event() {
            let (event, span) = match next {
                Ok(next) => next,
                Err(e) if first_ended => {
                    warn!("Ignoring invalid content after the first document: {e}");
                    break;
                }
                Err(e) => return Err(YamlError::Parse(e.to_string())),
            };
            match event {
                SaphyrEvent::DocumentStart(_) => documents += 1,
                SaphyrEvent::DocumentEnd => first_ended = true,
                _ => {}
            }
            events.push((event, span));
            if documents > 1 {
                break;
            }
        }
        Ok(events)
    }

    /// Consumes the loader, returning the tree of the first document.
    ///
    /// # Errors
    /// See [`load_str`].
    pub fn load(mut self) -> YamlResult<Tree> {
        let events = self.collect_events()?;
        let mut documents = 0;
        let mut pos = 0;
        while pos < events.len() {
            let (event, span) = &events[pos];
            let properties_start = pos.checked_sub(1).map_or(0, |prev| match &events[prev] {
                (SaphyrEvent::Scalar(..) | SaphyrEvent::Alias(_), prev_span) => {
                    prev_span.end.index()
                }
                (_, prev_span) => prev_span.start.index(),
            });
            pos += 1;
            match event {
                SaphyrEvent::Nothing | SaphyrEvent::StreamStart => {}
                SaphyrEvent::StreamEnd => break,
                SaphyrEvent::DocumentStart(explicit) => {
                    if documents > 0 {
                        warn!("Ignoring documents after the first one");
                        break;
                    }
                    documents += 1;
                    self.tree.set_explicit_start(*explicit);
                }
                SaphyrEvent::DocumentEnd => {}
                SaphyrEvent::MappingStart(anchor_id, tag) => {
                    let starts_nested = events
                        .get(pos)
                        .is_some_and(|(_, next)| next.start.index() == span.start.index());
                    let flow = self.flow_depth > 0
                        || (self.byte_at(span) == Some(b'{') && !starts_nested);
                    let id = self.tree.add_mapping(collection_style(flow));
                    let tag = tag.as_ref().map(|t| convert_tag(t));
                    self.apply_props(id, *anchor_id, tag, properties_start, span);
                    self.attach(id)?;
                    self.open(Frame::Mapping {
                        id,
                        key: None,
                        flow,
                    });
                }
                SaphyrEvent::SequenceStart(anchor_id, tag) => {
                    let starts_nested = events
                        .get(pos)
                        .is_some_and(|(_, next)| next.start.index() == span.start.index());
                    let flow = self.flow_depth > 0
                        || (self.byte_at(span) == Some(b'[') && !starts_nested);
                    let id = self.tree.add_sequence(collection_style(flow));
                    let tag = tag.as_ref().map(|t| convert_tag(t));
                    self.apply_props(id, *anchor_id, tag, properties_start, span);
                    self.attach(id)?;
                    self.open(Frame::Sequence { id, flow });
                }
                SaphyrEvent::MappingEnd | SaphyrEvent::SequenceEnd => self.close(),
                SaphyrEvent::Scalar(value, style, anchor_id, tag) => {
                    let id = self
                        .tree
                        .add_scalar(value.to_string(), convert_style(*style));
                    let tag = tag.as_ref().map(|t| convert_tag(t));
                    self.apply_props(id, *anchor_id, tag, properties_start, span);
                    self.attach(id)?;
                }
                SaphyrEvent::Alias(anchor_id) => {
                    let Some((name, target)) = self.anchors.get(anchor_id).cloned() else {
                        return Err(YamlError::UnresolvedAliasTarget(format!(
                            "anchor{anchor_id}"
                        )));
                    };
                    let id = self.tree.add_alias_to(name, Some(target));
                    self.attach(id)?;
                }
            }
        }
        if documents == 0 {
            return Err(YamlError::NoDocument);
        }
        debug!("Loaded document with {} nodes", self.tree.node_count());
        Ok(self.tree)
    }

    fn open(&mut self, frame: Frame) {
        if matches!(
            frame,
            Frame::Mapping { flow: true, .. } | Frame::Sequence { flow: true, .. }
        ) {
            self.flow_depth += 1;
        }
        self.stack.push(frame);
    }

    fn close(&mut self) {
        if let Some(Frame::Mapping { flow: true, .. } | Frame::Sequence { flow: true, .. }) =
            self.stack.pop()
        {
            self.flow_depth -= 1;
        }
    }

    fn apply_props(
        &mut self,
        id: NodeId,
        anchor_id: usize,
        tag: Option<Tag>,
        properties_start: usize,
        span: &Span,
    ) {
        if anchor_id > 0 {
            let name = match self.anchor_in_properties(properties_start, span) {
                Some(name) => name.to_string(),
                None => self.unused_anchor_name(anchor_id),
            };
            self.tree.set_anchor(id, name.clone());
            self.anchors.insert(anchor_id, (name, id));
        }
        if let Some(tag) = tag {
            self.tree.set_tag(id, tag);
        }
    }

    /// Name of the `&anchor` token written between `properties_start` and the node itself.
    ///
    /// Only indicators, comments and tags can stand there besides the anchor, so `&` inside
    /// comments and verbatim tags is skipped.
    fn anchor_in_properties(&self, properties_start: usize, span: &Span) -> Option<&'input str> {
        let end = self.to_byte(span.start.index());
        let start = self.to_byte(properties_start).min(end);
        let region = self.source.as_bytes().get(start..end)?;
        let mut found = None;
        let mut i = 0;
        while i < region.len() {
            let rest = &region[i..];
            i += match rest[0] {
                b'#' => memchr::memchr(b'\n', rest).unwrap_or(rest.len()),
                b'!' if rest.get(1) == Some(&b'<') => {
                    memchr::memchr(b'>', rest).map_or(rest.len(), |close| close + 1)
                }
                b'!' => rest
                    .iter()
                    .take_while(|&&b| !is_blank_or_break(b) && !is_flow(b))
                    .count(),
                b'&' => {
                    let len = rest[1..].iter().take_while(|&&b| is_anchor_char(b)).count();
                    if len > 0 {
                        found = Some(start + i + 1..start + i + 1 + len);
                    }
                    len + 1
                }
                _ => 1,
            };
        }
        let source = self.source;
        // anchor chars never split a multi-byte char, see `is_anchor_char`
        found.map(|range| &source[range])
    }

    /// `anchor<n>` name that neither the tree nor the source uses.
    fn unused_anchor_name(&self, anchor_id: usize) -> String {
        let mut n = anchor_id;
        loop {
            let name = format!("anchor{n}");
            if self.tree.anchor(&name).is_none() && !self.source.contains(&format!("&{name}")) {
                return name;
            }
            n += 1;
        }
    }

    fn attach(&mut self, id: NodeId) -> YamlResult<()> {
        match self.stack.last_mut() {
            None => {
                if self.tree.root().is_some() {
                    return Err(YamlError::Parse(
                        "document contains more than one root node".to_string(),
                    ));
                }
                self.tree.set_root(id);
            }
            Some(Frame::Sequence { id: seq, .. }) => {
                let seq = *seq;
                self.tree.push_item(seq, id);
            }
            Some(Frame::Mapping { id: map, key, .. }) => match key.take() {
                Some(key) => {
                    let map = *map;
                    self.tree.push_pair(map, key, id);
                }
                None => *key = Some(id),
            },
        }
        Ok(())
    }
}

fn collection_style(flow: bool) -> CollectionStyle {
    if flow {
        CollectionStyle::Flow
    } else {
        CollectionStyle::Block
    }
}

fn convert_style(style: SaphyrStyle) -> ScalarStyle {
    match style {
        SaphyrStyle::Plain => ScalarStyle::Plain,
        SaphyrStyle::SingleQuoted => ScalarStyle::SingleQuoted,
        SaphyrStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        SaphyrStyle::Literal => ScalarStyle::Literal,
        SaphyrStyle::Folded => ScalarStyle::Folded,
    }
}

fn convert_tag(tag: &saphyr_parser::Tag) -> Tag {
    match (tag.handle.as_str(), tag.suffix.as_str()) {
        ("!!", suffix) => Tag::new(CORE_SCHEMA_PREFIX, suffix),
        ("!", "") | ("", "!") => Tag::new("", "!"),
        (handle, suffix) => Tag::new(handle, suffix),
    }
}

#[cfg(test)]
mod test {
    use alloc::vec::Vec;

    use yamfold_common::{CollectionStyle, NodeData, NodeKind, ScalarStyle, Tag, YamlError};

    use super::{load_bytes, load_str, YamlLoader};

    #[test]
    fn test_load_block_mapping() {
        let tree = load_str("a: 1\nb: 'two'\n").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(
            tree[root].data,
            NodeData::Mapping {
                children: tree[root].children().to_vec(),
                style: CollectionStyle::Block,
            }
        );
        let pairs: Vec<_> = tree.pairs(root).collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(tree[pairs[0].0].scalar(), Some("a"));
        assert_eq!(tree[pairs[1].1].scalar(), Some("two"));
        assert_eq!(
            tree[pairs[1].1].data,
            NodeData::Scalar {
                value: "two".into(),
                style: ScalarStyle::SingleQuoted
            }
        );
        assert!(!tree.explicit_start());
    }

    #[test]
    fn test_flow_styles() {
        let tree = load_str("--- {a: [1, 2], b: {c: d}}\n").unwrap();
        assert!(tree.explicit_start());
        let root = tree.root().unwrap();
        assert!(matches!(
            tree[root].data,
            NodeData::Mapping {
                style: CollectionStyle::Flow,
                ..
            }
        ));
        let (_, seq) = tree.pairs(root).next().unwrap();
        assert!(matches!(
            tree[seq].data,
            NodeData::Sequence {
                style: CollectionStyle::Flow,
                ..
            }
        ));
    }

    #[test]
    fn test_block_mapping_with_flow_key() {
        let tree = load_str("[a, b]: c\n").unwrap();
        let root = tree.root().unwrap();
        assert!(matches!(
            tree[root].data,
            NodeData::Mapping {
                style: CollectionStyle::Block,
                ..
            }
        ));
        let (key, _) = tree.pairs(root).next().unwrap();
        assert_eq!(tree[key].kind(), NodeKind::Sequence);
    }

    #[test]
    fn test_anchors_and_aliases() {
        let input = "base: &base\n  x: 1\nother: *base\nname: &n !Ref MyBucket\nuse: *n\n";
        let tree = load_str(input).unwrap();
        let base = tree.anchor("base").unwrap();
        assert!(tree[base].is_mapping());
        let named = tree.anchor("n").unwrap();
        assert_eq!(tree[named].tag, Some(Tag::local("Ref")));
        assert_eq!(tree[named].scalar(), Some("MyBucket"));

        let root = tree.root().unwrap();
        let values: Vec<_> = tree.pairs(root).map(|(_, v)| v).collect();
        assert_eq!(
            tree[values[1]].data,
            NodeData::Alias {
                name: "base".into(),
                target: Some(base)
            }
        );
        assert_eq!(
            tree[values[3]].data,
            NodeData::Alias {
                name: "n".into(),
                target: Some(named)
            }
        );
    }

    #[test]
    fn test_redeclared_anchor() {
        let tree = load_str("- &a first\n- *a\n- &a second\n- *a\n").unwrap();
        let root = tree.root().unwrap();
        let items = tree[root].children();
        let targets: Vec<_> = items
            .iter()
            .filter_map(|&id| match tree[id].data {
                NodeData::Alias { target, .. } => target,
                _ => None,
            })
            .collect();
        assert_eq!(targets, [items[0], items[2]]);
    }

    #[test]
    fn test_self_referencing_anchor() {
        let tree = load_str("&a [*a]\n").unwrap();
        let root = tree.root().unwrap();
        let alias = tree[root].children()[0];
        assert!(matches!(
            tree[alias].data,
            NodeData::Alias { target: Some(t), .. } if t == root
        ));
    }

    #[test]
    fn test_core_tag() {
        let tree = load_str("!!str 42\n").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree[root].tag, Some(Tag::core("str")));
    }

    #[test]
    fn test_first_document_only() {
        let tree = load_str("a: 1\n---\nb: 2\n").unwrap();
        let root = tree.root().unwrap();
        let (key, _) = tree.pairs(root).next().unwrap();
        assert_eq!(tree[key].scalar(), Some("a"));
    }

    #[test]
    fn test_ampersand_in_comment() {
        let input = "a: &foo 1\nb: &x # copy of &foo\n  c: 2\nd: *x\ne: *foo\n";
        let tree = load_str(input).unwrap();
        let root = tree.root().unwrap();
        let values: Vec<_> = tree.pairs(root).map(|(_, v)| v).collect();
        assert_eq!(tree[values[1]].anchor.as_deref(), Some("x"));
        assert_eq!(tree.anchor("foo"), Some(values[0]));
        assert_eq!(
            tree[values[2]].data,
            NodeData::Alias {
                name: "x".into(),
                target: Some(values[1])
            }
        );
        assert_eq!(
            tree[values[3]].data,
            NodeData::Alias {
                name: "foo".into(),
                target: Some(values[0])
            }
        );
    }

    #[test]
    fn test_anchor_next_to_tags() {
        let input = "- &a !<tag:x.org,2000:&b> one\n- &c !t&d two\n- [&e three, &f four]\n";
        let tree = load_str(input).unwrap();
        let root = tree.root().unwrap();
        let items = tree[root].children();
        assert_eq!(tree[items[0]].anchor.as_deref(), Some("a"));
        assert_eq!(tree[items[1]].anchor.as_deref(), Some("c"));
        let flow: Vec<_> = tree[items[2]]
            .children()
            .iter()
            .map(|&id| tree[id].anchor.as_deref())
            .collect();
        assert_eq!(flow, [Some("e"), Some("f")]);
    }

    #[test]
    fn test_generated_anchor_names_are_unused() {
        let loader = YamlLoader::new("a: &anchor1 1\nb: &anchor2 [*anchor1]\n");
        assert_eq!(loader.unused_anchor_name(1), "anchor3");
        assert_eq!(YamlLoader::new("a: 1\n").unused_anchor_name(4), "anchor4");
    }

    #[test]
    fn test_ignores_errors_after_first_document() {
        let tree = load_str("a: 1\n---\nb: [1, 2\n").unwrap();
        let root = tree.root().unwrap();
        let (key, _) = tree.pairs(root).next().unwrap();
        assert_eq!(tree[key].scalar(), Some("a"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(load_str(""), Err(YamlError::NoDocument)));
        assert!(matches!(load_str("# only a comment\n"), Err(YamlError::NoDocument)));
        assert!(matches!(load_str("a: [1, 2"), Err(YamlError::Parse(_))));
        assert!(matches!(
            load_bytes(b"a: \xff"),
            Err(YamlError::NonDecodable(_))
        ));
    }
}
