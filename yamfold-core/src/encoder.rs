use alloc::borrow::Cow;
use alloc::vec::Vec;

use log::{debug, trace};
use yamfold_common::{
    CollectionStyle, Encoding, Event, EventSink, NodeData, NodeId, NodeKind, ScalarStyle, Tree,
    YamlError, YamlResult,
};

use crate::alias::{AliasMode, ExpansionGuard};
use crate::merge::resolve_merges;

/// Presentation of the output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum StyleMode {
    /// Block collections everywhere, and quotes only where they are needed.
    #[default]
    Normalize,
    /// Collections and scalars keep the style they were written in.
    Keep,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct EncodeOptions {
    pub aliases: AliasMode,
    pub style: StyleMode,
}

impl EncodeOptions {
    #[must_use]
    pub fn with_aliases(mut self, aliases: AliasMode) -> Self {
        self.aliases = aliases;
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: StyleMode) -> Self {
        self.style = style;
        self
    }

    /// Shorthand for [`AliasMode::Resolve`].
    #[must_use]
    pub fn resolve_aliases(self) -> Self {
        self.with_aliases(AliasMode::Resolve)
    }

    /// Shorthand for [`StyleMode::Keep`].
    #[must_use]
    pub fn keep_style(self) -> Self {
        self.with_style(StyleMode::Keep)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum EncoderState {
    Start,
    InDocument,
    Done,
}

/// Turns a [`Tree`] into structural events.
///
/// An encoder walks its tree once: [`Encoder::encode`] consumes it.
pub struct Encoder<'t, S> {
    tree: &'t Tree,
    sink: S,
    options: EncodeOptions,
    guard: ExpansionGuard,
    state: EncoderState,
}

impl<'t, S: EventSink> Encoder<'t, S> {
    pub fn new(tree: &'t Tree, sink: S, options: EncodeOptions) -> Self {
        Encoder {
            tree,
            sink,
            options,
            guard: ExpansionGuard::new(),
            state: EncoderState::Start,
        }
    }

    /// Sends the events of the whole tree to the sink.
    ///
    /// # Errors
    /// Returns the first error of the merge or alias resolution, or of the sink.
    pub fn encode(mut self) -> YamlResult<()> {
        loop {
            self.state = match self.state {
                EncoderState::Start => {
                    let document = self.tree.document();
                    if self.tree[document].kind() != NodeKind::Document {
                        return Err(YamlError::emission("expected a document node as root"));
                    }
                    self.emit(Event::StreamStart {
                        encoding: Encoding::Utf8,
                    })?;
                    let implicit = match self.options.style {
                        StyleMode::Normalize => true,
                        StyleMode::Keep => !self.tree.explicit_start(),
                    };
                    self.emit(Event::DocumentStart {
                        version: None,
                        tags: Vec::new(),
                        implicit,
                    })?;
                    EncoderState::InDocument
                }
                EncoderState::InDocument => {
                    match self.tree.root() {
                        Some(root) => self.visit(root)?,
                        None => self.emit(Event::Scalar {
                            anchor: None,
                            tag: None,
                            value: Cow::Borrowed("~"),
                            plain_implicit: true,
                            quoted_implicit: true,
                            style: ScalarStyle::Plain,
                        })?,
                    }
                    self.emit(Event::DocumentEnd { implicit: true })?;
                    EncoderState::Done
                }
                EncoderState::Done => {
                    self.emit(Event::StreamEnd)?;
                    return Ok(());
                }
            }
        }
    }

    fn emit(&mut self, event: Event<'_>) -> YamlResult<()> {
        trace!("Encoding {event}");
        self.sink.on_event(event)
    }

    fn resolving(&self) -> bool {
        self.options.aliases == AliasMode::Resolve
    }

    fn visit(&mut self, id: NodeId) -> YamlResult<()> {
        let entered =
            self.resolving() && self.tree[id].anchor.is_some() && self.guard.enter(id);
        let result = self.visit_node(id);
        if entered {
            self.guard.leave(id);
        }
        result
    }

    fn visit_node(&mut self, id: NodeId) -> YamlResult<()> {
        let tree = self.tree;
        let node = &tree[id];
        let anchor = match self.options.aliases {
            AliasMode::Preserve => node.anchor.as_deref().map(Cow::Borrowed),
            AliasMode::Resolve => None,
        };
        let tag = node.tag.as_ref().map(Cow::Borrowed);
        let implicit = tag.is_none();

        match &node.data {
            NodeData::Document { .. } => {
                Err(YamlError::emission("document node found inside a document"))
            }
            NodeData::Mapping { style, .. } => {
                self.emit(Event::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: self.collection_style(*style),
                })?;
                if self.resolving() {
                    let merged = resolve_merges(tree, id, &mut self.guard)?;
                    for (key, value) in merged.emitted() {
                        self.visit(key)?;
                        self.visit(value)?;
                    }
                } else {
                    for (key, value) in tree.pairs(id) {
                        self.visit(key)?;
                        self.visit(value)?;
                    }
                }
                self.emit(Event::MappingEnd)
            }
            NodeData::Sequence { children, style } => {
                self.emit(Event::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: self.collection_style(*style),
                })?;
                for &child in children {
                    self.visit(child)?;
                }
                self.emit(Event::SequenceEnd)
            }
            NodeData::Scalar { value, style } => self.emit(Event::Scalar {
                anchor,
                tag,
                value: Cow::Borrowed(value),
                plain_implicit: implicit,
                quoted_implicit: implicit,
                style: self.scalar_style(*style, implicit),
            }),
            NodeData::Alias { name, .. } => match self.options.aliases {
                AliasMode::Preserve => self.emit(Event::Alias {
                    anchor: Cow::Borrowed(name),
                }),
                AliasMode::Resolve => {
                    let target = self.guard.expand(tree, id)?;
                    debug!("Inlining *{name} ({target})");
                    let entered = self.guard.enter(target);
                    let result = self.visit(target);
                    if entered {
                        self.guard.leave(target);
                    }
                    result
                }
            },
        }
    }

    fn collection_style(&self, source: CollectionStyle) -> CollectionStyle {
        match self.options.style {
            StyleMode::Normalize => CollectionStyle::Block,
            StyleMode::Keep => source,
        }
    }

    fn scalar_style(&self, source: ScalarStyle, implicit: bool) -> ScalarStyle {
        match (self.options.style, implicit) {
            (StyleMode::Keep, _) => source,
            (StyleMode::Normalize, false) => ScalarStyle::SingleQuoted,
            (StyleMode::Normalize, true) if source == ScalarStyle::Plain => ScalarStyle::Plain,
            (StyleMode::Normalize, true) => ScalarStyle::Any,
        }
    }
}

/// Encodes `tree` into `sink` in one go.
///
/// # Errors
/// See [`Encoder::encode`].
pub fn encode<S: EventSink>(tree: &Tree, sink: S, options: EncodeOptions) -> YamlResult<()> {
    Encoder::new(tree, sink, options).encode()
}
