use std::borrow::Cow;
use std::fmt::{Display, Formatter};

use crate::escaper::escape_event_value;
use crate::{CollectionStyle, ScalarStyle, Tag, YamlResult};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
}

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Utf8 => f.write_str("UTF-8"),
        }
    }
}

/// `%YAML major.minor`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VersionDirective {
    pub major: u8,
    pub minor: u8,
}

/// `%TAG handle prefix`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDirective {
    pub handle: String,
    pub prefix: String,
}

/// Structural event consumed by an [`EventSink`].
///
/// Borrowed fields point into the document tree, [`Event::into_owned`] detaches them.
#[derive(Clone, Debug, PartialEq)]
pub enum Event<'a> {
    StreamStart {
        encoding: Encoding,
    },
    StreamEnd,
    DocumentStart {
        version: Option<VersionDirective>,
        tags: Vec<TagDirective>,
        /// `---` may be omitted.
        implicit: bool,
    },
    DocumentEnd {
        /// `...` may be omitted.
        implicit: bool,
    },
    MappingStart {
        anchor: Option<Cow<'a, str>>,
        tag: Option<Cow<'a, Tag>>,
        /// Tag may be omitted.
        implicit: bool,
        style: CollectionStyle,
    },
    MappingEnd,
    SequenceStart {
        anchor: Option<Cow<'a, str>>,
        tag: Option<Cow<'a, Tag>>,
        implicit: bool,
        style: CollectionStyle,
    },
    SequenceEnd,
    Scalar {
        anchor: Option<Cow<'a, str>>,
        tag: Option<Cow<'a, Tag>>,
        value: Cow<'a, str>,
        /// Tag may be omitted when written plain.
        plain_implicit: bool,
        /// Tag may be omitted when written in any quoted or block style.
        quoted_implicit: bool,
        style: ScalarStyle,
    },
    Alias {
        anchor: Cow<'a, str>,
    },
}

fn owned<T: ToOwned + ?Sized>(cow: Option<Cow<'_, T>>) -> Option<Cow<'static, T>> {
    cow.map(|x| Cow::Owned(x.into_owned()))
}

impl Event<'_> {
    #[must_use]
    pub fn into_owned(self) -> Event<'static> {
        match self {
            Event::StreamStart { encoding } => Event::StreamStart { encoding },
            Event::StreamEnd => Event::StreamEnd,
            Event::DocumentStart {
                version,
                tags,
                implicit,
            } => Event::DocumentStart {
                version,
                tags,
                implicit,
            },
            Event::DocumentEnd { implicit } => Event::DocumentEnd { implicit },
            Event::MappingStart {
                anchor,
                tag,
                implicit,
                style,
            } => Event::MappingStart {
                anchor: owned(anchor),
                tag: owned(tag),
                implicit,
                style,
            },
            Event::MappingEnd => Event::MappingEnd,
            Event::SequenceStart {
                anchor,
                tag,
                implicit,
                style,
            } => Event::SequenceStart {
                anchor: owned(anchor),
                tag: owned(tag),
                implicit,
                style,
            },
            Event::SequenceEnd => Event::SequenceEnd,
            Event::Scalar {
                anchor,
                tag,
                value,
                plain_implicit,
                quoted_implicit,
                style,
            } => Event::Scalar {
                anchor: owned(anchor),
                tag: owned(tag),
                value: Cow::Owned(value.into_owned()),
                plain_implicit,
                quoted_implicit,
                style,
            },
            Event::Alias { anchor } => Event::Alias {
                anchor: Cow::Owned(anchor.into_owned()),
            },
        }
    }

    /// Name of the event as used in emitter diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Event::StreamStart { .. } => "STREAM-START",
            Event::StreamEnd => "STREAM-END",
            Event::DocumentStart { .. } => "DOCUMENT-START",
            Event::DocumentEnd { .. } => "DOCUMENT-END",
            Event::MappingStart { .. } => "MAPPING-START",
            Event::MappingEnd => "MAPPING-END",
            Event::SequenceStart { .. } => "SEQUENCE-START",
            Event::SequenceEnd => "SEQUENCE-END",
            Event::Scalar { .. } => "SCALAR",
            Event::Alias { .. } => "ALIAS",
        }
    }

    /// Anchor declared by this event, aliases only reference one.
    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Event::MappingStart { anchor, .. }
            | Event::SequenceStart { anchor, .. }
            | Event::Scalar { anchor, .. } => anchor.as_deref(),
            _ => None,
        }
    }
}

fn write_props(
    f: &mut Formatter<'_>,
    anchor: &Option<Cow<'_, str>>,
    tag: &Option<Cow<'_, Tag>>,
) -> std::fmt::Result {
    if let Some(anchor) = anchor {
        write!(f, " &{anchor}")?;
    }
    if let Some(tag) = tag {
        write!(f, " <{}{}>", tag.handle, tag.suffix)?;
    }
    Ok(())
}

/// Formats the event in yaml-test-suite notation, e.g. `+MAP &a <!Ref>` or `=VAL :x`.
impl Display for Event<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::StreamStart { .. } => write!(f, "+STR"),
            Event::StreamEnd => write!(f, "-STR"),
            Event::DocumentStart { implicit: true, .. } => write!(f, "+DOC"),
            Event::DocumentStart { implicit: false, .. } => write!(f, "+DOC ---"),
            Event::DocumentEnd { implicit: true } => write!(f, "-DOC"),
            Event::DocumentEnd { implicit: false } => write!(f, "-DOC ..."),
            Event::MappingStart {
                anchor, tag, style, ..
            } => {
                write!(f, "+MAP")?;
                if *style == CollectionStyle::Flow {
                    write!(f, " {{}}")?;
                }
                write_props(f, anchor, tag)
            }
            Event::MappingEnd => write!(f, "-MAP"),
            Event::SequenceStart {
                anchor, tag, style, ..
            } => {
                write!(f, "+SEQ")?;
                if *style == CollectionStyle::Flow {
                    write!(f, " []")?;
                }
                write_props(f, anchor, tag)
            }
            Event::SequenceEnd => write!(f, "-SEQ"),
            Event::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                write!(f, "=VAL")?;
                write_props(f, anchor, tag)?;
                write!(f, " {style}{}", escape_event_value(value))
            }
            Event::Alias { anchor } => write!(f, "=ALI *{anchor}"),
        }
    }
}

/// Receiver of structural events, implemented by emitters and recorders.
pub trait EventSink {
    /// # Errors
    ///
    /// Returns `YamlError::EmissionFailure` when the event does not fit the stream so far.
    fn on_event(&mut self, event: Event<'_>) -> YamlResult<()>;
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_event(&mut self, event: Event<'_>) -> YamlResult<()> {
        (**self).on_event(event)
    }
}

/// Records every event as is.
impl EventSink for Vec<Event<'static>> {
    fn on_event(&mut self, event: Event<'_>) -> YamlResult<()> {
        self.push(event.into_owned());
        Ok(())
    }
}
