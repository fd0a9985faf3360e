extern crate core;

pub mod error;
pub mod escaper;
pub mod event;
pub mod node;

pub use error::{YamlError, YamlResult};
pub use event::{Encoding, Event, EventSink, TagDirective, VersionDirective};
pub use node::{Node, NodeData, NodeId, NodeKind, Tree};

use std::fmt::{Display, Formatter};

/// Prefix the `!!` handle expands to.
pub const CORE_SCHEMA_PREFIX: &str = "tag:yaml.org,2002:";

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub enum ScalarStyle {
    /// Let the emitter pick the most readable style that keeps the value intact.
    #[default]
    Any,
    /// Unquoted string type like:
    /// ```yaml
    ///   multiline
    ///   string
    /// ```
    Plain,
    /// Single quote string which permits any symbol inside
    /// E.g. :
    /// ```yaml
    /// ' This is a quoted string
    ///    with ''quoted'' string within.'
    /// ```
    SingleQuoted,
    /// Double quote string with escapes
    /// E.g. :
    /// ```yaml
    /// "This is a quoted string
    ///    with \"double quoted\" string within."
    /// ```
    DoubleQuoted,
    /// Literal string type like:
    /// ```yaml
    ///   |
    ///     literal
    ///     string
    /// ```
    Literal,
    /// Folded string type like:
    /// ```yaml
    ///   >
    ///     folded
    ///     string
    /// ```
    Folded,
}

impl ScalarStyle {
    #[must_use]
    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }

    #[must_use]
    pub fn is_quoted(self) -> bool {
        matches!(self, ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted)
    }
}

impl Display for ScalarStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarStyle::Any | ScalarStyle::Plain => write!(f, ":"),
            ScalarStyle::SingleQuoted => write!(f, "'"),
            ScalarStyle::DoubleQuoted => write!(f, "\""),
            ScalarStyle::Literal => write!(f, "|"),
            ScalarStyle::Folded => write!(f, ">"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub enum CollectionStyle {
    #[default]
    Any,
    /// Indentation based collection
    /// ```yaml
    ///   - x
    ///   - y
    /// ```
    Block,
    /// Bracketed collection like `[x, y]` or `{x: y}`
    Flow,
}

/// A YAML tag.
#[derive(Clone, PartialEq, Debug, Eq, Ord, PartialOrd, Hash)]
pub struct Tag {
    /// Resolved handle of the tag, `!` for local tags, the core schema prefix for `!!`.
    pub handle: String,
    /// The suffix of the tag.
    pub suffix: String,
}

impl Tag {
    pub fn new(handle: impl Into<String>, suffix: impl Into<String>) -> Self {
        Tag {
            handle: handle.into(),
            suffix: suffix.into(),
        }
    }

    /// Local tag such as CloudFormation's `!Ref` or `!Sub`.
    pub fn local(suffix: impl Into<String>) -> Self {
        Tag::new("!", suffix)
    }

    /// Core schema tag, written `!!suffix`.
    pub fn core(suffix: impl Into<String>) -> Self {
        Tag::new(CORE_SCHEMA_PREFIX, suffix)
    }

    /// Parses tag in the shorthand form produced by [`Display`].
    ///
    /// ```
    /// use yamfold_common::Tag;
    /// assert_eq!(Tag::parse("!!str"), Tag::core("str"));
    /// assert_eq!(Tag::parse("!GetAtt"), Tag::local("GetAtt"));
    /// assert_eq!(Tag::parse("!<tag:example.com,2024:x>").to_string(), "!<tag:example.com,2024:x>");
    /// ```
    #[must_use]
    pub fn parse(shorthand: &str) -> Self {
        if let Some(verbatim) = shorthand
            .strip_prefix("!<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            Tag::new("", verbatim)
        } else if let Some(suffix) = shorthand.strip_prefix("!!") {
            Tag::core(suffix)
        } else if shorthand == "!" {
            Tag::new("", "!")
        } else if let Some(suffix) = shorthand.strip_prefix('!') {
            Tag::local(suffix)
        } else {
            Tag::new("", shorthand)
        }
    }

    /// Returns whether the tag is a YAML tag from the core schema (`!!str`, `!!int`, ...).
    ///
    /// The YAML specification specifies [a list of
    /// tags](https://yaml.org/spec/1.2.2/#103-core-schema) for the Core Schema. This function
    /// checks whether _the handle_ (but not the suffix) is the handle for the YAML Core Schema.
    #[must_use]
    pub fn is_yaml_core_schema(&self) -> bool {
        self.handle == CORE_SCHEMA_PREFIX
    }

    /// `!!merge`, the explicit form of the `<<` key.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.is_yaml_core_schema() && self.suffix == "merge"
    }

    /// Full tag as written in yaml-test-suite events, e.g. `tag:yaml.org,2002:str`.
    #[must_use]
    pub fn full(&self) -> String {
        let mut full = String::with_capacity(self.handle.len() + self.suffix.len());
        full.push_str(&self.handle);
        full.push_str(&self.suffix);
        full
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        if self.is_yaml_core_schema() {
            write!(f, "!!{}", self.suffix)
        } else if self.handle == "!" {
            write!(f, "!{}", self.suffix)
        } else if self.handle.is_empty() && self.suffix == "!" {
            write!(f, "!")
        } else {
            write!(f, "!<{}{}>", self.handle, self.suffix)
        }
    }
}
