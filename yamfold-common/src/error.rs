use std::fmt;
use std::str::Utf8Error;

use crate::node::NodeKind;

/// A specialized `Result` type where the error is hard-wired to [`YamlError`].
pub type YamlResult<T> = Result<T, YamlError>;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum YamlError {
    /// Value of a `<<` key is neither a mapping, a sequence of mappings nor an alias to those.
    #[error("illegal value type ({found}) for merge key")]
    UnsupportedMergeValue { found: NodeKind },
    /// Inlining the alias would recurse into one of its own ancestors.
    #[error("alias *{0} refers to a node that contains it")]
    CyclicAlias(String),
    /// Problem reported by the structural event emitter.
    #[error("{0}")]
    EmissionFailure(String),
    /// Alias node without a target, which the loader never produces.
    #[error("alias *{0} has no target node")]
    UnresolvedAliasTarget(String),
    /// Scanner or parser diagnostic.
    #[error("{0}")]
    Parse(String),
    #[error("input contains no YAML document")]
    NoDocument,
    /// Input decoding error.
    #[error("input is not valid UTF-8: {0}")]
    NonDecodable(Utf8Error),
}

impl YamlError {
    pub fn emission(problem: &str) -> Self {
        YamlError::EmissionFailure(problem.to_string())
    }
}

impl From<Utf8Error> for YamlError {
    /// Creates a new `YamlError::NonDecodable` from the given error
    #[inline]
    fn from(error: Utf8Error) -> YamlError {
        YamlError::NonDecodable(error)
    }
}

impl From<fmt::Error> for YamlError {
    #[inline]
    fn from(_: fmt::Error) -> YamlError {
        YamlError::emission("unable to write YAML content to the output")
    }
}

#[cfg(test)]
mod test {
    use super::YamlError;
    use crate::NodeKind;

    #[test]
    fn test_messages() {
        let err = YamlError::UnsupportedMergeValue {
            found: NodeKind::Scalar,
        };
        assert_eq!(err.to_string(), "illegal value type (scalar) for merge key");
        let err = YamlError::CyclicAlias("base".into());
        assert_eq!(err.to_string(), "alias *base refers to a node that contains it");
        let err = YamlError::emission("expected STREAM-START");
        assert_eq!(err.to_string(), "expected STREAM-START");
    }

    #[test]
    fn test_utf8() {
        let bytes = [b'a', 0xff];
        let err: YamlError = std::str::from_utf8(&bytes).unwrap_err().into();
        assert!(matches!(err, YamlError::NonDecodable(_)));
    }
}
