//! Error types for the apimap core library
//!
//! Tree building and expression parsing fail fast with a typed error. An
//! incomplete mapping is normally a *result* (see [`crate::validator`]); it
//! only becomes [`Error::IncompleteMapping`] at the finalize and build gates.

use crate::validator::ValidationResult;
use thiserror::Error;

/// Main error type for apimap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input could not be read as a JSON tree
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    /// Tree traversal went deeper than the configured bound
    #[error("Maximum depth of {max_depth} exceeded at '{path}'")]
    DepthExceeded { max_depth: usize, path: String },

    /// A serialized expression tree or expression could not be parsed
    #[error("Expression parse error at position {position}: {message}")]
    ExpressionParse {
        message: String,
        position: usize,
        expression: String,
    },

    /// The mapping does not satisfy every required target field
    #[error("Mapping is incomplete: {} field(s) need attention", report.issue_count())]
    IncompleteMapping { report: Box<ValidationResult> },

    /// Mapping pairs could not be packaged into a document
    #[error("Assembly error: {message}")]
    Assembly { message: String },

    /// A structurally identical mapping already exists
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Failure reported by an external collaborator
    #[error("Collaborator error: {message}")]
    Collaborator {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an expression parse error
    pub fn expression_parse(
        message: impl Into<String>,
        position: usize,
        expression: impl Into<String>,
    ) -> Self {
        Self::ExpressionParse {
            message: message.into(),
            position,
            expression: expression.into(),
        }
    }

    /// Create an assembly error
    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly {
            message: message.into(),
        }
    }

    /// Create a collaborator error without an underlying cause
    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the error came from the input rather than from the engine
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::MalformedInput { .. } | Self::DepthExceeded { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Collaborator {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DepthExceeded {
            max_depth: 4,
            path: "a.b.c.d".to_string(),
        };
        assert_eq!(err.to_string(), "Maximum depth of 4 exceeded at 'a.b.c.d'");
    }

    #[test]
    fn test_depth_exceeded_counts_as_malformed() {
        let err = Error::DepthExceeded {
            max_depth: 1,
            path: "x".to_string(),
        };
        assert!(err.is_malformed_input());
        assert!(!Error::assembly("nope").is_malformed_input());
    }

    #[test]
    fn test_anyhow_conversion_keeps_message() {
        let err: Error = anyhow::anyhow!("gateway unreachable").into();
        assert!(matches!(err, Error::Collaborator { .. }));
        assert!(err.to_string().contains("gateway unreachable"));
    }
}
