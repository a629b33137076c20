//! Contract error types.

use serde::Serialize;
use thiserror::Error;

use crate::registry::Method;

/// A result type using `ContractError`.
pub type Result<T> = std::result::Result<T, ContractError>;

/// Errors raised while loading a contract document.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The document could not be read.
    #[error("failed to read contract {path}: {source}")]
    Io {
        /// Path of the document.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not have the expected shape.
    #[error("invalid contract document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A path key is not a valid template.
    #[error("invalid path template: {0:?}")]
    InvalidPathTemplate(String),

    /// Two path templates match exactly the same requests.
    #[error("ambiguous path templates: {0:?} and {1:?}")]
    AmbiguousPath(String, String),

    /// An operation references a security scheme not declared in components.
    #[error("operation {operation} references undeclared security scheme {scheme:?}")]
    UndeclaredSecurityScheme {
        /// Operation label.
        operation: String,
        /// Scheme name.
        scheme: String,
    },

    /// A `$ref` does not point at a declared component schema.
    #[error("unresolved schema reference: {0:?}")]
    UnresolvedReference(String),
}

/// A request that matches no declared operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractMismatch {
    /// No path template matches the request path.
    #[error("no operation declared for path {0}")]
    NoMatchingPath(String),

    /// The path matches but the method is not declared for it.
    #[error("method {method} not allowed for {template}")]
    MethodNotAllowed {
        /// Request method as received.
        method: String,
        /// Matched path template.
        template: String,
        /// Methods declared for the template.
        allowed: Vec<Method>,
    },
}

/// A single structural violation, located precisely enough to fix the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Where the violation is, e.g. `body.name` or `query.limit`.
    pub location: String,
    /// What is wrong.
    pub message: String,
}

impl FieldViolation {
    /// Create a violation.
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}
