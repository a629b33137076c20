//! Common error types for scopegate.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while constructing core types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The subject identifier was empty or whitespace.
    #[error("subject must not be empty")]
    EmptySubject,

    /// A permission string was empty or contained whitespace.
    #[error("invalid permission: {0:?}")]
    InvalidPermission(String),
}
