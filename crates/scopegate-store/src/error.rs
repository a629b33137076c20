//! Error types for the resource store.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No further keys can be assigned.
    #[error("key space exhausted")]
    KeysExhausted,
}
