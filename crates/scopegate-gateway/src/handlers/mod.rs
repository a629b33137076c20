//! HTTP request handlers.
//!
//! Handlers run only after the gate admitted the request; none of them
//! performs authorization of its own.

pub mod things;
pub mod version;

use axum::http::Uri;

use crate::error::ApiError;

/// Fallback for paths the contract declares but no handler serves.
pub async fn unrouted(uri: Uri) -> ApiError {
    tracing::warn!(path = %uri.path(), "Contract operation has no handler");
    ApiError::NotFound(uri.path().to_string())
}
