//! Core types shared across scopegate.
//!
//! This crate provides the request-scoped identity model consumed by the gate:
//!
//! - **Identity**: an authenticated subject plus its granted permission set
//! - **Permission sets**: unordered, de-duplicated capability strings
//! - **Error types**: validation errors for the types above
//!
//! # Example
//!
//! ```
//! use scopegate_core::{Identity, PermissionSet};
//!
//! let identity = Identity::new(
//!     "user_2abc",
//!     PermissionSet::from_iter(["read:things", "write:things"]),
//! ).unwrap();
//!
//! assert!(identity.permissions().contains("write:things"));
//! assert!(identity.permissions().missing(["read:things"]).is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod identity;

pub use error::{CoreError, Result};
pub use identity::{Identity, PermissionSet};
