//! API contract registry for scopegate.
//!
//! The contract is an OpenAPI 3.0 JSON document. At startup it is loaded into
//! a [`ContractRegistry`], which answers three questions for every request:
//!
//! 1. Which declared operation does `(method, path)` resolve to?
//! 2. Which security requirements does that operation carry?
//! 3. Are the request's parameters and body structurally valid?
//!
//! `servers` entries are ignored so requests match regardless of the host
//! they arrive on.
//!
//! # Example
//!
//! ```
//! use scopegate_contract::ContractRegistry;
//!
//! let registry = ContractRegistry::embedded().unwrap();
//! let matched = registry.resolve("POST", "/things").unwrap();
//! assert!(matched.operation.requires_authorization());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod document;
pub mod error;
pub mod path;
pub mod registry;
pub mod schema;

pub use error::{ContractError, ContractMismatch, FieldViolation, Result};
pub use registry::{
    ContractRegistry, Method, Operation, OperationMatch, OperationRequirement, RequestParts,
    SecurityRequirement,
};
