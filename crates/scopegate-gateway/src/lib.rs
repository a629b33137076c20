//! HTTP gateway for the things API.
//!
//! Every request passes a three-stage gate before a handler runs:
//!
//! 1. **Identity extractor**: verifies the bearer credential, if any, and
//!    stores the resulting [`Identity`](scopegate_core::Identity) in the
//!    request's [`RequestContext`].
//! 2. **Schema validator**: resolves the request to one contract operation
//!    and asks the [`Decider`] whether the caller satisfies its security
//!    requirements.
//! 3. **Structural checks**: only after admission, parameters and body are
//!    checked against the contract.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Clients                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    scopegate-gateway                        │
//! │  ┌─────────────┐  ┌──────────────────────┐  ┌───────────┐   │
//! │  │  Identity   │─▶│  Schema validator    │─▶│ Handlers  │   │
//! │  │  extractor  │  │  + Decider           │  │           │   │
//! │  └─────────────┘  └──────────────────────┘  └───────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                    │
//!          ▼                    ▼                    ▼
//!    ┌──────────┐        ┌──────────┐         ┌──────────┐
//!    │  Auth    │        │ Contract │         │  Store   │
//!    │  (JWT)   │        │ registry │         │          │
//!    └──────────┘        └──────────┘         └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use scopegate_auth::{AuthConfig, JwksValidator};
//! use scopegate_contract::ContractRegistry;
//! use scopegate_gateway::{create_router, GatewayConfig, GatewayState, SchemaValidator, ScopeDecider};
//! use scopegate_store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let jwt_validator = Arc::new(JwksValidator::new(AuthConfig::new("https://clerk.example.com"))?);
//! let decider = Arc::new(ScopeDecider::default());
//! let validator = SchemaValidator::new(Arc::new(ContractRegistry::embedded()?));
//!
//! let state = GatewayState::new(store, jwt_validator, decider, validator, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod authz;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod routes;
pub mod state;
pub mod validator;

pub use authz::{AuthorizationOutcome, Decider, DenyReason, ScopeDecider};
pub use config::{ConfigError, GatewayConfig};
pub use context::RequestContext;
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;
pub use validator::{GateError, SchemaValidator};
