//! Bearer token verification for scopegate.
//!
//! This crate is the verification client behind the gateway's identity
//! extractor. It provides:
//!
//! - JWKS (JSON Web Key Set) fetching and caching
//! - RSA (`RS256`) and Ed25519 (`EdDSA`) signature validation
//! - Claims extraction into an [`Identity`](scopegate_core::Identity)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Gateway        │────▶│   JwtValidator   │
//! │   (identity MW)  │     │   (trait)        │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │  JwksValidator   │
//!                          └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │  JwksProvider    │
//!                          │  (key cache)     │
//!                          └────────┬─────────┘
//!                                   │ HTTPS
//!                          ┌────────▼─────────┐
//!                          │  Issuer JWKS     │
//!                          └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use scopegate_auth::{AuthConfig, JwksValidator, JwtValidator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::new("https://clerk.example.com");
//! let validator = JwksValidator::new(config)?;
//!
//! let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9...";
//! let claims = validator.validate(token).await?;
//! let identity = claims.into_identity()?;
//!
//! println!("subject: {}", identity.subject());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod jwks;
pub mod jwt;

pub use error::{AuthError, Result};
pub use jwt::{JwksValidator, JwtValidator, ValidatedClaims};

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockJwtValidator;

/// Configuration for bearer token verification.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Expected `iss` claim, also the base for the default JWKS URL.
    pub issuer: String,
    /// Explicit JWKS URL; defaults to `{issuer}/.well-known/jwks.json`.
    pub jwks_url: Option<String>,
    /// Expected `aud` claim. Audience is not checked when `None`.
    pub audience: Option<String>,
    /// How often to refresh the JWKS cache, in seconds.
    pub jwks_refresh_seconds: u64,
    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    pub leeway_seconds: u64,
}

impl AuthConfig {
    /// Create a configuration for `issuer` with default settings.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Self::default()
        }
    }

    /// Get the JWKS endpoint URL.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        self.jwks_url.clone().unwrap_or_else(|| {
            format!(
                "{}/.well-known/jwks.json",
                self.issuer.trim_end_matches('/')
            )
        })
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            jwks_url: None,
            audience: None,
            jwks_refresh_seconds: 300,
            leeway_seconds: 30,
        }
    }
}
