//! Contract-driven request validation.
//!
//! For every request the [`SchemaValidator`]:
//!
//! 1. resolves `(method, path)` to exactly one declared operation,
//! 2. hands the operation's security requirements to the [`Decider`],
//! 3. only after admission, checks parameters and body against the contract.
//!
//! A denial stops the pipeline before the body is read.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use thiserror::Error;

use scopegate_auth::JwtValidator;
use scopegate_contract::{
    ContractMismatch, ContractRegistry, FieldViolation, OperationMatch, RequestParts,
};
use scopegate_store::Store;

use crate::authz::{decide_operation, AuthorizationOutcome, Decider, DenyReason};
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Ways a request can fail the gate.
#[derive(Debug, Error)]
pub enum GateError {
    /// The request matches no declared operation.
    #[error(transparent)]
    ContractMismatch(#[from] ContractMismatch),

    /// The decider denied the request.
    #[error("{operation} denied: {reason}")]
    Denied {
        /// Operation label.
        operation: String,
        /// Deny reason.
        reason: DenyReason,
    },

    /// The request was admitted but is structurally invalid.
    #[error("{operation} rejected: {} contract violation(s)", violations.len())]
    Malformed {
        /// Operation label.
        operation: String,
        /// Every violation found.
        violations: Vec<FieldViolation>,
    },
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::ContractMismatch(ContractMismatch::NoMatchingPath(path)) => {
                tracing::debug!(%path, "No operation declared for path");
                Self::NotFound(path)
            }
            GateError::ContractMismatch(ContractMismatch::MethodNotAllowed {
                method,
                template,
                allowed,
            }) => {
                tracing::debug!(%method, %template, "Method not declared for path");
                Self::MethodNotAllowed { allowed }
            }
            GateError::Denied { operation, reason } => match reason {
                DenyReason::MissingIdentity => {
                    tracing::debug!(%operation, %reason, "Request denied");
                    Self::Unauthorized
                }
                DenyReason::UnsupportedScheme => {
                    tracing::error!(
                        %operation,
                        %reason,
                        "Operation requires a security scheme this gate does not support"
                    );
                    Self::Unauthorized
                }
                DenyReason::InsufficientScopes => {
                    tracing::info!(%operation, %reason, "Request denied");
                    Self::Forbidden
                }
            },
            GateError::Malformed {
                operation,
                violations,
            } => {
                tracing::debug!(%operation, violations = ?violations, "Request violates contract");
                Self::malformed(violations)
            }
        }
    }
}

/// Validates requests against the contract registry.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    registry: Arc<ContractRegistry>,
}

impl SchemaValidator {
    /// Create a validator over a loaded registry.
    #[must_use]
    pub const fn new(registry: Arc<ContractRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    /// Resolve the operation and run the authorization decision.
    ///
    /// Operations without security requirements skip the decider.
    ///
    /// # Errors
    ///
    /// Returns `GateError::ContractMismatch` if nothing matches, or
    /// `GateError::Denied` if the decider refuses.
    pub fn authorize<D>(
        &self,
        decider: &D,
        ctx: &RequestContext,
        method: &str,
        path: &str,
    ) -> Result<OperationMatch<'_>, GateError>
    where
        D: Decider + ?Sized,
    {
        let matched = self.registry.resolve(method, path)?;
        let operation = matched.operation;

        if !operation.requires_authorization() {
            return Ok(matched);
        }

        match decide_operation(decider, ctx, &operation.security) {
            AuthorizationOutcome::Admit => {
                tracing::debug!(
                    operation = %operation.label(),
                    subject = ?ctx.subject(),
                    "Request admitted"
                );
                Ok(matched)
            }
            AuthorizationOutcome::Deny(reason) => Err(GateError::Denied {
                operation: operation.label(),
                reason,
            }),
        }
    }

    /// Check parameters and body of an admitted request.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Malformed` with every violation found.
    pub fn check_structure(
        &self,
        matched: &OperationMatch<'_>,
        request: RequestParts<'_>,
    ) -> Result<(), GateError> {
        let violations = self.registry.check_request(matched, request);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(GateError::Malformed {
                operation: matched.operation.label(),
                violations,
            })
        }
    }
}

/// Decode a raw query string into pairs.
#[must_use]
pub fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Middleware enforcing the contract and the authorization decision.
///
/// Expects [`extract_identity`](crate::identity::extract_identity) to have run.
pub async fn validate_request<S, V, D>(
    State(state): State<Arc<GatewayState<S, V, D>>>,
    request: Request,
    next: Next,
) -> Response
where
    S: Store + 'static,
    V: JwtValidator + 'static,
    D: Decider + 'static,
{
    match gate(&state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn gate<S, V, D>(
    state: &GatewayState<S, V, D>,
    request: Request,
) -> Result<Request, ApiError>
where
    S: Store,
    V: JwtValidator,
    D: Decider,
{
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    let (parts, body) = request.into_parts();
    let path = parts.uri.path();

    let matched = state
        .validator
        .authorize(state.decider.as_ref(), &ctx, parts.method.as_str(), path)?;

    let bytes = to_bytes(body, state.config.max_body_bytes)
        .await
        .map_err(body_read_error)?;

    let query = query_pairs(parts.uri.query());
    let headers: Vec<(String, String)> = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    state.validator.check_structure(
        &matched,
        RequestParts {
            query: &query,
            headers: &headers,
            content_type,
            body: &bytes,
        },
    )?;

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

/// Map a failure to buffer the request body.
///
/// Only exceeding the configured limit is a 413; anything else (such as the
/// client going away mid-upload) is a malformed request.
fn body_read_error(err: axum::Error) -> ApiError {
    let inner = err.into_inner();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&*inner);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            tracing::debug!("Request body exceeds the configured limit");
            return ApiError::PayloadTooLarge;
        }
        source = err.source();
    }

    tracing::debug!(error = %inner, "Failed to read request body");
    ApiError::BadRequest {
        message: "failed to read request body".to_string(),
        details: Vec::new(),
    }
}
