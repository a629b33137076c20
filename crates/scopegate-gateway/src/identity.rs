//! Identity extractor middleware.
//!
//! Runs before contract validation. It never rejects a request: a missing,
//! malformed or unverifiable credential leaves the request anonymous, and the
//! authorization decider turns that into `MissingIdentity` where it matters.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Level;

use scopegate_auth::{AuthError, JwtValidator};
use scopegate_store::Store;

use crate::authz::Decider;
use crate::context::RequestContext;
use crate::state::GatewayState;

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Verify a bearer token and build the request context.
pub async fn resolve_context<V>(validator: &V, token: Option<&str>) -> RequestContext
where
    V: JwtValidator + ?Sized,
{
    let Some(token) = token else {
        return RequestContext::anonymous();
    };

    let claims = match validator.validate(token).await {
        Ok(claims) => claims,
        Err(err) => {
            log_rejection(&err);
            return RequestContext::anonymous();
        }
    };

    let session_id = claims.session_id.clone();
    let expires_at = claims.expires_at;
    match claims.into_identity() {
        Ok(identity) => {
            tracing::debug!(
                subject = %identity.subject(),
                session_id = ?session_id,
                %expires_at,
                permissions = identity.permissions().len(),
                "Bearer credential verified"
            );
            RequestContext::authenticated(identity)
        }
        Err(err) => {
            log_rejection(&err);
            RequestContext::anonymous()
        }
    }
}

/// Log level for a verification failure.
///
/// Outages of the verification service are errors; expiry is routine.
fn rejection_level(err: &AuthError) -> Level {
    match err {
        _ if err.is_service_failure() => Level::ERROR,
        AuthError::TokenExpired => Level::DEBUG,
        _ => Level::WARN,
    }
}

fn log_rejection(err: &AuthError) {
    let level = rejection_level(err);
    if level == Level::ERROR {
        tracing::error!(error = %err, "Credential verification service failed");
    } else if level == Level::DEBUG {
        tracing::debug!(error = %err, "Bearer credential rejected");
    } else {
        tracing::warn!(error = %err, "Bearer credential rejected");
    }
}

/// Middleware placing a [`RequestContext`] into the request extensions.
pub async fn extract_identity<S, V, D>(
    State(state): State<Arc<GatewayState<S, V, D>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: Store + 'static,
    V: JwtValidator + 'static,
    D: Decider + 'static,
{
    let token = bearer_token(request.headers()).map(str::to_string);
    let context = resolve_context(state.jwt_validator.as_ref(), token.as_deref()).await;

    request.extensions_mut().insert(context);
    next.run(request).await
}
