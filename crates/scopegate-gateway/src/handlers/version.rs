//! Version endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use scopegate_auth::JwtValidator;
use scopegate_store::Store;

use crate::authz::Decider;
use crate::state::GatewayState;

/// Version response.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    /// The contract's `info.version`.
    pub message: String,
}

/// Return the API version declared by the contract.
///
/// ```text
/// GET /version
///
/// Response: 200 OK
/// { "message": "1.0.0" }
/// ```
pub async fn get_version<S, V, D>(
    State(state): State<Arc<GatewayState<S, V, D>>>,
) -> Json<VersionResponse>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
    D: Decider + 'static,
{
    Json(VersionResponse {
        message: state.validator.registry().version().to_string(),
    })
}
