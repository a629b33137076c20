//! Thing endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use scopegate_auth::JwtValidator;
use scopegate_store::{Store, Thing, ThingWithId};

use crate::authz::Decider;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::GatewayState;

/// List all things in ascending id order.
///
/// # Errors
///
/// Returns `ApiError::Internal` if the store fails.
pub async fn list_things<S, V, D>(
    State(state): State<Arc<GatewayState<S, V, D>>>,
) -> Result<Json<Vec<ThingWithId>>, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
    D: Decider + 'static,
{
    let things = state.store.list_things()?;
    Ok(Json(things))
}

/// Create a thing and return it with its assigned id.
///
/// ```text
/// POST /things
/// { "name": "widget" }
///
/// Response: 201 Created
/// { "id": 0, "name": "widget" }
/// ```
///
/// # Errors
///
/// Returns `ApiError::Internal` if the store fails.
pub async fn add_thing<S, V, D>(
    State(state): State<Arc<GatewayState<S, V, D>>>,
    Extension(ctx): Extension<RequestContext>,
    Json(thing): Json<Thing>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
    D: Decider + 'static,
{
    let created = state.store.add_thing(thing)?;

    tracing::info!(
        id = created.id,
        name = %created.name,
        subject = ?ctx.subject(),
        "Thing created"
    );

    Ok((StatusCode::CREATED, Json(created)))
}
