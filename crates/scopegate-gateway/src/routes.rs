//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use scopegate_auth::JwtValidator;
use scopegate_store::Store;

use crate::authz::Decider;
use crate::handlers::{self, things, version};
use crate::identity::extract_identity;
use crate::state::GatewayState;
use crate::validator::validate_request;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// - `GET /version` - Contract version (public)
/// - `GET /things` - List things (authenticated)
/// - `POST /things` - Create a thing (requires `write:things`)
///
/// Every request, routed or not, passes the identity extractor and then the
/// schema validator, so unknown paths and methods are answered from the
/// contract.
pub fn create_router<S, V, D>(state: GatewayState<S, V, D>) -> Router
where
    S: Store + 'static,
    V: JwtValidator + 'static,
    D: Decider + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    let gate = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            extract_identity::<S, V, D>,
        ))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            validate_request::<S, V, D>,
        ));

    Router::new()
        .route("/version", get(version::get_version::<S, V, D>))
        .route(
            "/things",
            get(things::list_things::<S, V, D>).post(things::add_thing::<S, V, D>),
        )
        .fallback(handlers::unrouted)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        // Gate: identity first, then contract + authorization. The body size
        // limit is enforced inside the gate, after authorization.
        .layer(gate)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
