//! Gateway application state.
//!
//! This module defines the shared state that is available to all middleware
//! and request handlers.

use std::sync::Arc;

use scopegate_auth::JwtValidator;
use scopegate_store::Store;

use crate::authz::Decider;
use crate::config::GatewayConfig;
use crate::validator::SchemaValidator;

/// Shared application state for the gateway.
pub struct GatewayState<S, V, D>
where
    S: Store,
    V: JwtValidator,
    D: Decider,
{
    /// Resource store behind the gate.
    pub store: Arc<S>,
    /// Bearer credential verifier used by the identity extractor.
    pub jwt_validator: Arc<V>,
    /// Authorization decider consulted by the schema validator.
    pub decider: Arc<D>,
    /// Contract-driven request validator.
    pub validator: SchemaValidator,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<S, V, D> GatewayState<S, V, D>
where
    S: Store,
    V: JwtValidator,
    D: Decider,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        jwt_validator: Arc<V>,
        decider: Arc<D>,
        validator: SchemaValidator,
        config: GatewayConfig,
    ) -> Self {
        Self {
            store,
            jwt_validator,
            decider,
            validator,
            config,
        }
    }
}

impl<S, V, D> Clone for GatewayState<S, V, D>
where
    S: Store,
    V: JwtValidator,
    D: Decider,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            jwt_validator: Arc::clone(&self.jwt_validator),
            decider: Arc::clone(&self.decider),
            validator: self.validator.clone(),
            config: self.config.clone(),
        }
    }
}
