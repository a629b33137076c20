//! Scopegate gateway binary.
//!
//! Loads configuration and the API contract, then serves the gated things
//! API until SIGINT or SIGTERM.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to use a mock JWT validator that needs no
//! issuer. Use tokens in format: `test-token:<subject>:<perm1,perm2,...>`

use std::future::IntoFuture;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "dev-mode")]
use scopegate_auth::MockJwtValidator;
#[cfg(not(feature = "dev-mode"))]
use scopegate_auth::JwksValidator;
use scopegate_contract::ContractRegistry;
use scopegate_gateway::{create_router, GatewayConfig, GatewayState, SchemaValidator, ScopeDecider};
use scopegate_store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scopegate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Scopegate Gateway");

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        auth_issuer = ?config.auth_issuer,
        contract_path = ?config.contract_path,
        security_scheme = %config.security_scheme,
        "Gateway configuration loaded"
    );

    let registry = match &config.contract_path {
        Some(path) => ContractRegistry::from_path(path)?,
        None => ContractRegistry::embedded()?,
    };
    tracing::info!(
        title = %registry.title(),
        version = %registry.version(),
        operations = registry.operations().count(),
        "Contract loaded"
    );

    let store = Arc::new(MemoryStore::new());

    // Initialize JWT validator
    #[cfg(feature = "dev-mode")]
    let jwt_validator = {
        tracing::warn!("DEV MODE ENABLED - using mock JWT validator");
        tracing::warn!("Use tokens in format: test-token:<subject>:<perm1,perm2,...>");
        Arc::new(MockJwtValidator)
    };

    #[cfg(not(feature = "dev-mode"))]
    let jwt_validator = Arc::new(JwksValidator::new(config.auth_config()?)?);
    tracing::info!("JWT validator initialized");

    let decider = Arc::new(ScopeDecider::new(config.security_scheme.clone()));
    let listen_addr = config.listen_addr.clone();
    let grace = config.shutdown_grace();

    let state = GatewayState::new(
        store,
        jwt_validator,
        decider,
        SchemaValidator::new(Arc::new(registry)),
        config,
    );
    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;

    let shutdown = Arc::new(Notify::new());
    let drain = Arc::clone(&shutdown);
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain.notified().await })
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => {
            joined??;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    tracing::info!(grace_seconds = grace.as_secs(), "Shutting down, draining connections");
    shutdown.notify_one();

    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!("Grace period elapsed with requests still in flight"),
    }

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}
