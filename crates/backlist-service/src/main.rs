//! Backlist Service - order ingestion and audit HTTP API.
//!
//! This is the main entry point for the backlist service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backlist_service::{create_router, AppState, ServiceConfig};
use backlist_store::{OrderStore, PgStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,backlist=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Backlist Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        audit_log_path = %config.audit_log_path,
        database_configured = %config.database_url.is_some(),
        stripe_configured = %config.stripe_api_key.is_some(),
        resend_configured = %config.resend_api_key.is_some(),
        "Service configuration loaded"
    );

    // Connect the durable store. A missing or unreachable database must
    // not keep webhooks from being acknowledged, so connection failure
    // degrades to dry-run mode instead of aborting startup.
    let store: Option<Arc<dyn OrderStore>> = match &config.database_url {
        Some(url) => match PgStore::connect(url).await {
            Ok(store) => {
                tracing::info!("Connected to Postgres order store");
                Some(Arc::new(store))
            }
            Err(e) => {
                tracing::error!(error = %e, "Database unreachable, starting in dry-run mode");
                None
            }
        },
        None => None,
    };

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
