//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{audit_logs, health, orders, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for admin endpoints. The storefront has a
/// single operator; anything higher than this is abuse.
const ADMIN_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/stripe` - Stripe checkout events
///
/// ## Admin (session token auth, CSRF on mutations)
/// - `POST /v1/admin/orders/update` - Update an order's status
/// - `GET /v1/admin/audit` - Paginated audit log read
/// - `GET /v1/admin/audit/export` - Audit log export (NDJSON)
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let admin_routes = Router::new()
        .route("/orders/update", post(orders::update_order))
        .route("/audit", get(audit_logs::list_audit))
        .route("/audit/export", get(audit_logs::export_audit))
        .layer(ConcurrencyLimitLayer::new(ADMIN_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Admin API
        .nest("/v1/admin", admin_routes)
        // Webhooks (no rate limit - retry cadence is the provider's)
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
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
