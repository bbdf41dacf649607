//! Router construction: health endpoints plus the cached, failover-wrapped
//! gateway passthrough

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers;
use crate::middleware::cache::ResponseCacheLayer;
use crate::AppState;

/// Build the application router. The response cache wraps everything except
/// the health endpoints (which it bypasses by path); the failover handler
/// wraps the forwarding engine inside the passthrough handler.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cache_layer = ResponseCacheLayer::new(state.cache_store.clone(), state.settings.cache.clone());

    Router::new()
        .route("/health", get(handlers::basic_health))
        .route("/health/detailed", get(handlers::detailed_health))
        .fallback(handlers::gateway_passthrough)
        .layer(cache_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
