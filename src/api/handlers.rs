//! Request handlers: health check endpoints and the gateway passthrough

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::AppState;

/// `GET /health` — probe the fixed configured endpoint list and report the
/// flat aggregate. 503 only when every instance is failing.
pub async fn basic_health(State(state): State<Arc<AppState>>) -> Response {
    let report = state.aggregator.check_basic(&state.settings.health).await;
    let status = StatusCode::from_u16(report.aggregate.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(report)).into_response()
}

/// `GET /health/detailed` — probe every downstream of every configured
/// route and report the grouped gateway summary. 200 for Healthy/Degraded,
/// 503 for Unhealthy.
pub async fn detailed_health(State(state): State<Arc<AppState>>) -> Response {
    let report = state
        .aggregator
        .check_detailed(&state.settings.routes, state.settings.health.probe_timeout_ms)
        .await;
    let status = StatusCode::from_u16(report.aggregate.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(report)).into_response()
}

/// Fallback route: every other request runs through the forwarding engine,
/// with the failover handler inspecting the result. The original method,
/// path, and query are captured up front so they survive the engine
/// consuming the request.
pub async fn gateway_passthrough(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Response {
    let method = request.method().clone();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    match state.engine.forward(request).await {
        Ok(response) => response,
        Err(trigger) => {
            state
                .failover
                .recover(method, &path_and_query, &trigger)
                .await
        }
    }
}
