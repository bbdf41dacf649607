//! Common error types for the gateway resilience layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("No route matches: {0}")]
    RouteNotFound(String),

    #[error("Pipeline failure: {0}")]
    PipelineFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body, camelCase to match the gateway wire format
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    pub details: String,
    pub trace_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
            AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred",
            ),
            AppError::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Response serialization failed",
            ),
            AppError::HttpClient(e) if e.is_timeout() => {
                (StatusCode::GATEWAY_TIMEOUT, "Downstream request timeout")
            }
            AppError::HttpClient(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Downstream service is unavailable",
            ),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Downstream request timeout"),
            AppError::RouteNotFound(_) => {
                (StatusCode::NOT_FOUND, "No route matches the request path")
            }
            AppError::PipelineFailure(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Downstream service is unavailable",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred",
            ),
        };

        let body = Json(ErrorBody {
            status_code: status.as_u16(),
            message: message.to_string(),
            details: self.to_string(),
            trace_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
