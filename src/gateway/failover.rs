//! Failover handler.
//!
//! When the inner pipeline fails, walks the ordered fallback gateway list and
//! reissues the original request against each candidate until one answers
//! with a success status. First success wins; a failing candidate is logged
//! and skipped. Exhaustion produces a terminal 503 — the trigger is never
//! rethrown to the transport layer.

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::FailoverConfig;
use crate::error::{AppError, Result};

/// Terminal failure body emitted when every fallback is exhausted
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverErrorBody {
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
}

/// Walks the fallback gateway chain on pipeline failure
pub struct FailoverHandler {
    client: Client,
    fallback_gateways: Vec<String>,
}

impl FailoverHandler {
    pub fn new(config: &FailoverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            fallback_gateways: config.fallback_gateways.clone(),
        })
    }

    /// Recover from a pipeline failure by trying each fallback in order.
    /// Always produces a response.
    pub async fn recover(
        &self,
        method: Method,
        path_and_query: &str,
        trigger: &AppError,
    ) -> Response {
        error!(error = %trigger, "Primary gateway pipeline failed, attempting failover");

        for gateway in &self.fallback_gateways {
            info!(gateway = %gateway, "Attempting failover");
            let url = format!("{}{}", gateway.trim_end_matches('/'), path_and_query);

            match self.client.request(method.clone(), &url).send().await {
                Ok(response) if response.status().is_success() => {
                    let status = StatusCode::from_u16(response.status().as_u16())
                        .unwrap_or(StatusCode::OK);
                    let content_type = response
                        .headers()
                        .get(header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("application/json")
                        .to_string();

                    match response.bytes().await {
                        Ok(bytes) => {
                            info!(gateway = %gateway, "Successfully failed over");
                            let mut out = Response::new(Body::from(bytes));
                            *out.status_mut() = status;
                            if let Ok(value) = HeaderValue::from_str(&content_type) {
                                out.headers_mut().insert(header::CONTENT_TYPE, value);
                            }
                            return out;
                        }
                        Err(e) => {
                            warn!(gateway = %gateway, error = %e, "Failover response body read failed");
                            continue;
                        }
                    }
                }
                Ok(response) => {
                    warn!(
                        gateway = %gateway,
                        status = response.status().as_u16(),
                        "Failover candidate returned failure status"
                    );
                }
                Err(e) => {
                    warn!(gateway = %gateway, error = %e, "Failover attempt failed");
                }
            }
        }

        self.complete_failure(trigger)
    }

    /// Every candidate exhausted: emit the terminal 503
    fn complete_failure(&self, trigger: &AppError) -> Response {
        let trace_id = Uuid::new_v4().to_string();
        error!(
            trace_id = %trace_id,
            error = %trigger,
            "All gateway instances failed"
        );

        let body = FailoverErrorBody {
            error: "All API Gateway instances are unavailable".to_string(),
            message: "The service is temporarily unavailable. Please try again later.".to_string(),
            timestamp: Utc::now(),
            trace_id,
        };

        let json = serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec());
        let mut response = Response::new(Body::from(json));
        *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_chain_produces_terminal_503() {
        let handler = FailoverHandler::new(&FailoverConfig {
            fallback_gateways: vec![],
            request_timeout_ms: 1000,
        })
        .unwrap();

        let response = handler
            .recover(
                Method::GET,
                "/api/users",
                &AppError::PipelineFailure("connection reset".to_string()),
            )
            .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
