//! Probe client: single bounded-timeout health request against one endpoint
//!
//! Classification of outcomes is the whole job here. Retries, logging, and
//! aggregation belong to callers.

use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::{AppError, Result};

/// Classified outcome of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
    Unreachable,
    Timeout,
    ConnectionFailed,
    Error,
}

impl ProbeStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeStatus::Healthy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Healthy => "Healthy",
            ProbeStatus::Unhealthy => "Unhealthy",
            ProbeStatus::Unreachable => "Unreachable",
            ProbeStatus::Timeout => "Timeout",
            ProbeStatus::ConnectionFailed => "ConnectionFailed",
            ProbeStatus::Error => "Error",
        }
    }
}

/// Result of probing one endpoint
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub status: ProbeStatus,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub response_time_ms: u64,
}

/// Issues bounded health requests and classifies the outcome
#[derive(Clone)]
pub struct ProbeClient {
    client: Client,
}

impl ProbeClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Probe a full health URL with the given timeout.
    ///
    /// Never returns an error: every fault is classified into the result.
    pub async fn probe(&self, url: &str, timeout: Duration) -> ProbeResult {
        let started = Instant::now();

        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let code = response.status().as_u16();
                if response.status().is_success() {
                    ProbeResult {
                        status: ProbeStatus::Healthy,
                        status_code: Some(code),
                        error: None,
                        response_time_ms: elapsed_ms,
                    }
                } else {
                    ProbeResult {
                        status: ProbeStatus::Unhealthy,
                        status_code: Some(code),
                        error: Some(format!("HTTP {}", code)),
                        response_time_ms: elapsed_ms,
                    }
                }
            }
            Err(e) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let status = if e.is_timeout() {
                    ProbeStatus::Timeout
                } else if e.is_connect() {
                    ProbeStatus::ConnectionFailed
                } else {
                    ProbeStatus::Error
                };
                let error = match status {
                    ProbeStatus::Timeout => "Health check timeout".to_string(),
                    _ => e.to_string(),
                };
                ProbeResult {
                    status,
                    status_code: None,
                    error: Some(error),
                    response_time_ms: elapsed_ms,
                }
            }
        }
    }

    /// Probe the conventional `/health` path of a base URL
    pub async fn probe_health(&self, base_url: &str, timeout: Duration) -> ProbeResult {
        let url = format!("{}/health", base_url.trim_end_matches('/'));
        self.probe(&url, timeout).await
    }
}
