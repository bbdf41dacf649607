//! Opaque request-forwarding engine.
//!
//! Stand-in for the external proxying engine the resilience layer wraps:
//! matches the request path against the configured routes, rotates through a
//! route's downstreams, and forwards the exchange. Carries no resilience
//! logic of its own; transport faults surface as errors for the failover
//! handler to act on.

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    response::Response,
};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::config::RouteConfig;
use crate::error::{AppError, Result};

/// Hop-by-hop headers never copied between the two exchanges
const HOP_BY_HOP_HEADERS: [&str; 4] = ["connection", "transfer-encoding", "keep-alive", "host"];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}

struct EngineRoute {
    config: RouteConfig,
    next_downstream: AtomicUsize,
}

/// Thin forwarding engine over the configured routes
pub struct ProxyEngine {
    client: Client,
    routes: Vec<EngineRoute>,
}

impl ProxyEngine {
    pub fn new(routes: Vec<RouteConfig>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        // A route with no downstreams can never serve a request
        let routes = routes
            .into_iter()
            .filter(|config| {
                if config.downstreams.is_empty() {
                    tracing::warn!(
                        service = %config.service_name,
                        "Skipping route with no downstreams"
                    );
                    return false;
                }
                true
            })
            .map(|config| EngineRoute {
                config,
                next_downstream: AtomicUsize::new(0),
            })
            .collect();

        Ok(Self { client, routes })
    }

    /// Pick the configured route with the longest matching path prefix
    fn match_route(&self, path: &str) -> Option<&EngineRoute> {
        self.routes
            .iter()
            .filter(|r| path.starts_with(&r.config.upstream_path_prefix))
            .max_by_key(|r| r.config.upstream_path_prefix.len())
    }

    /// Forward the request to the next downstream of the matching route
    pub async fn forward(&self, request: Request<Body>) -> Result<Response> {
        let path = request.uri().path().to_string();
        let route = self
            .match_route(&path)
            .ok_or_else(|| AppError::RouteNotFound(path.clone()))?;

        let index = route.next_downstream.fetch_add(1, Ordering::Relaxed)
            % route.config.downstreams.len();
        let downstream = &route.config.downstreams[index];

        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or(path);
        let url = format!("{}{}", downstream.base_url(), path_and_query);

        debug!(
            service = %route.config.service_name,
            url = %url,
            "Forwarding request downstream"
        );

        let method = request.method().clone();
        let headers = request.headers().clone();
        let body = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read request body: {}", e)))?;

        let mut outbound = self
            .client
            .request(method, &url)
            .body(body);
        for (name, value) in &headers {
            if !is_hop_by_hop(name.as_str()) {
                outbound = outbound.header(name, value);
            }
        }

        let upstream = outbound.send().await?;

        let status =
            StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let upstream_headers = upstream.headers().clone();
        let bytes = upstream.bytes().await?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        for (name, value) in &upstream_headers {
            if is_hop_by_hop(name.as_str()) || *name == header::CONTENT_LENGTH {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                name.as_str().parse::<HeaderName>(),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                response.headers_mut().insert(name, value);
            }
        }

        Ok(response)
    }
}
