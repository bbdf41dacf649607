//! Response caching middleware.
//!
//! Memoizes successful GET responses for a short TTL so repeated identical
//! requests never reach the downstream pipeline. Non-GET requests and the
//! health endpoints bypass the cache entirely. Only 2xx responses are ever
//! stored; everything else flows through untouched.

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    response::Response,
};
use futures::future::BoxFuture;
use std::{
    collections::HashMap,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::cache::{derive_cache_key, CacheEntry, CacheStore};
use crate::config::CacheConfig;

/// Headers the transport layer regenerates; never copied out of the cache
const RESTRICTED_HEADERS: [&str; 5] = [
    "content-length",
    "transfer-encoding",
    "connection",
    "date",
    "server",
];

fn is_restricted_header(name: &str) -> bool {
    RESTRICTED_HEADERS
        .iter()
        .any(|restricted| name.eq_ignore_ascii_case(restricted))
}

/// Response caching layer
#[derive(Clone)]
pub struct ResponseCacheLayer {
    store: Arc<CacheStore>,
    config: Arc<CacheConfig>,
}

impl ResponseCacheLayer {
    pub fn new(store: Arc<CacheStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for ResponseCacheLayer {
    type Service = ResponseCacheMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseCacheMiddleware {
            inner,
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

/// Response caching middleware service
#[derive(Clone)]
pub struct ResponseCacheMiddleware<S> {
    inner: S,
    store: Arc<CacheStore>,
    config: Arc<CacheConfig>,
}

impl<S> Service<Request<Body>> for ResponseCacheMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // Health endpoints and non-GET requests bypass the cache
        let path = request.uri().path();
        if !self.config.enabled
            || path == "/health"
            || path.starts_with("/health/")
            || request.method() != axum::http::Method::GET
        {
            let future = self.inner.call(request);
            return Box::pin(async move { future.await });
        }

        let key = derive_cache_key(
            request.method(),
            request.uri(),
            request.headers(),
            &self.config.vary_by_headers,
        );

        if let Some(entry) = self.store.get(&key) {
            debug!(key = %key, "Cache HIT");
            return Box::pin(async move { Ok(serve_cached(&entry)) });
        }

        debug!(key = %key, "Cache MISS");
        let store = self.store.clone();
        let ttl = Duration::from_secs(self.config.duration_secs);
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;
            let (parts, body) = response.into_parts();

            // Buffer the full body so it can be stored and replayed
            let bytes = match axum::body::to_bytes(body, usize::MAX).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to buffer response body");
                    return Ok(Response::from_parts(parts, Body::empty()));
                }
            };

            if parts.status.is_success() {
                let content_type = parts
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("application/json")
                    .to_string();

                let headers: HashMap<String, String> = parts
                    .headers
                    .iter()
                    .filter_map(|(name, value)| {
                        value
                            .to_str()
                            .ok()
                            .map(|v| (name.as_str().to_string(), v.to_string()))
                    })
                    .collect();

                store.insert(
                    key,
                    parts.status.as_u16(),
                    content_type,
                    headers,
                    bytes.clone(),
                    ttl,
                );
            }

            // The caller observes the same bytes whether cached or not
            Ok(Response::from_parts(parts, Body::from(bytes)))
        })
    }
}

/// Materialize a stored entry as the outbound response
fn serve_cached(entry: &CacheEntry) -> Response {
    let mut response = Response::new(Body::from(entry.body.clone()));
    *response.status_mut() =
        StatusCode::from_u16(entry.status_code).unwrap_or(StatusCode::OK);

    let headers = response.headers_mut();
    if let Ok(content_type) = HeaderValue::from_str(&entry.content_type) {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    headers.insert("x-cache", HeaderValue::from_static("HIT"));
    if let Ok(cached_at) = HeaderValue::from_str(&entry.cached_at.to_rfc3339()) {
        headers.insert("x-cache-date", cached_at);
    }

    for (name, value) in &entry.headers {
        if is_restricted_header(name) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            if !headers.contains_key(&name) {
                headers.insert(name, value);
            }
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restricted_headers_are_case_insensitive() {
        assert!(is_restricted_header("Content-Length"));
        assert!(is_restricted_header("content-length"));
        assert!(is_restricted_header("TRANSFER-ENCODING"));
        assert!(is_restricted_header("Server"));
        assert!(!is_restricted_header("Content-Type"));
        assert!(!is_restricted_header("X-Custom"));
    }

    #[test]
    fn test_serve_cached_sets_hit_headers() {
        let mut stored_headers = HashMap::new();
        stored_headers.insert("x-origin".to_string(), "downstream".to_string());
        stored_headers.insert("Content-Length".to_string(), "99".to_string());

        let entry = CacheEntry {
            status_code: 200,
            content_type: "application/json".to_string(),
            headers: stored_headers,
            body: bytes::Bytes::from_static(b"{\"ok\":true}"),
            cached_at: chrono::Utc::now(),
            ttl: Duration::from_secs(10),
        };

        let response = serve_cached(&entry);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-cache").unwrap(), "HIT");
        assert!(response.headers().get("x-cache-date").is_some());
        assert_eq!(response.headers().get("x-origin").unwrap(), "downstream");
        // Restricted header left to the transport layer
        assert!(response.headers().get("content-length").is_none());
    }
}
