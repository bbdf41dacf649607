//! Integration tests for the failover handler and the wrapped pipeline

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use resilience_gateway::config::{
    CacheConfig, DownstreamAddr, FailoverConfig, RouteConfig, Settings,
};
use resilience_gateway::error::AppError;
use resilience_gateway::gateway::failover::FailoverHandler;
use resilience_gateway::{api, AppState};

fn handler_for(gateways: Vec<String>) -> FailoverHandler {
    FailoverHandler::new(&FailoverConfig {
        fallback_gateways: gateways,
        request_timeout_ms: 1000,
    })
    .unwrap()
}

fn trigger() -> AppError {
    AppError::PipelineFailure("connection reset by peer".to_string())
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_first_successful_fallback_wins_and_later_ones_are_never_contacted() {
    let f1 = MockServer::start().await;
    let f2 = MockServer::start().await;
    let f3 = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&f1)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{\"from\":\"f2\"}", "application/json"),
        )
        .mount(&f2)
        .await;
    // F3 must never be reached once F2 succeeds
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&f3)
        .await;

    let handler = handler_for(vec![f1.uri(), f2.uri(), f3.uri()]);
    let response = handler
        .recover(Method::GET, "/api/users", &trigger())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert_eq!(&body[..], b"{\"from\":\"f2\"}");

    f3.verify().await;
}

#[tokio::test]
async fn test_unreachable_candidate_is_skipped() {
    let f2 = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/plain"))
        .mount(&f2)
        .await;

    // First candidate refuses connections entirely
    let handler = handler_for(vec!["http://127.0.0.1:1".to_string(), f2.uri()]);
    let response = handler
        .recover(Method::GET, "/api/users", &trigger())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], b"ok");
}

#[tokio::test]
async fn test_exhausted_chain_yields_503_with_trace_id() {
    let f1 = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&f1)
        .await;

    let handler = handler_for(vec![f1.uri(), "http://127.0.0.1:1".to_string()]);
    let response = handler
        .recover(Method::GET, "/api/users?id=7", &trigger())
        .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(
        body["error"],
        "All API Gateway instances are unavailable"
    );
    assert!(body["message"].as_str().unwrap().contains("temporarily unavailable"));
    assert!(!body["traceId"].as_str().unwrap().is_empty());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_query_string_is_forwarded_to_fallback() {
    let f1 = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(wiremock::matchers::query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("page3", "text/plain"))
        .mount(&f1)
        .await;

    let handler = handler_for(vec![f1.uri()]);
    let response = handler
        .recover(Method::GET, "/api/users?page=3", &trigger())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], b"page3");
}

#[tokio::test]
async fn test_pipeline_failure_triggers_failover_end_to_end() {
    let fallback = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("{\"from\":\"fallback\"}", "application/json"),
        )
        .mount(&fallback)
        .await;

    let mut settings = Settings::default();
    settings.routes = vec![RouteConfig {
        service_name: "users".to_string(),
        upstream_path_prefix: "/api/users".to_string(),
        // Nothing listens here: the engine's forward attempt fails
        downstreams: vec![DownstreamAddr {
            host: "127.0.0.1".to_string(),
            port: 1,
        }],
    }];
    settings.failover = FailoverConfig {
        fallback_gateways: vec![fallback.uri()],
        request_timeout_ms: 1000,
    };
    settings.cache = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };

    let state = Arc::new(AppState::from_settings(settings).unwrap());
    let app = api::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], b"{\"from\":\"fallback\"}");
}

#[tokio::test]
async fn test_unrouted_path_with_no_fallbacks_is_terminal_503() {
    let settings = Settings {
        cache: CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        },
        ..Settings::default()
    };
    let state = Arc::new(AppState::from_settings(settings).unwrap());
    let app = api::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(!body["traceId"].as_str().unwrap().is_empty());
}
