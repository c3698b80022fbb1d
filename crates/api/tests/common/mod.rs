#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use courier_api::config::ServerConfig;
use courier_api::router::build_app_router;
use courier_api::state::AppState;
use courier_dispatch::{DispatchConfig, StatusIngest};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

/// Dispatch timings shortened so end-to-end tests finish quickly.
pub fn fast_dispatch_config() -> DispatchConfig {
    DispatchConfig {
        start_job_timeout: Duration::from_secs(5),
        send_job_timeout: Duration::from_secs(2),
        command_status_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(20),
        status_retention: Duration::from_secs(60),
    }
}

/// Application state plus its (not yet spawned) status ingest.
pub fn test_state() -> (AppState, StatusIngest) {
    AppState::build(test_config(), fast_dispatch_config())
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state, &test_config())
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
