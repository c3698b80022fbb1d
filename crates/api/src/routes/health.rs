use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `stopping` once the dispatcher has been shut down.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Coordination tasks still running.
    pub in_flight: usize,
    /// Workers that have reported at least once.
    pub known_workers: usize,
}

/// GET /health -- returns service status and dispatch load.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.dispatcher.is_stopped() {
        "stopping"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        in_flight: state.dispatcher.in_flight(),
        known_workers: state.dispatcher.workers().len().await,
    })
}

/// Mount health check routes (root level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
