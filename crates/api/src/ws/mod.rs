//! WebSocket bridge for workers running outside this process.
//!
//! Remote workers connect to `GET /ws/workers?worker_id=...`, receive the
//! start commands addressed to them, and publish status events back onto
//! the in-process bus.

mod bridge;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub use bridge::{worker_bridge, BridgeParams, FrameError};

/// Mount the worker bridge (root level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/ws/workers", get(worker_bridge))
}
