//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST   /                    -> submit_job
/// GET    /{job_id}/status     -> get_job_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::submit_job))
        .route("/{job_id}/status", get(jobs::get_job_status))
}
