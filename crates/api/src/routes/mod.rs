pub mod health;
pub mod jobs;
pub mod workers;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /jobs                          submit (POST)
/// /jobs/{job_id}/status          command status (GET)
///
/// /workers                       list, optional ?availability= filter (GET)
/// /workers/{worker_id}           single worker (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/workers", workers::router())
}
