//! Handlers for the `/workers` resource (read-only view of the registry).

use axum::extract::{Path, Query, State};
use axum::Json;
use courier_core::error::CoreError;
use courier_core::status::Availability;
use courier_dispatch::WorkerRecord;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /api/v1/workers`.
#[derive(Debug, Deserialize)]
pub struct WorkerListParams {
    pub availability: Option<Availability>,
}

/// GET /api/v1/workers
///
/// Every known worker ordered by id, optionally filtered by availability.
pub async fn list_workers(
    State(state): State<AppState>,
    Query(params): Query<WorkerListParams>,
) -> Json<DataResponse<Vec<WorkerRecord>>> {
    let mut workers = state.dispatcher.workers().list_all().await;
    if let Some(availability) = params.availability {
        workers.retain(|w| w.availability == availability);
    }
    Json(DataResponse { data: workers })
}

/// GET /api/v1/workers/{worker_id}
pub async fn get_worker(
    State(state): State<AppState>,
    Path(worker_id): Path<String>,
) -> AppResult<Json<DataResponse<WorkerRecord>>> {
    let worker = state
        .dispatcher
        .workers()
        .get(&worker_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Worker",
            id: worker_id,
        }))?;
    Ok(Json(DataResponse { data: worker }))
}
