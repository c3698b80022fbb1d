//! Handlers for the `/jobs` resource.
//!
//! Submission only registers the job and starts its coordination task;
//! callers poll the status endpoint to follow progress.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use courier_dispatch::{CommandStatus, Job};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitJob {
    /// Caller-chosen id; a UUIDv7 is generated when absent.
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// POST /api/v1/jobs
///
/// Returns 202 with the freshly registered command status.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    let job_id = input
        .job_id
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let handle = state
        .dispatcher
        .try_start_job(Job::new(job_id, input.payload))
        .await?;
    let status = handle.status().await?;

    tracing::info!(job_id = %handle.command_id(), "Job submitted");

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: status })))
}

/// GET /api/v1/jobs/{job_id}/status
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<DataResponse<CommandStatus>>> {
    let status = state.dispatcher.handle(job_id).status().await?;
    Ok(Json(DataResponse { data: status }))
}
