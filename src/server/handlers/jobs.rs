use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::{ApiError, RagError};
use crate::state::AppState;

pub async fn list_jobs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "running": state.scheduler.is_running(),
        "jobs": state.scheduler.get_all_jobs(),
    }))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    Json(state.scheduler.get_job_status(&job_id))
}

/// Unknown ids are not an error here.
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let removed = state.scheduler.remove_job(&job_id);
    Json(json!({ "id": job_id, "removed": removed }))
}

pub async fn pause_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.scheduler.pause_job(&job_id) {
        return Err(RagError::JobNotFound(job_id).into());
    }
    Ok(Json(state.scheduler.get_job_status(&job_id)))
}

pub async fn resume_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.scheduler.resume_job(&job_id) {
        return Err(RagError::JobNotFound(job_id).into());
    }
    Ok(Json(state.scheduler.get_job_status(&job_id)))
}

pub async fn start_scheduler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.scheduler.start()?;
    Ok(Json(json!({ "running": true })))
}

pub async fn stop_scheduler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.scheduler.stop()?;
    Ok(Json(json!({ "running": false })))
}
