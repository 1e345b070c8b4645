use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let indexed_chunks = state.pipeline.adapter().store().count().await?;
    Ok(Json(json!({
        "status": "running",
        "initialized": state.pipeline.is_initialized(),
        "indexed_chunks": indexed_chunks,
        "embedding_provider": state.pipeline.adapter().embedder_name(),
        "scheduler_running": state.scheduler.is_running(),
        "jobs": state.scheduler.get_all_jobs().len(),
        "started_at": state.started_at,
    })))
}
