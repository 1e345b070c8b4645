use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::rag::{CancelToken, Metadata};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub documents: Vec<String>,
    pub metadata: Option<Vec<Metadata>>,
}

#[derive(Debug, Deserialize)]
pub struct IngestFilesRequest {
    #[serde(default)]
    pub paths: Vec<String>,
}

pub async fn ingest_documents(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .pipeline
        .process_and_store(payload.documents, payload.metadata)
        .await?;
    Ok(Json(report))
}

/// Paths are read on the server; relative ones resolve under the data dir.
pub async fn ingest_files(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IngestFilesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let paths: Vec<PathBuf> = payload
        .paths
        .iter()
        .map(|raw| state.paths.resolve(raw))
        .collect();
    let report = state
        .pipeline
        .ingest_files(paths, &CancelToken::never())
        .await?;
    Ok(Json(report))
}
