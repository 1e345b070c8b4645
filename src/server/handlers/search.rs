use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub k: Option<usize>,
}

impl SearchRequest {
    fn validated(self, default_k: usize) -> Result<(String, usize), ApiError> {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            return Err(ApiError::BadRequest("query cannot be empty".to_string()));
        }
        Ok((query, self.k.unwrap_or(default_k)))
    }
}

pub async fn search_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_search(&state, params).await
}

pub async fn search_post(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_search(&state, payload).await
}

async fn run_search(
    state: &AppState,
    request: SearchRequest,
) -> Result<impl IntoResponse, ApiError> {
    let (query, k) = request.validated(state.pipeline.options().default_k)?;
    let results = state.pipeline.similarity_search(&query, k).await?;
    Ok(Json(json!({ "query": query, "results": results })))
}

/// Retrieved context plus the assembled prompt; no text generation.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (query, k) = params.validated(state.pipeline.options().default_k)?;
    let context = state.pipeline.context_for(&query, k).await?;
    Ok(Json(context))
}
