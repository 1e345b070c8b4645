use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    #[serde(default)]
    pub text: String,
}

pub async fn check_flags(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FlagRequest>,
) -> impl IntoResponse {
    Json(state.parser.parse(&payload.text))
}
