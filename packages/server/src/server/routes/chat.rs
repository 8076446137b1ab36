use axum::{extract::Extension, Json};
use grounding::{ChatRequest, ChatResponse};

use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Answer a question from the knowledge base and call history.
pub async fn chat_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    Ok(Json(state.deps.pipeline.chat(request).await?))
}
