use axum::{extract::Extension, Json};
use grounding::{AnalysisResponse, RiskSignals};

use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Ground one call's risk signals against the knowledge base.
pub async fn analyze_call_handler(
    Extension(state): Extension<AppState>,
    Json(signals): Json<RiskSignals>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let outcome = state.deps.pipeline.analyze_call(signals).await?;
    if outcome.used_fallback() {
        tracing::warn!(call_id = %outcome.response.call_id, "Returned fallback assessment");
    }
    Ok(Json(outcome.response))
}
