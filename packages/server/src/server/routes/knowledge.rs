use axum::{extract::Extension, Json};
use grounding::SeedReport;
use serde::Serialize;

use crate::kernel::seed_from_dir;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Serialize)]
pub struct SeedResponse {
    seeded: bool,
    #[serde(flatten)]
    report: SeedReport,
}

/// Embed and upsert the knowledge seed files.
pub async fn seed_knowledge_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<SeedResponse>, ApiError> {
    let report = seed_from_dir(&state.deps.pipeline, &state.deps.knowledge_dir).await?;
    Ok(Json(SeedResponse {
        seeded: true,
        report,
    }))
}
