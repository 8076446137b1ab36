//! Simple reads and writes over stored calls and their documents.

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use grounding::{CallDocument, CallFilter, CallId, CallRecord, CallStore, CaseStatus, DocumentStore};
use serde::{Deserialize, Serialize};

use crate::server::app::AppState;
use crate::server::error::ApiError;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

fn parse_call_id(raw: &str) -> Result<CallId, ApiError> {
    CallId::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("Invalid call id: {}", raw)))
}

pub async fn get_call_handler(
    Extension(state): Extension<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallRecord>, ApiError> {
    let call_id = parse_call_id(&call_id)?;
    state
        .deps
        .pipeline
        .store()
        .get_call(&call_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Call {} not found", call_id)))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: CaseStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdated {
    pub call_id: CallId,
    pub status: CaseStatus,
}

pub async fn update_status_handler(
    Extension(state): Extension<AppState>,
    Path(call_id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<StatusUpdated>, ApiError> {
    let call_id = parse_call_id(&call_id)?;
    state
        .deps
        .pipeline
        .store()
        .update_status(&call_id, update.status)
        .await?;
    tracing::info!(call_id = %call_id, status = %update.status, "Case status updated");
    Ok(Json(StatusUpdated {
        call_id,
        status: update.status,
    }))
}

pub async fn get_document_handler(
    Extension(state): Extension<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallDocument>, ApiError> {
    let call_id = parse_call_id(&call_id)?;
    state
        .deps
        .pipeline
        .store()
        .get_document(&call_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No document for call {}", call_id)))
}

pub async fn regenerate_document_handler(
    Extension(state): Extension<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallDocument>, ApiError> {
    let call_id = parse_call_id(&call_id)?;
    Ok(Json(state.deps.pipeline.regenerate_document(&call_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<CaseStatus>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CallList {
    pub count: usize,
    pub calls: Vec<CallRecord>,
}

pub async fn list_calls_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<CallList>, ApiError> {
    let filter = CallFilter {
        status: params.status,
        limit: Some(
            params
                .limit
                .unwrap_or(DEFAULT_LIST_LIMIT)
                .clamp(1, MAX_LIST_LIMIT),
        ),
    };
    let calls = state.deps.pipeline.store().list_calls(&filter).await?;
    Ok(Json(CallList {
        count: calls.len(),
        calls,
    }))
}
