//! Request errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grounding::{GroundingError, PipelineError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The service cannot answer yet (empty knowledge base)
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::KnowledgeBaseEmpty => ApiError::Unavailable(
                "Knowledge base is empty. Seed it via POST /api/v1/knowledge/seed first.".into(),
            ),
            PipelineError::InvalidInput(reason) => ApiError::BadRequest(reason),
            PipelineError::Stage { stage, source } => {
                ApiError::Internal(format!("Pipeline failed at {}: {}", stage, source))
            }
        }
    }
}

impl From<GroundingError> for ApiError {
    fn from(e: GroundingError) -> Self {
        match e {
            GroundingError::InvalidInput { reason } => ApiError::BadRequest(reason),
            GroundingError::CallNotFound { call_id } => {
                ApiError::NotFound(format!("Call {} not found", call_id))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grounding::Stage;

    #[test]
    fn test_pipeline_error_status_mapping() {
        assert_eq!(
            ApiError::from(PipelineError::KnowledgeBaseEmpty).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(PipelineError::InvalidInput("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
        let fatal = PipelineError::Stage {
            stage: Stage::Embed,
            source: GroundingError::Embedding("down".into()),
        };
        assert_eq!(ApiError::from(fatal).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_call_is_not_found() {
        let err = ApiError::from(GroundingError::CallNotFound {
            call_id: "call_2026_02_09_a1b2c3".into(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
