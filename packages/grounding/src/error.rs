//! Typed errors for the grounding core.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the transport layer
//! can map each failure class onto its own response.

use thiserror::Error;

use crate::pipeline::stage::Stage;

/// Errors raised by collaborators and core operations.
#[derive(Debug, Error)]
pub enum GroundingError {
    /// Completion service unavailable or failed
    #[error("AI service error: {0}")]
    AI(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Completion service answered, but not with a JSON object
    #[error("malformed model output: {reason}")]
    MalformedOutput { reason: String, raw: String },

    /// Model output parsed but is missing required keys or has unusable values
    #[error("invalid model output: {reason}")]
    InvalidOutput { reason: String },

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Audit/memory service failed
    #[error("audit trail error: {0}")]
    Audit(String),

    /// Call record not found
    #[error("call not found: {call_id}")]
    CallNotFound { call_id: String },

    /// Inbound payload violates the input contract
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// JSON (de)serialization error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl GroundingError {
    pub fn storage(message: impl Into<String>) -> Self {
        GroundingError::Storage(message.into().into())
    }

    pub fn ai(message: impl Into<String>) -> Self {
        GroundingError::AI(message.into().into())
    }
}

/// Errors that abort an analysis request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The knowledge base has no documents; nothing was written.
    #[error("knowledge base is empty; seed it before analyzing calls")]
    KnowledgeBaseEmpty,

    /// Payload rejected before any stage ran.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A fatal stage failed.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: GroundingError,
    },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, GroundingError>;

/// Result type alias for pipeline runs.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
