//! AI trait for embedding and JSON completion.
//!
//! The core only needs two capabilities from a model provider:
//! - Embedding free text into a vector for similarity search
//! - Completing a system + user prompt into a single JSON object
//!
//! Retrying is the caller's job; implementations make exactly one attempt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// AI trait for model operations.
///
/// Implementations wrap a specific provider and must request JSON-only output.
/// A reply that is not a JSON object is an error
/// ([`GroundingError::MalformedOutput`](crate::error::GroundingError::MalformedOutput)),
/// never a partially parsed value.
#[async_trait]
pub trait AI: Send + Sync {
    /// Generate an embedding for text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Complete a prompt pair into a JSON object.
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion>;
}

/// Per-call completion options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Override the implementation's default model.
    pub model: Option<String>,

    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A JSON completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Always a JSON object.
    pub value: serde_json::Value,

    /// Model that served the request.
    pub model: String,

    /// Prompt plus completion tokens, 0 when unreported.
    pub tokens_used: u32,
}
