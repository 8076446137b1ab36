//! OpenAI implementation of the AI trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use grounding::ai::OpenAI;
//!
//! let ai = OpenAI::from_env()?.with_model("gpt-4o-mini");
//! let pipeline = GroundingPipeline::new(store, Arc::new(ai));
//! ```

use async_trait::async_trait;
use openai_client::{strip_code_blocks, ChatRequest, Message, OpenAIClient};
use tracing::{debug, instrument};

use crate::error::{GroundingError, Result};
use crate::traits::ai::{Completion, CompletionOptions, AI};

/// OpenAI-backed model provider.
///
/// Uses gpt-4o-mini for JSON completions and text-embedding-3-small for embeddings.
#[derive(Clone)]
pub struct OpenAI {
    client: OpenAIClient,
    model: String,
    embedding_model: String,
}

impl OpenAI {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_client(OpenAIClient::new(api_key))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: OpenAIClient) -> Self {
        Self {
            client,
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let client = OpenAIClient::from_env().map_err(|e| GroundingError::Config(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    /// Set the default chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

/// Parse a completion body into a JSON object, or report it as malformed with the raw text.
fn parse_json_object(content: &str) -> Result<serde_json::Value> {
    let cleaned = strip_code_blocks(content);
    match serde_json::from_str::<serde_json::Value>(cleaned) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err(GroundingError::MalformedOutput {
            reason: "response is not a JSON object".into(),
            raw: content.to_string(),
        }),
        Err(e) => Err(GroundingError::MalformedOutput {
            reason: e.to_string(),
            raw: content.to_string(),
        }),
    }
}

#[async_trait]
impl AI for OpenAI {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client
            .create_embedding(text, &self.embedding_model)
            .await
            .map_err(|e| GroundingError::Embedding(e.to_string()))
    }

    #[instrument(skip(self, system_prompt, user_prompt, options), fields(model))]
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let model = options.model.as_deref().unwrap_or(&self.model);
        tracing::Span::current().record("model", model);

        let mut request = ChatRequest::new(model)
            .message(Message::system(system_prompt))
            .message(Message::user(user_prompt))
            .json_mode();
        if let Some(temperature) = options.temperature {
            request = request.temperature(temperature);
        }

        let response = self
            .client
            .chat_completion(request)
            .await
            .map_err(|e| GroundingError::AI(Box::new(e)))?;

        let tokens_used = response.total_tokens();
        debug!(tokens_used, "Completion received");

        Ok(Completion {
            value: parse_json_object(&response.content)?,
            model: response.model,
            tokens_used,
        })
    }
}
