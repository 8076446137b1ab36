//! Backboard audit trail and cross-call memory.
//!
//! One assistant per deployment, one thread per call. Messages are stored
//! without being sent to the model; questions are sent with memory enabled so
//! answers can draw on every thread.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use grounding::{AuditTrail, CallId, GroundingError};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://app.backboard.io/api";

const ASSISTANT_NAME: &str = "VoiceOps RAG Auditor";

const ASSISTANT_PROMPT: &str = "You are a reasoning audit assistant for a financial call risk \
analysis pipeline. You store grounding context, retrieved knowledge, and model reasoning output \
for each call to provide full traceability. When asked about past calls, summarize the reasoning \
chain and highlight risk patterns.";

/// Backboard API client
pub struct BackboardClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    assistant_id: OnceCell<String>,
}

/// Create responses carry the id under one of two names
#[derive(Debug, Deserialize)]
struct CreatedResource {
    #[serde(default)]
    assistant_id: Option<String>,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl CreatedResource {
    fn assistant(self) -> Option<String> {
        self.assistant_id.or(self.id)
    }

    fn thread(self) -> Option<String> {
        self.thread_id.or(self.id)
    }
}

impl BackboardClient {
    /// Create a new Backboard client
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
            assistant_id: OnceCell::new(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<CreatedResource> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send Backboard request to {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Backboard API error {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse Backboard response")
    }

    /// Create the assistant once and reuse it.
    async fn assistant(&self) -> Result<&str> {
        let id = self
            .assistant_id
            .get_or_try_init(|| async {
                let created = self
                    .post_json(
                        "/assistants",
                        &json!({"name": ASSISTANT_NAME, "system_prompt": ASSISTANT_PROMPT}),
                    )
                    .await?;
                let id = created
                    .assistant()
                    .context("Backboard assistant response had no id")?;
                info!(assistant_id = %id, "Backboard assistant ready");
                Ok::<_, anyhow::Error>(id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn create_thread(&self, metadata: Value) -> Result<String> {
        let assistant = self.assistant().await?;
        self.post_json(
            &format!("/assistants/{}/threads", assistant),
            &json!({ "metadata_": metadata }),
        )
        .await?
        .thread()
        .context("Backboard thread response had no id")
    }

    /// Post a message to a thread. `send_to_llm` decides whether it is answered.
    async fn post_message(&self, thread_id: &str, content: &str, send_to_llm: bool) -> Result<Value> {
        let send = if send_to_llm { "true" } else { "false" };
        let response = self
            .client
            .post(format!("{}/threads/{}/messages", self.base_url, thread_id))
            .header("X-API-Key", &self.api_key)
            .form(&[
                ("content", content),
                ("send_to_llm", send),
                ("stream", "false"),
                ("memory", "Auto"),
            ])
            .send()
            .await
            .context("Failed to send Backboard message")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Backboard API error {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse Backboard message response")
    }
}

/// The assistant's reply text from a message response.
fn reply_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("content")
            .or_else(|| map.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn audit_err(e: anyhow::Error) -> GroundingError {
    GroundingError::Audit(format!("{:#}", e))
}

#[async_trait]
impl AuditTrail for BackboardClient {
    async fn start_thread(&self, call_id: &CallId) -> grounding::Result<Option<String>> {
        let thread = self
            .create_thread(json!({"call_id": call_id.as_str(), "source": "voiceops_rag"}))
            .await
            .map_err(audit_err)?;
        debug!(call_id = %call_id, thread_id = %thread, "Backboard thread created");
        Ok(Some(thread))
    }

    async fn append(&self, thread_id: &str, label: &str, content: &str) -> grounding::Result<()> {
        self.post_message(thread_id, content, false)
            .await
            .map_err(audit_err)?;
        debug!(thread_id, label, "Backboard message stored");
        Ok(())
    }

    async fn query_thread(&self, thread_id: &str, question: &str) -> grounding::Result<Option<String>> {
        let reply = self
            .post_message(thread_id, question, true)
            .await
            .map_err(audit_err)?;
        Ok(reply_text(&reply))
    }

    /// Memory is assistant-wide, so a scratch thread is enough to reach it.
    async fn query_memory(&self, question: &str) -> grounding::Result<Option<String>> {
        let thread = self
            .create_thread(json!({"purpose": "memory_query"}))
            .await
            .map_err(audit_err)?;
        self.query_thread(&thread, question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_resource_prefers_specific_id() {
        let created: CreatedResource =
            serde_json::from_value(json!({"thread_id": "t-1", "id": "other"})).unwrap();
        assert_eq!(created.thread().as_deref(), Some("t-1"));

        let created: CreatedResource = serde_json::from_value(json!({"id": "a-9"})).unwrap();
        assert_eq!(created.assistant().as_deref(), Some("a-9"));
    }

    #[test]
    fn test_reply_text_shapes() {
        assert_eq!(
            reply_text(&json!({"content": "Three calls mention salary."})).as_deref(),
            Some("Three calls mention salary.")
        );
        assert_eq!(
            reply_text(&json!({"message": "ok"})).as_deref(),
            Some("ok")
        );
        assert_eq!(reply_text(&Value::Null), None);
        assert_eq!(
            reply_text(&json!({"status": "done"})).as_deref(),
            Some(r#"{"status":"done"}"#)
        );
    }
}
