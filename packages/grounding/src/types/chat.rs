//! Chat request/response types.

use serde::{Deserialize, Serialize};

use super::call::CallMatch;
use super::knowledge::{KnowledgeCategory, KnowledgeMatch};

/// Minimum question length accepted by chat.
pub const MIN_QUESTION_LEN: usize = 5;

/// Upper bound for both per-request retrieval limits.
pub const MAX_CHAT_LIMIT: usize = 10;

/// Answer returned when the chat model is unavailable after retry.
pub const CHAT_FALLBACK_ANSWER: &str =
    "I'm sorry, the knowledge assistant is temporarily unavailable. Please try again in a moment.";

/// Model name reported when the fallback answer was used.
pub const FALLBACK_MODEL: &str = "fallback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Capitalized label used in rendered history.
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Which sources the chat searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatFilters {
    pub search_knowledge: bool,
    pub search_calls: bool,
    pub categories: Vec<KnowledgeCategory>,
    /// Overall cap on pooled knowledge documents (1–10)
    pub knowledge_limit: usize,
    /// Cap on vector-retrieved calls (1–10)
    pub calls_limit: usize,
}

impl Default for ChatFilters {
    fn default() -> Self {
        Self {
            search_knowledge: true,
            search_calls: false,
            categories: KnowledgeCategory::ALL.to_vec(),
            knowledge_limit: 5,
            calls_limit: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(default)]
    pub filters: ChatFilters,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            conversation_history: Vec::new(),
            filters: ChatFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: ChatFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.conversation_history = history;
        self
    }

    /// Reject requests outside the accepted ranges.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.question.trim().chars().count() < MIN_QUESTION_LEN {
            return Err(format!(
                "question must be at least {} characters",
                MIN_QUESTION_LEN
            ));
        }
        if !(1..=MAX_CHAT_LIMIT).contains(&self.filters.knowledge_limit) {
            return Err(format!(
                "knowledge_limit must be within 1..={}",
                MAX_CHAT_LIMIT
            ));
        }
        if !(1..=MAX_CHAT_LIMIT).contains(&self.filters.calls_limit) {
            return Err(format!("calls_limit must be within 1..={}", MAX_CHAT_LIMIT));
        }
        if self.conversation_history.iter().any(|m| m.content.is_empty()) {
            return Err("conversation_history messages must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Knowledge,
    Call,
}

/// One citation in the chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSource {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Knowledge doc ID or call ID
    pub doc_id: String,
    pub category: String,
    pub title: String,
    pub similarity: f32,
    /// Whether the model named this source in its answer
    #[serde(default)]
    pub cited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMetadata {
    pub knowledge_docs_searched: usize,
    pub calls_searched: usize,
    pub model: String,
    pub tokens_used: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<ChatSource>,
    pub metadata: ChatMetadata,
}

/// Everything retrieved for one question. Lives for one request only.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub question: String,
    pub knowledge: Vec<KnowledgeMatch>,
    pub calls: Vec<CallMatch>,
    /// Prose from the cross-record memory service, when queried
    pub memory: Option<String>,
    pub history: Vec<ChatMessage>,
}
