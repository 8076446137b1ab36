//! Retrieval-augmented chat over knowledge and past calls.
//!
//! One question pulls from four sources, merged in this order:
//! 1. Vector search over past calls (when requested)
//! 2. Direct lookup of call IDs named in the question
//! 3. Temporal window ("last 5 calls", "past 7 days")
//!
//! A call already present is never added again; first seen wins. Knowledge is
//! pooled across categories separately, and temporal questions may add a
//! cross-record memory section.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{GroundingError, Result};
use crate::traits::ai::{CompletionOptions, AI};
use crate::traits::store::RecordStore;
use crate::types::{
    CallId, CallMatch, ChatContext, ChatMetadata, ChatRequest, ChatResponse, ChatSource,
    KnowledgeMatch, SourceType, CHAT_FALLBACK_ANSWER, FALLBACK_MODEL,
};

use super::context::build_chat_context;
use super::orchestrator::GroundingPipeline;
use super::prompts::CHAT_SYSTEM_PROMPT;
use super::retrieval::retrieve_knowledge_for_chat;
use super::stage::with_retry;

lazy_static! {
    static ref TEMPORAL_PATTERN: Regex =
        Regex::new(r"(?i)\b(?:last|past|recent)\s+(\d{1,4})\s+(calls?|days?)\b").unwrap();
}

/// Model label reported when the chat model answered with non-JSON text.
const UNPARSED_MODEL: &str = "unknown";

/// Category label for call citations.
const CALL_SOURCE_CATEGORY: &str = "call_analysis";

/// A "last/past/recent N calls|days" request found in a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalQuery {
    LastCalls(usize),
    LastDays(i64),
}

impl TemporalQuery {
    /// First temporal phrase in the question. N must be at least 1.
    pub fn parse(question: &str) -> Option<Self> {
        let caps = TEMPORAL_PATTERN.captures(question)?;
        let n: i64 = caps.get(1)?.as_str().parse().ok()?;
        if n < 1 {
            return None;
        }
        let unit = caps.get(2)?.as_str().to_ascii_lowercase();
        if unit.starts_with("call") {
            Some(TemporalQuery::LastCalls(n as usize))
        } else {
            Some(TemporalQuery::LastDays(n))
        }
    }
}

/// Merge call sources in order, dropping any call ID already seen.
pub fn merge_calls(sources: impl IntoIterator<Item = Vec<CallMatch>>) -> Vec<CallMatch> {
    let mut seen: HashSet<CallId> = HashSet::new();
    let mut merged = Vec::new();
    for source in sources {
        for call in source {
            if seen.insert(call.call_id().clone()) {
                merged.push(call);
            } else {
                debug!(call_id = %call.call_id(), source = ?call.source, "Dropping duplicate call");
            }
        }
    }
    merged
}

/// Keys a JSON reply may carry its answer under, in preference order.
const ANSWER_KEYS: [&str; 4] = ["answer", "response", "text", "content"];

/// What the chat model said.
#[derive(Debug, Clone)]
struct ChatReply {
    answer: String,
    source_ids: Vec<String>,
    model: String,
    tokens_used: u32,
}

impl ChatReply {
    fn fallback() -> Self {
        Self {
            answer: CHAT_FALLBACK_ANSWER.to_string(),
            source_ids: Vec::new(),
            model: FALLBACK_MODEL.to_string(),
            tokens_used: 0,
        }
    }

    fn from_value(value: &Value, model: String, tokens_used: u32) -> Self {
        let answer = ANSWER_KEYS
            .iter()
            .filter_map(|key| value.get(*key).and_then(Value::as_str))
            .find(|text| !text.trim().is_empty())
            .unwrap_or(CHAT_FALLBACK_ANSWER)
            .to_string();
        let source_ids = value
            .get("source_ids")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            answer,
            source_ids,
            model,
            tokens_used,
        }
    }
}

impl<S, A> GroundingPipeline<S, A>
where
    S: RecordStore + ?Sized + 'static,
    A: AI + ?Sized + 'static,
{
    /// Answer a question from knowledge and call history.
    ///
    /// Only request validation and question embedding can fail; every
    /// retrieval source is skipped on error and the model falls back.
    #[instrument(skip(self, request), fields(question_len = request.question.len()))]
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        request
            .validate()
            .map_err(|reason| GroundingError::InvalidInput { reason })?;

        let context = self.retrieve_chat_context(&request).await?;
        let prompt = build_chat_context(&context);
        debug!(context_chars = prompt.len(), "Chat context built");

        let reply = self.complete_chat(&prompt).await;
        let sources = build_sources(&context, &reply.source_ids);

        info!(
            knowledge = context.knowledge.len(),
            calls = context.calls.len(),
            model = %reply.model,
            tokens = reply.tokens_used,
            "Chat answered"
        );

        Ok(ChatResponse {
            answer: reply.answer,
            sources,
            metadata: ChatMetadata {
                knowledge_docs_searched: context.knowledge.len(),
                calls_searched: context.calls.len(),
                model: reply.model,
                tokens_used: reply.tokens_used,
            },
        })
    }

    /// Gather and merge everything the chat model will see.
    pub async fn retrieve_chat_context(&self, request: &ChatRequest) -> Result<ChatContext> {
        let filters = &request.filters;
        let question = request.question.as_str();

        let embedding = with_retry("embed_question", || self.ai.embed(question)).await?;

        let knowledge: Vec<KnowledgeMatch> = if filters.search_knowledge {
            retrieve_knowledge_for_chat(
                self.store.as_ref(),
                &embedding,
                &filters.categories,
                filters.knowledge_limit,
            )
            .await
        } else {
            Vec::new()
        };

        let vector_calls = if filters.search_calls {
            match self.store.search_calls(&embedding, filters.calls_limit).await {
                Ok(found) => found
                    .into_iter()
                    .map(|(record, similarity)| CallMatch::vector(record, similarity))
                    .collect(),
                Err(e) => {
                    warn!(error = %e, "Call search failed, skipping");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let direct_calls = self.lookup_named_calls(question).await;

        let temporal = TemporalQuery::parse(question);
        let temporal_calls = match temporal {
            Some(query) => self.fetch_temporal(query).await,
            None => Vec::new(),
        };

        let memory = match temporal {
            Some(_) => match self.audit.query_memory(question).await {
                Ok(memory) => memory,
                Err(e) => {
                    warn!(error = %e, "Cross-call memory query failed, skipping");
                    None
                }
            },
            None => None,
        };

        let calls = merge_calls([vector_calls, direct_calls, temporal_calls]);

        let history_start = request
            .conversation_history
            .len()
            .saturating_sub(self.chat_config.max_history);
        let history = request.conversation_history[history_start..].to_vec();

        Ok(ChatContext {
            question: request.question.clone(),
            knowledge,
            calls,
            memory,
            history,
        })
    }

    async fn lookup_named_calls(&self, question: &str) -> Vec<CallMatch> {
        let mut found = Vec::new();
        for call_id in CallId::find_all(question) {
            match self.store.get_call(&call_id).await {
                Ok(Some(record)) => found.push(CallMatch::exact(record)),
                Ok(None) => debug!(call_id = %call_id, "Named call not found"),
                Err(e) => warn!(call_id = %call_id, error = %e, "Direct call lookup failed"),
            }
        }
        found
    }

    async fn fetch_temporal(&self, query: TemporalQuery) -> Vec<CallMatch> {
        let config = &self.chat_config;
        let now = Utc::now();
        let ceiling = now - Duration::days(config.lookback_ceiling_days);

        let result = match query {
            TemporalQuery::LastCalls(n) => {
                let limit = n.min(config.max_temporal_calls);
                self.store.recent_calls(limit, ceiling).await
            }
            TemporalQuery::LastDays(days) => {
                let since = now - Duration::days(days.min(config.lookback_ceiling_days));
                self.store.calls_since(since, config.max_temporal_calls).await
            }
        };

        match result {
            Ok(records) => {
                debug!(?query, calls = records.len(), "Temporal calls fetched");
                records.into_iter().map(CallMatch::temporal).collect()
            }
            Err(e) => {
                warn!(?query, error = %e, "Temporal call fetch failed, skipping");
                Vec::new()
            }
        }
    }

    async fn complete_chat(&self, prompt: &str) -> ChatReply {
        let options = CompletionOptions::new().with_temperature(self.chat_config.temperature);
        let reply = with_retry("chat", || async {
            match self
                .ai
                .complete_json(CHAT_SYSTEM_PROMPT, prompt, &options)
                .await
            {
                Ok(completion) => Ok(ChatReply::from_value(
                    &completion.value,
                    completion.model,
                    completion.tokens_used,
                )),
                // Plain text is still an answer
                Err(GroundingError::MalformedOutput { raw, .. }) => Ok(ChatReply {
                    answer: raw,
                    source_ids: Vec::new(),
                    model: UNPARSED_MODEL.to_string(),
                    tokens_used: 0,
                }),
                Err(e) => Err(e),
            }
        })
        .await;

        reply.unwrap_or_else(|e| {
            warn!(error = %e, "Chat model unavailable, using fallback answer");
            ChatReply::fallback()
        })
    }
}

fn build_sources(context: &ChatContext, cited_ids: &[String]) -> Vec<ChatSource> {
    let cited = |id: &str| cited_ids.iter().any(|c| c == id);

    let knowledge = context.knowledge.iter().map(|doc| ChatSource {
        source_type: SourceType::Knowledge,
        doc_id: doc.doc_id.clone(),
        category: doc.category.to_string(),
        title: doc.title.clone(),
        similarity: doc.similarity,
        cited: cited(&doc.doc_id),
    });

    let calls = context.calls.iter().map(|call| ChatSource {
        source_type: SourceType::Call,
        doc_id: call.call_id().to_string(),
        category: CALL_SOURCE_CATEGORY.to_string(),
        title: call_title(call),
        similarity: call.similarity,
        cited: cited(call.call_id().as_str()),
    });

    knowledge.chain(calls).collect()
}

fn call_title(call: &CallMatch) -> String {
    let summary: String = call.record.summary().chars().take(80).collect();
    format!("{} (risk {})", summary, call.record.risk_score())
}
