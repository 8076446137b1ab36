//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the grounding library
//! without making real model, database, or audit service calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use crate::error::{GroundingError, Result};
use crate::pipeline::prompts::{CHAT_SYSTEM_PROMPT, EXTRACTION_SYSTEM_PROMPT, REASONING_SYSTEM_PROMPT};
use crate::traits::{
    ai::{Completion, CompletionOptions, AI},
    audit::AuditTrail,
    store::{CallStore, DocumentStore, KnowledgeStore},
};
use crate::types::{
    CallContext, CallDocument, CallFilter, CallId, CallQuality, CallRecord, CaseStatus,
    EntityMentions, IntentInsight, KnowledgeCategory, KnowledgeDocument, KnowledgeMatch, Level,
    NlpInsights, ObligationStrength, RagOutput, RiskAssessment, RiskSignals, SentimentInsight,
    SignalFlags, SpeakerAnalysis, SpeechNaturalness, TranscriptTurn,
};

/// Model name the mock reports for successful completions.
pub const MOCK_MODEL: &str = "mock-model";

/// Which pipeline prompt a completion was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Reasoning,
    Extraction,
    Chat,
    Other,
}

impl PromptKind {
    fn of(system_prompt: &str) -> Self {
        if system_prompt == REASONING_SYSTEM_PROMPT {
            PromptKind::Reasoning
        } else if system_prompt == EXTRACTION_SYSTEM_PROMPT {
            PromptKind::Extraction
        } else if system_prompt == CHAT_SYSTEM_PROMPT {
            PromptKind::Chat
        } else {
            PromptKind::Other
        }
    }
}

/// A scripted completion reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this JSON object.
    Json(Value),
    /// Return unparseable text.
    Malformed(String),
    /// Fail with a provider error.
    Fail(String),
}

/// Record of a call made to the mock AI.
#[derive(Debug, Clone, PartialEq)]
pub enum MockAICall {
    Embed { text: String },
    Complete { kind: PromptKind, model: Option<String>, user_prompt: String },
}

/// A mock AI implementation for testing.
///
/// Embeddings are deterministic per text. Completions pop scripted replies per
/// prompt kind and fall back to a valid default once the script runs out.
#[derive(Default)]
pub struct MockAI {
    /// Scripted replies by prompt kind
    replies: Arc<RwLock<HashMap<PromptKind, VecDeque<MockReply>>>>,

    /// Predefined embeddings by text
    embeddings: Arc<RwLock<HashMap<String, Vec<f32>>>>,

    /// Remaining embedding calls that should fail
    embed_failures: Arc<RwLock<usize>>,

    /// Default embedding dimension
    embedding_dim: usize,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockAICall>>>,
}

impl MockAI {
    /// Create a new mock AI with default behavior.
    pub fn new() -> Self {
        Self {
            embedding_dim: 64,
            ..Default::default()
        }
    }

    /// Set the embedding dimension.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Add a predefined embedding for text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embeddings
            .write()
            .unwrap()
            .insert(text.into(), embedding);
        self
    }

    /// Queue a reply for the next completion of the given kind.
    pub fn with_reply(self, kind: PromptKind, reply: MockReply) -> Self {
        self.push_reply(kind, reply);
        self
    }

    /// Queue `times` provider failures for the given kind.
    pub fn failing(self, kind: PromptKind, times: usize) -> Self {
        for _ in 0..times {
            self.push_reply(kind, MockReply::Fail(format!("{:?} model unavailable", kind)));
        }
        self
    }

    /// Make the next `times` embedding calls fail.
    pub fn failing_embeddings(self, times: usize) -> Self {
        *self.embed_failures.write().unwrap() = times;
        self
    }

    pub fn push_reply(&self, kind: PromptKind, reply: MockReply) {
        self.replies
            .write()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(reply);
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockAICall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of completions made for a prompt kind.
    pub fn completions(&self, kind: PromptKind) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockAICall::Complete { kind: k, .. } if *k == kind))
            .count()
    }

    /// Number of embedding calls made.
    pub fn embed_count(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockAICall::Embed { .. }))
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    /// Generate a deterministic embedding based on text.
    pub fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();

        (0..self.embedding_dim)
            .map(|i| {
                let byte = hash[i % 32] as f32;
                (byte / 127.5) - 1.0
            })
            .collect()
    }

    fn default_reply(kind: PromptKind) -> Value {
        match kind {
            PromptKind::Reasoning => default_rag_output(),
            PromptKind::Extraction => default_call_document(),
            PromptKind::Chat => json!({
                "answer": "Based on the retrieved knowledge, the call matches a conditional promise pattern.",
                "source_ids": []
            }),
            PromptKind::Other => json!({}),
        }
    }
}

/// A valid reasoning reply.
pub fn default_rag_output() -> Value {
    json!({
        "grounded_assessment": "medium_risk",
        "explanation": "Conditional payment promise with a contradiction matches a known pattern.",
        "recommended_action": "flag_for_review",
        "confidence": 0.74,
        "regulatory_flags": [],
        "matched_patterns": ["Conditional Promise"]
    })
}

/// A valid extraction reply.
pub fn default_call_document() -> Value {
    json!({
        "financial_data": {
            "amounts_mentioned": [{"value": 15000, "currency": "INR", "context": "promised payment"}],
            "payment_commitments": [{"amount": 15000, "due_date": "next week", "type": "full"}]
        },
        "entities": {"person_names": ["Ravi"], "organizations": [], "dates": ["next week"],
                     "locations": [], "account_references": [], "phone_numbers": []},
        "commitments": [{"speaker": "customer", "commitment": "Pay next week",
                         "type": "payment", "confidence": 0.7, "conditional": true,
                         "condition": "salary credited"}],
        "call_summary": "Customer promised to pay 15000 next week, conditional on salary.",
        "call_purpose": "debt_collection",
        "call_outcome": "payment_committed",
        "key_discussion_points": ["Overdue EMI"],
        "compliance_notes": [],
        "risk_flags": ["conditional_commitment"],
        "action_items": ["Follow up next week"],
        "call_timeline": []
    })
}

#[async_trait]
impl AI for MockAI {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.write().unwrap().push(MockAICall::Embed {
            text: text.to_string(),
        });

        {
            let mut failures = self.embed_failures.write().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(GroundingError::Embedding("embedding service unavailable".into()));
            }
        }

        Ok(self
            .embeddings
            .read()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.deterministic_embedding(text)))
    }

    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let kind = PromptKind::of(system_prompt);
        self.calls.write().unwrap().push(MockAICall::Complete {
            kind,
            model: options.model.clone(),
            user_prompt: user_prompt.to_string(),
        });

        let scripted = self
            .replies
            .write()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);

        let model = options.model.clone().unwrap_or_else(|| MOCK_MODEL.to_string());
        match scripted.unwrap_or_else(|| MockReply::Json(Self::default_reply(kind))) {
            MockReply::Json(value) => Ok(Completion {
                value,
                model,
                tokens_used: 120,
            }),
            MockReply::Malformed(raw) => Err(GroundingError::MalformedOutput {
                reason: "not JSON".into(),
                raw,
            }),
            MockReply::Fail(message) => Err(GroundingError::ai(message)),
        }
    }
}

/// Store operations that [`FaultyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertCall,
    GetCall,
    StoreCallEmbedding,
    UpdateRagOutput,
    UpdateStatus,
    SearchCalls,
    RecentCalls,
    ListCalls,
    CountKnowledge,
    SearchKnowledge,
    UpsertKnowledge,
    UpsertDocument,
    GetDocument,
    StoreDocumentEmbedding,
}

/// Wraps a store and fails selected operations.
pub struct FaultyStore<S> {
    inner: S,
    failing: RwLock<HashSet<StoreOp>>,
    failing_categories: RwLock<HashSet<KnowledgeCategory>>,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing: RwLock::new(HashSet::new()),
            failing_categories: RwLock::new(HashSet::new()),
        }
    }

    /// Fail every call to `op`.
    pub fn fail(self, op: StoreOp) -> Self {
        self.failing.write().unwrap().insert(op);
        self
    }

    /// Fail knowledge searches for one category only.
    pub fn fail_category(self, category: KnowledgeCategory) -> Self {
        self.failing_categories.write().unwrap().insert(category);
        self
    }

    /// Stop failing `op`.
    pub fn heal(&self, op: StoreOp) {
        self.failing.write().unwrap().remove(&op);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, op: StoreOp) -> Result<()> {
        if self.failing.read().unwrap().contains(&op) {
            return Err(GroundingError::storage(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: CallStore> CallStore for FaultyStore<S> {
    async fn insert_call(&self, record: &CallRecord) -> Result<()> {
        self.check(StoreOp::InsertCall)?;
        self.inner.insert_call(record).await
    }

    async fn get_call(&self, call_id: &CallId) -> Result<Option<CallRecord>> {
        self.check(StoreOp::GetCall)?;
        self.inner.get_call(call_id).await
    }

    async fn store_call_embedding(&self, call_id: &CallId, embedding: &[f32]) -> Result<()> {
        self.check(StoreOp::StoreCallEmbedding)?;
        self.inner.store_call_embedding(call_id, embedding).await
    }

    async fn update_rag_output(&self, call_id: &CallId, output: &RagOutput) -> Result<()> {
        self.check(StoreOp::UpdateRagOutput)?;
        self.inner.update_rag_output(call_id, output).await
    }

    async fn update_status(&self, call_id: &CallId, status: CaseStatus) -> Result<()> {
        self.check(StoreOp::UpdateStatus)?;
        self.inner.update_status(call_id, status).await
    }

    async fn search_calls(&self, embedding: &[f32], limit: usize) -> Result<Vec<(CallRecord, f32)>> {
        self.check(StoreOp::SearchCalls)?;
        self.inner.search_calls(embedding, limit).await
    }

    async fn recent_calls(&self, limit: usize, since: DateTime<Utc>) -> Result<Vec<CallRecord>> {
        self.check(StoreOp::RecentCalls)?;
        self.inner.recent_calls(limit, since).await
    }

    async fn list_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>> {
        self.check(StoreOp::ListCalls)?;
        self.inner.list_calls(filter).await
    }
}

#[async_trait]
impl<S: KnowledgeStore> KnowledgeStore for FaultyStore<S> {
    async fn count_knowledge(&self) -> Result<usize> {
        self.check(StoreOp::CountKnowledge)?;
        self.inner.count_knowledge().await
    }

    async fn search_knowledge(
        &self,
        embedding: &[f32],
        category: KnowledgeCategory,
        limit: usize,
    ) -> Result<Vec<KnowledgeMatch>> {
        self.check(StoreOp::SearchKnowledge)?;
        if self.failing_categories.read().unwrap().contains(&category) {
            return Err(GroundingError::storage(format!(
                "injected search failure for {}",
                category
            )));
        }
        self.inner.search_knowledge(embedding, category, limit).await
    }

    async fn upsert_knowledge(&self, doc: &KnowledgeDocument, embedding: &[f32]) -> Result<()> {
        self.check(StoreOp::UpsertKnowledge)?;
        self.inner.upsert_knowledge(doc, embedding).await
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for FaultyStore<S> {
    async fn upsert_document(&self, doc: &CallDocument) -> Result<()> {
        self.check(StoreOp::UpsertDocument)?;
        self.inner.upsert_document(doc).await
    }

    async fn get_document(&self, call_id: &CallId) -> Result<Option<CallDocument>> {
        self.check(StoreOp::GetDocument)?;
        self.inner.get_document(call_id).await
    }

    async fn store_document_embedding(&self, call_id: &CallId, embedding: &[f32]) -> Result<()> {
        self.check(StoreOp::StoreDocumentEmbedding)?;
        self.inner.store_document_embedding(call_id, embedding).await
    }
}

/// One appended audit entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub thread_id: String,
    pub label: String,
    pub content: String,
}

/// Audit trail that keeps everything in memory for assertions.
#[derive(Default)]
pub struct RecordingAuditTrail {
    threads: RwLock<Vec<CallId>>,
    entries: RwLock<Vec<AuditEntry>>,
    memory_answer: Option<String>,
    memory_queries: RwLock<Vec<String>>,
    fail_appends: bool,
}

impl RecordingAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every memory query with this text.
    pub fn with_memory(mut self, answer: impl Into<String>) -> Self {
        self.memory_answer = Some(answer.into());
        self
    }

    /// Make every append fail.
    pub fn failing_appends(mut self) -> Self {
        self.fail_appends = true;
        self
    }

    pub fn threads(&self) -> Vec<CallId> {
        self.threads.read().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.label).collect()
    }

    pub fn memory_queries(&self) -> Vec<String> {
        self.memory_queries.read().unwrap().clone()
    }
}

#[async_trait]
impl AuditTrail for RecordingAuditTrail {
    async fn start_thread(&self, call_id: &CallId) -> Result<Option<String>> {
        self.threads.write().unwrap().push(call_id.clone());
        Ok(Some(format!("thread-{}", call_id)))
    }

    async fn append(&self, thread_id: &str, label: &str, content: &str) -> Result<()> {
        if self.fail_appends {
            return Err(GroundingError::Audit("append rejected".into()));
        }
        self.entries.write().unwrap().push(AuditEntry {
            thread_id: thread_id.to_string(),
            label: label.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn query_thread(&self, thread_id: &str, question: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap();
        let count = entries.iter().filter(|e| e.thread_id == thread_id).count();
        Ok((count > 0).then(|| format!("{} entries recorded for: {}", count, question)))
    }

    async fn query_memory(&self, question: &str) -> Result<Option<String>> {
        self.memory_queries.write().unwrap().push(question.to_string());
        Ok(self.memory_answer.clone())
    }
}

/// Realistic upstream signals with the given risk score.
pub fn signals_with_score(risk_score: u8) -> RiskSignals {
    RiskSignals {
        call_context: CallContext {
            call_language: "hinglish".into(),
            call_quality: CallQuality {
                noise_level: Level::Low,
                call_stability: Level::High,
                speech_naturalness: SpeechNaturalness::Natural,
            },
        },
        speaker_analysis: SpeakerAnalysis {
            customer_only_analysis: true,
            agent_influence_detected: false,
        },
        nlp_insights: NlpInsights {
            intent: IntentInsight {
                label: "repayment_promise".into(),
                confidence: 0.82,
                conditionality: Level::Medium,
            },
            sentiment: SentimentInsight {
                label: "stressed".into(),
                confidence: 0.74,
            },
            obligation_strength: ObligationStrength::Weak,
            entities: EntityMentions {
                payment_commitment: Some("next_week".into()),
                amount_mentioned: Some(15000.0),
            },
            contradictions_detected: true,
        },
        flags: SignalFlags {
            audio_trust_flags: vec!["low_call_stability".into()],
            behavioral_flags: vec!["conditional_commitment".into()],
        },
        risk_assessment: RiskAssessment {
            risk_score,
            fraud_likelihood: Level::Medium,
            confidence: 0.78,
        },
        summary_for_rag: "Customer promised to pay next week but contradicted earlier statements."
            .into(),
        conversation: vec![
            TranscriptTurn {
                speaker: "AGENT".into(),
                text: "When can you clear the overdue EMI?".into(),
            },
            TranscriptTurn {
                speaker: "CUSTOMER".into(),
                text: "Maybe next week, if my salary comes in.".into(),
            },
        ],
    }
}

/// Knowledge documents covering every category, for seeding test stores.
pub fn sample_knowledge() -> Vec<KnowledgeDocument> {
    let doc = |id: &str, category: KnowledgeCategory, title: &str, content: &str| KnowledgeDocument {
        doc_id: id.to_string(),
        category,
        title: title.to_string(),
        content: content.to_string(),
        metadata: Value::Null,
    };
    vec![
        doc(
            "fp_001",
            KnowledgeCategory::FraudPattern,
            "Conditional Promise with Contradiction",
            "Customer makes a payment promise conditional on an external event and contradicts earlier statements.",
        ),
        doc(
            "fp_002",
            KnowledgeCategory::FraudPattern,
            "Third-Party Deflection",
            "Customer repeatedly claims a relative or employer will pay on their behalf.",
        ),
        doc(
            "rbi_001",
            KnowledgeCategory::Compliance,
            "Fair Practices Code: Recovery Conduct",
            "Recovery agents must not use intimidation and must call only between 8am and 7pm.",
        ),
        doc(
            "rbi_002",
            KnowledgeCategory::Compliance,
            "Grievance Redressal",
            "Complaints must be acknowledged and escalated within the stated timelines.",
        ),
        doc(
            "rh_001",
            KnowledgeCategory::RiskHeuristic,
            "Low Obligation Strength",
            "Weak obligation language with vague dates correlates with broken promises.",
        ),
        doc(
            "rh_002",
            KnowledgeCategory::RiskHeuristic,
            "Stress Under Questioning",
            "Rising stress when amounts are confirmed suggests low intent to pay.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_ai_scripted_then_default() {
        let ai = MockAI::new()
            .failing(PromptKind::Reasoning, 1)
            .with_reply(PromptKind::Chat, MockReply::Malformed("plain text".into()));

        let options = CompletionOptions::new();
        assert!(ai
            .complete_json(REASONING_SYSTEM_PROMPT, "ctx", &options)
            .await
            .is_err());
        let second = ai
            .complete_json(REASONING_SYSTEM_PROMPT, "ctx", &options)
            .await
            .unwrap();
        assert_eq!(second.value["grounded_assessment"], "medium_risk");

        assert!(matches!(
            ai.complete_json(CHAT_SYSTEM_PROMPT, "q", &options).await,
            Err(GroundingError::MalformedOutput { .. })
        ));
        assert_eq!(ai.completions(PromptKind::Reasoning), 2);
    }

    #[tokio::test]
    async fn test_mock_embeddings_are_deterministic() {
        let ai = MockAI::new().failing_embeddings(1);
        assert!(ai.embed("hello").await.is_err());
        let a = ai.embed("hello").await.unwrap();
        let b = ai.embed("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(ai.embed_count(), 3);
    }

    #[tokio::test]
    async fn test_faulty_store_fails_selected_ops() {
        let store = FaultyStore::new(crate::stores::MemoryStore::new()).fail(StoreOp::CountKnowledge);
        assert!(store.count_knowledge().await.is_err());
        store.heal(StoreOp::CountKnowledge);
        assert_eq!(store.count_knowledge().await.unwrap(), 0);
    }
}
