//! Storage traits for calls, knowledge, and call documents.
//!
//! The storage layer is split into focused traits:
//! - `CallStore`: Call records, their embeddings, and status
//! - `KnowledgeStore`: Curated reference documents
//! - `DocumentStore`: Per-call extracted documents
//! - `RecordStore`: Composite trait combining all three
//!
//! Vector similarity is the store's responsibility. Scores are in 0.0–1.0,
//! higher is closer, and results come back sorted highest first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{
    CallDocument, CallFilter, CallId, CallRecord, CaseStatus, KnowledgeCategory,
    KnowledgeDocument, KnowledgeMatch, RagOutput,
};

/// Store for call records.
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Insert a freshly ingested call.
    async fn insert_call(&self, record: &CallRecord) -> Result<()>;

    /// Get a call by ID.
    async fn get_call(&self, call_id: &CallId) -> Result<Option<CallRecord>>;

    /// Attach the summary embedding used for call similarity search.
    async fn store_call_embedding(&self, call_id: &CallId, embedding: &[f32]) -> Result<()>;

    /// Write the grounded assessment.
    async fn update_rag_output(&self, call_id: &CallId, output: &RagOutput) -> Result<()>;

    /// Set the case status.
    ///
    /// Returns `CallNotFound` if the call does not exist.
    async fn update_status(&self, call_id: &CallId, status: CaseStatus) -> Result<()>;

    /// Search calls by summary embedding.
    ///
    /// Calls without a stored embedding are never returned.
    async fn search_calls(&self, embedding: &[f32], limit: usize) -> Result<Vec<(CallRecord, f32)>>;

    /// The most recent `limit` calls received at or after `since`, newest first.
    async fn recent_calls(&self, limit: usize, since: DateTime<Utc>) -> Result<Vec<CallRecord>>;

    /// All calls received at or after `since`, newest first, at most `limit`.
    async fn calls_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<CallRecord>> {
        self.recent_calls(limit, since).await
    }

    /// List calls for simple reads, newest first.
    async fn list_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>>;
}

/// Store for knowledge documents.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Number of documents in the knowledge base.
    async fn count_knowledge(&self) -> Result<usize>;

    /// Search one category by embedding, highest similarity first.
    async fn search_knowledge(
        &self,
        embedding: &[f32],
        category: KnowledgeCategory,
        limit: usize,
    ) -> Result<Vec<KnowledgeMatch>>;

    /// Insert or replace a document by `doc_id`.
    async fn upsert_knowledge(&self, doc: &KnowledgeDocument, embedding: &[f32]) -> Result<()>;
}

/// Store for per-call documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the document for its call.
    async fn upsert_document(&self, doc: &CallDocument) -> Result<()>;

    /// Get the document for a call.
    async fn get_document(&self, call_id: &CallId) -> Result<Option<CallDocument>>;

    /// Attach the document summary embedding.
    async fn store_document_embedding(&self, call_id: &CallId, embedding: &[f32]) -> Result<()>;
}

/// Composite storage trait combining all stores.
///
/// This is the main trait used by the pipeline.
pub trait RecordStore: CallStore + KnowledgeStore + DocumentStore {}

// Blanket implementation: anything implementing all three traits is a RecordStore
impl<T: CallStore + KnowledgeStore + DocumentStore + ?Sized> RecordStore for T {}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Similarity score in 0.0–1.0 (cosine, floored at zero).
pub fn similarity_score(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity(a, b).clamp(0.0, 1.0)
}
