//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{GroundingError, Result};
use crate::traits::store::{similarity_score, CallStore, DocumentStore, KnowledgeStore};
use crate::types::{
    CallDocument, CallFilter, CallId, CallRecord, CaseStatus, KnowledgeCategory,
    KnowledgeDocument, KnowledgeMatch, RagOutput,
};

struct StoredCall {
    record: CallRecord,
    embedding: Option<Vec<f32>>,
}

struct StoredDocument {
    document: CallDocument,
    embedding: Option<Vec<f32>>,
}

/// In-memory storage for calls, knowledge, and documents.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryStore {
    calls: RwLock<HashMap<CallId, StoredCall>>,
    knowledge: RwLock<HashMap<String, (KnowledgeDocument, Vec<f32>)>>,
    documents: RwLock<HashMap<CallId, StoredDocument>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            knowledge: RwLock::new(HashMap::new()),
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored calls.
    pub fn call_count(&self) -> usize {
        self.calls.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of stored call documents.
    pub fn document_count(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Whether a call has a stored summary embedding.
    pub fn has_call_embedding(&self, call_id: &CallId) -> bool {
        self.calls
            .read()
            .map(|c| c.get(call_id).is_some_and(|s| s.embedding.is_some()))
            .unwrap_or(false)
    }

    /// Whether a call document has a stored summary embedding.
    pub fn has_document_embedding(&self, call_id: &CallId) -> bool {
        self.documents
            .read()
            .map(|d| d.get(call_id).is_some_and(|s| s.embedding.is_some()))
            .unwrap_or(false)
    }

    fn with_call<T>(&self, call_id: &CallId, f: impl FnOnce(&mut StoredCall) -> T) -> Result<T> {
        let mut calls = write(&self.calls)?;
        let stored = calls
            .get_mut(call_id)
            .ok_or_else(|| GroundingError::CallNotFound {
                call_id: call_id.to_string(),
            })?;
        Ok(f(stored))
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| GroundingError::storage("memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| GroundingError::storage("memory store lock poisoned"))
}

fn newest_first(records: &mut [CallRecord]) {
    records.sort_by(|a, b| {
        b.call_timestamp
            .cmp(&a.call_timestamp)
            .then_with(|| a.call_id.cmp(&b.call_id))
    });
}

fn by_score_desc<T>(scored: &mut [(T, f32)], tie: impl Fn(&T, &T) -> std::cmp::Ordering) {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| tie(&a.0, &b.0))
    });
}

#[async_trait]
impl CallStore for MemoryStore {
    async fn insert_call(&self, record: &CallRecord) -> Result<()> {
        let mut calls = write(&self.calls)?;
        if calls.contains_key(&record.call_id) {
            return Err(GroundingError::storage(format!(
                "call {} already exists",
                record.call_id
            )));
        }
        calls.insert(
            record.call_id.clone(),
            StoredCall {
                record: record.clone(),
                embedding: None,
            },
        );
        Ok(())
    }

    async fn get_call(&self, call_id: &CallId) -> Result<Option<CallRecord>> {
        Ok(read(&self.calls)?.get(call_id).map(|s| s.record.clone()))
    }

    async fn store_call_embedding(&self, call_id: &CallId, embedding: &[f32]) -> Result<()> {
        self.with_call(call_id, |stored| stored.embedding = Some(embedding.to_vec()))
    }

    async fn update_rag_output(&self, call_id: &CallId, output: &RagOutput) -> Result<()> {
        self.with_call(call_id, |stored| stored.record.rag_output = Some(output.clone()))
    }

    async fn update_status(&self, call_id: &CallId, status: CaseStatus) -> Result<()> {
        self.with_call(call_id, |stored| stored.record.status = status)
    }

    async fn search_calls(&self, embedding: &[f32], limit: usize) -> Result<Vec<(CallRecord, f32)>> {
        let calls = read(&self.calls)?;
        let mut scored: Vec<(CallRecord, f32)> = calls
            .values()
            .filter_map(|s| {
                s.embedding
                    .as_ref()
                    .map(|e| (s.record.clone(), similarity_score(embedding, e)))
            })
            .collect();
        by_score_desc(&mut scored, |a, b| a.call_id.cmp(&b.call_id));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn recent_calls(&self, limit: usize, since: DateTime<Utc>) -> Result<Vec<CallRecord>> {
        let mut records: Vec<CallRecord> = read(&self.calls)?
            .values()
            .filter(|s| s.record.call_timestamp >= since)
            .map(|s| s.record.clone())
            .collect();
        newest_first(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    async fn list_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>> {
        let mut records: Vec<CallRecord> = read(&self.calls)?
            .values()
            .filter(|s| filter.status.map_or(true, |status| s.record.status == status))
            .map(|s| s.record.clone())
            .collect();
        newest_first(&mut records);
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn count_knowledge(&self) -> Result<usize> {
        Ok(read(&self.knowledge)?.len())
    }

    async fn search_knowledge(
        &self,
        embedding: &[f32],
        category: KnowledgeCategory,
        limit: usize,
    ) -> Result<Vec<KnowledgeMatch>> {
        let knowledge = read(&self.knowledge)?;
        let mut scored: Vec<(&KnowledgeDocument, f32)> = knowledge
            .values()
            .filter(|(doc, _)| doc.category == category)
            .map(|(doc, e)| (doc, similarity_score(embedding, e)))
            .collect();
        by_score_desc(&mut scored, |a, b| a.doc_id.cmp(&b.doc_id));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(doc, similarity)| KnowledgeMatch::from_document(doc, similarity))
            .collect())
    }

    async fn upsert_knowledge(&self, doc: &KnowledgeDocument, embedding: &[f32]) -> Result<()> {
        write(&self.knowledge)?.insert(doc.doc_id.clone(), (doc.clone(), embedding.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert_document(&self, doc: &CallDocument) -> Result<()> {
        let mut documents = write(&self.documents)?;
        // Replacing a document invalidates its old summary embedding
        documents.insert(
            doc.call_id.clone(),
            StoredDocument {
                document: doc.clone(),
                embedding: None,
            },
        );
        Ok(())
    }

    async fn get_document(&self, call_id: &CallId) -> Result<Option<CallDocument>> {
        Ok(read(&self.documents)?
            .get(call_id)
            .map(|s| s.document.clone()))
    }

    async fn store_document_embedding(&self, call_id: &CallId, embedding: &[f32]) -> Result<()> {
        let mut documents = write(&self.documents)?;
        let stored = documents
            .get_mut(call_id)
            .ok_or_else(|| GroundingError::CallNotFound {
                call_id: call_id.to_string(),
            })?;
        stored.embedding = Some(embedding.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::signals_with_score;
    use chrono::Duration;

    fn record(id: &str, age_days: i64) -> CallRecord {
        CallRecord::new(
            CallId::parse(id).unwrap(),
            Utc::now() - Duration::days(age_days),
            signals_with_score(40),
        )
    }

    fn knowledge(id: &str, category: KnowledgeCategory) -> KnowledgeDocument {
        KnowledgeDocument {
            doc_id: id.into(),
            category,
            title: id.into(),
            content: "content".into(),
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_call_lifecycle() {
        let store = MemoryStore::new();
        let call = record("call_2026_02_09_aaaaaa", 0);
        store.insert_call(&call).await.unwrap();
        assert!(store.insert_call(&call).await.is_err());

        store
            .update_rag_output(&call.call_id, &RagOutput::fallback())
            .await
            .unwrap();
        store
            .update_status(&call.call_id, CaseStatus::Escalated)
            .await
            .unwrap();

        let loaded = store.get_call(&call.call_id).await.unwrap().unwrap();
        assert!(loaded.is_complete());
        assert_eq!(loaded.status, CaseStatus::Escalated);
    }

    #[tokio::test]
    async fn test_update_missing_call_is_not_found() {
        let store = MemoryStore::new();
        let missing = CallId::parse("call_2026_02_09_000000").unwrap();
        let err = store
            .update_status(&missing, CaseStatus::Resolved)
            .await
            .unwrap_err();
        assert!(matches!(err, GroundingError::CallNotFound { .. }));
    }

    #[tokio::test]
    async fn test_search_calls_skips_unembedded() {
        let store = MemoryStore::new();
        let a = record("call_2026_02_09_aaaaaa", 0);
        let b = record("call_2026_02_09_bbbbbb", 0);
        store.insert_call(&a).await.unwrap();
        store.insert_call(&b).await.unwrap();
        store
            .store_call_embedding(&a.call_id, &[1.0, 0.0])
            .await
            .unwrap();

        let found = store.search_calls(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.call_id, a.call_id);
        assert!((found[0].1 - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_recent_calls_respects_window_and_limit() {
        let store = MemoryStore::new();
        store.insert_call(&record("call_2026_02_09_aaaaaa", 1)).await.unwrap();
        store.insert_call(&record("call_2026_02_09_bbbbbb", 2)).await.unwrap();
        store.insert_call(&record("call_2026_02_09_cccccc", 200)).await.unwrap();

        let since = Utc::now() - Duration::days(90);
        let recent = store.recent_calls(5, since).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["call_2026_02_09_aaaaaa", "call_2026_02_09_bbbbbb"]);

        assert_eq!(store.recent_calls(1, since).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_calls_by_status() {
        let store = MemoryStore::new();
        let a = record("call_2026_02_09_aaaaaa", 0);
        store.insert_call(&a).await.unwrap();
        store.insert_call(&record("call_2026_02_09_bbbbbb", 0)).await.unwrap();
        store.update_status(&a.call_id, CaseStatus::Resolved).await.unwrap();

        let filter = CallFilter {
            status: Some(CaseStatus::Resolved),
            limit: None,
        };
        let resolved = store.list_calls(&filter).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].call_id, a.call_id);
    }

    #[tokio::test]
    async fn test_knowledge_search_is_category_scoped() {
        let store = MemoryStore::new();
        store
            .upsert_knowledge(&knowledge("fp_001", KnowledgeCategory::FraudPattern), &[1.0, 0.0])
            .await
            .unwrap();
        store
            .upsert_knowledge(&knowledge("fp_002", KnowledgeCategory::FraudPattern), &[0.6, 0.8])
            .await
            .unwrap();
        store
            .upsert_knowledge(&knowledge("rbi_001", KnowledgeCategory::Compliance), &[1.0, 0.0])
            .await
            .unwrap();

        let found = store
            .search_knowledge(&[1.0, 0.0], KnowledgeCategory::FraudPattern, 5)
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|m| m.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["fp_001", "fp_002"]);
        assert_eq!(store.count_knowledge().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_document_upsert_replaces() {
        let store = MemoryStore::new();
        let call_id = CallId::parse("call_2026_02_09_aaaaaa").unwrap();
        let mut doc = CallDocument::empty(call_id.clone());
        store.upsert_document(&doc).await.unwrap();
        store.store_document_embedding(&call_id, &[1.0]).await.unwrap();
        assert!(store.has_document_embedding(&call_id));

        doc.call_summary = "Regenerated".into();
        store.upsert_document(&doc).await.unwrap();
        assert_eq!(store.document_count(), 1);
        assert!(!store.has_document_embedding(&call_id));
        assert_eq!(
            store.get_document(&call_id).await.unwrap().unwrap().call_summary,
            "Regenerated"
        );
    }
}
