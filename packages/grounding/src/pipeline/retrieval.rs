//! Knowledge retrieval and merging.
//!
//! Two shapes of the same search:
//! - Grounding keeps each category's top-K separately and fails on any error.
//! - Chat pools every category, re-ranks by similarity, and skips failed categories.

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::traits::store::KnowledgeStore;
use crate::types::{KnowledgeCategory, KnowledgeMatch, RetrievalConfig};

/// Per-category knowledge for one grounding run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeChunks {
    pub fraud_patterns: Vec<KnowledgeMatch>,
    pub compliance: Vec<KnowledgeMatch>,
    pub risk_heuristics: Vec<KnowledgeMatch>,
}

impl KnowledgeChunks {
    pub fn total(&self) -> usize {
        self.fraud_patterns.len() + self.compliance.len() + self.risk_heuristics.len()
    }

    pub fn for_category(&self, category: KnowledgeCategory) -> &[KnowledgeMatch] {
        match category {
            KnowledgeCategory::FraudPattern => &self.fraud_patterns,
            KnowledgeCategory::Compliance => &self.compliance,
            KnowledgeCategory::RiskHeuristic => &self.risk_heuristics,
        }
    }
}

async fn search<S: KnowledgeStore + ?Sized>(
    store: &S,
    embedding: &[f32],
    config: &RetrievalConfig,
    category: KnowledgeCategory,
) -> Result<Vec<KnowledgeMatch>> {
    store
        .search_knowledge(embedding, category, config.limit_for(category))
        .await
}

/// Search all three categories for the grounding pipeline.
///
/// Searches run concurrently; any failure fails the whole retrieval.
pub async fn retrieve_knowledge<S: KnowledgeStore + ?Sized>(
    store: &S,
    embedding: &[f32],
    config: &RetrievalConfig,
) -> Result<KnowledgeChunks> {
    let (fraud_patterns, compliance, risk_heuristics) = futures::try_join!(
        search(store, embedding, config, KnowledgeCategory::FraudPattern),
        search(store, embedding, config, KnowledgeCategory::Compliance),
        search(store, embedding, config, KnowledgeCategory::RiskHeuristic),
    )?;

    let chunks = KnowledgeChunks {
        fraud_patterns,
        compliance,
        risk_heuristics,
    };

    for category in KnowledgeCategory::ALL {
        for doc in chunks.for_category(category) {
            debug!(
                category = %category,
                doc_id = %doc.doc_id,
                similarity = doc.similarity,
                "Retrieved knowledge"
            );
        }
    }
    info!(total = chunks.total(), "Knowledge chunks retrieved");

    Ok(chunks)
}

/// Search the requested categories for chat and pool the results.
///
/// A failed category is logged and skipped. Each category is searched with
/// `limit`, then the pool is cut back to `limit` overall.
pub async fn retrieve_knowledge_for_chat<S: KnowledgeStore + ?Sized>(
    store: &S,
    embedding: &[f32],
    categories: &[KnowledgeCategory],
    limit: usize,
) -> Vec<KnowledgeMatch> {
    let searches = categories
        .iter()
        .map(|&category| async move {
            (category, store.search_knowledge(embedding, category, limit).await)
        });

    let mut pooled = Vec::new();
    for (category, result) in join_all(searches).await {
        match result {
            Ok(matches) => pooled.extend(matches),
            Err(e) => warn!(category = %category, error = %e, "Knowledge search failed, skipping category"),
        }
    }

    let pooled = pool_knowledge(pooled, limit);
    info!(docs = pooled.len(), "Chat knowledge retrieved");
    pooled
}

/// Sort by similarity descending and keep the top `limit`.
///
/// Ties keep their incoming order, so the result does not depend on which
/// search finished first as long as inputs are collected in category order.
pub fn pool_knowledge(mut matches: Vec<KnowledgeMatch>, limit: usize) -> Vec<KnowledgeMatch> {
    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, similarity: f32) -> KnowledgeMatch {
        KnowledgeMatch {
            doc_id: id.to_string(),
            category: KnowledgeCategory::FraudPattern,
            title: id.to_string(),
            content: String::new(),
            similarity,
        }
    }

    #[test]
    fn test_pool_sorts_and_truncates() {
        let pooled = pool_knowledge(vec![doc("a", 0.4), doc("b", 0.9), doc("c", 0.6)], 2);
        let sims: Vec<f32> = pooled.iter().map(|d| d.similarity).collect();
        assert_eq!(sims, vec![0.9, 0.6]);
    }

    #[test]
    fn test_pool_limit_larger_than_input() {
        let pooled = pool_knowledge(vec![doc("a", 0.1), doc("b", 0.2)], 5);
        assert_eq!(pooled.len(), 2);
        assert_eq!(pooled[0].doc_id, "b");
    }

    #[test]
    fn test_pool_is_order_independent() {
        let forward = pool_knowledge(vec![doc("a", 0.3), doc("b", 0.8), doc("c", 0.5)], 3);
        let reversed = pool_knowledge(vec![doc("c", 0.5), doc("b", 0.8), doc("a", 0.3)], 3);
        assert_eq!(forward, reversed);
    }

    #[tokio::test]
    async fn test_grounding_retrieval_uses_per_category_limits() {
        use crate::stores::MemoryStore;
        use crate::testing::sample_knowledge;

        let store = MemoryStore::new();
        for knowledge in sample_knowledge() {
            store.upsert_knowledge(&knowledge, &[1.0, 0.0]).await.unwrap();
        }

        let config = RetrievalConfig::default().with_limits(1, 2, 0);
        let chunks = retrieve_knowledge(&store, &[1.0, 0.0], &config).await.unwrap();
        assert_eq!(chunks.fraud_patterns.len(), 1);
        assert_eq!(chunks.compliance.len(), 2);
        assert!(chunks.risk_heuristics.is_empty());
    }
}
