//! Knowledge base seeding.
//!
//! Seeding is the only writer of knowledge documents. Per-document failures are
//! collected in the report and never stop the rest of the seed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{GroundingError, Result};
use crate::traits::ai::AI;
use crate::traits::store::RecordStore;
use crate::types::{KnowledgeCategory, KnowledgeDocument};

use super::orchestrator::GroundingPipeline;
use super::stage::with_retry;

/// Seed file names and the category each holds.
pub const KNOWLEDGE_FILES: [(&str, KnowledgeCategory); 3] = [
    ("fraud_patterns.json", KnowledgeCategory::FraudPattern),
    ("compliance_rules.json", KnowledgeCategory::Compliance),
    ("risk_heuristics.json", KnowledgeCategory::RiskHeuristic),
];

/// Outcome of a seed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedReport {
    pub documents_processed: usize,
    pub by_category: BTreeMap<KnowledgeCategory, usize>,
    pub total_in_db: usize,
    pub errors: Vec<String>,
}

impl SeedReport {
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A seed file entry. `category` may be omitted when the file implies it.
#[derive(Debug, Deserialize)]
struct SeedEntry {
    doc_id: String,
    #[serde(default)]
    category: Option<KnowledgeCategory>,
    title: String,
    content: String,
    #[serde(default)]
    metadata: serde_json::Value,
}

/// Parse a seed file's JSON array, defaulting missing categories.
pub fn parse_seed_documents(
    json: &str,
    default_category: KnowledgeCategory,
) -> Result<Vec<KnowledgeDocument>> {
    let entries: Vec<SeedEntry> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .map(|entry| KnowledgeDocument {
            doc_id: entry.doc_id,
            category: entry.category.unwrap_or(default_category),
            title: entry.title,
            content: entry.content,
            metadata: entry.metadata,
        })
        .collect())
}

impl<S, A> GroundingPipeline<S, A>
where
    S: RecordStore + ?Sized + 'static,
    A: AI + ?Sized + 'static,
{
    /// Embed and upsert knowledge documents.
    ///
    /// Fails only if the final count cannot be read.
    pub async fn seed_knowledge(&self, documents: Vec<KnowledgeDocument>) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        self.seed_into(&mut report, documents).await;
        self.finish_seed(report).await
    }

    /// Seed into an existing report, so callers can merge file-level errors.
    pub async fn seed_into(&self, report: &mut SeedReport, documents: Vec<KnowledgeDocument>) {
        for doc in documents {
            info!(doc_id = %doc.doc_id, category = %doc.category, title = %doc.title, "Seeding knowledge");

            let embedding = match with_retry("embed_knowledge", || self.ai.embed(&doc.content)).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    error!(doc_id = %doc.doc_id, error = %e, "Knowledge embedding failed");
                    report.record_error(format!("Embedding failed for {}: {}", doc.doc_id, e));
                    continue;
                }
            };

            if let Err(e) = self.store.upsert_knowledge(&doc, &embedding).await {
                error!(doc_id = %doc.doc_id, error = %e, "Knowledge upsert failed");
                report.record_error(format!("Upsert failed for {}: {}", doc.doc_id, e));
                continue;
            }

            report.documents_processed += 1;
            *report.by_category.entry(doc.category).or_insert(0) += 1;
        }
    }

    /// Fill in the final document count.
    pub async fn finish_seed(&self, mut report: SeedReport) -> Result<SeedReport> {
        report.total_in_db = self
            .store
            .count_knowledge()
            .await
            .map_err(|e| GroundingError::storage(format!("counting knowledge: {}", e)))?;
        info!(
            processed = report.documents_processed,
            total = report.total_in_db,
            errors = report.errors.len(),
            "Knowledge seed complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_category() {
        let docs = parse_seed_documents(
            r#"[
                {"doc_id": "fp_001", "title": "Conditional Promise", "content": "..."},
                {"doc_id": "rh_009", "category": "risk_heuristic", "title": "Mixed", "content": "...",
                 "metadata": {"severity": "high"}}
            ]"#,
            KnowledgeCategory::FraudPattern,
        )
        .unwrap();
        assert_eq!(docs[0].category, KnowledgeCategory::FraudPattern);
        assert_eq!(docs[1].category, KnowledgeCategory::RiskHeuristic);
        assert_eq!(docs[1].metadata["severity"], "high");
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_seed_documents(r#"{"doc_id": "x"}"#, KnowledgeCategory::Compliance).is_err());
    }
}
