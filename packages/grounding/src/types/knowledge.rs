//! Knowledge base documents.

use serde::{Deserialize, Serialize};

/// Knowledge base category. Every document belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeCategory {
    FraudPattern,
    Compliance,
    RiskHeuristic,
}

impl KnowledgeCategory {
    /// Fixed order used by the grounding context.
    pub const ALL: [KnowledgeCategory; 3] = [
        KnowledgeCategory::FraudPattern,
        KnowledgeCategory::Compliance,
        KnowledgeCategory::RiskHeuristic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeCategory::FraudPattern => "fraud_pattern",
            KnowledgeCategory::Compliance => "compliance",
            KnowledgeCategory::RiskHeuristic => "risk_heuristic",
        }
    }
}

impl std::fmt::Display for KnowledgeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KnowledgeCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fraud_pattern" => Ok(KnowledgeCategory::FraudPattern),
            "compliance" => Ok(KnowledgeCategory::Compliance),
            "risk_heuristic" => Ok(KnowledgeCategory::RiskHeuristic),
            other => Err(format!("Invalid knowledge category: {}", other)),
        }
    }
}

/// A curated reference document. Written only by seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Stable identifier (`fp_001`, `rbi_003`, ...)
    pub doc_id: String,
    pub category: KnowledgeCategory,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A knowledge document returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMatch {
    pub doc_id: String,
    pub category: KnowledgeCategory,
    pub title: String,
    pub content: String,
    /// 0.0–1.0, higher is closer
    pub similarity: f32,
}

impl KnowledgeMatch {
    pub fn from_document(doc: &KnowledgeDocument, similarity: f32) -> Self {
        Self {
            doc_id: doc.doc_id.clone(),
            category: doc.category,
            title: doc.title.clone(),
            content: doc.content.clone(),
            similarity,
        }
    }
}
