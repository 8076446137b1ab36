//! Configuration types for the grounding pipeline and chat.
//!
//! The core never reads the environment; the server maps env vars onto these.

use serde::{Deserialize, Serialize};

use super::knowledge::KnowledgeCategory;

/// Per-category result limits for knowledge retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default: 3.
    pub fraud_pattern_limit: usize,

    /// Default: 2.
    pub compliance_limit: usize,

    /// Default: 2.
    pub risk_heuristic_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fraud_pattern_limit: 3,
            compliance_limit: 2,
            risk_heuristic_limit: 2,
        }
    }
}

impl RetrievalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-K for a category.
    pub fn limit_for(&self, category: KnowledgeCategory) -> usize {
        match category {
            KnowledgeCategory::FraudPattern => self.fraud_pattern_limit,
            KnowledgeCategory::Compliance => self.compliance_limit,
            KnowledgeCategory::RiskHeuristic => self.risk_heuristic_limit,
        }
    }

    /// Set all three limits.
    pub fn with_limits(mut self, fraud_pattern: usize, compliance: usize, risk_heuristic: usize) -> Self {
        self.fraud_pattern_limit = fraud_pattern;
        self.compliance_limit = compliance;
        self.risk_heuristic_limit = risk_heuristic;
        self
    }
}

/// Configuration for the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub retrieval: RetrievalConfig,

    /// Sampling temperature for grounded reasoning.
    ///
    /// Default: 0.2.
    pub reasoning_temperature: f32,

    /// Sampling temperature for document extraction.
    ///
    /// Default: 0.1.
    pub extraction_temperature: f32,

    /// Model used for extraction on high-risk calls.
    ///
    /// None keeps the completion service's default model.
    pub high_risk_model: Option<String>,

    /// Risk score at or above which `high_risk_model` applies. Default: 70.
    pub high_risk_threshold: u8,

    /// Transcript turns kept in the extraction context. Default: 60.
    pub transcript_turn_limit: usize,

    /// Spawn document extraction instead of awaiting it.
    ///
    /// Requires a Tokio runtime. Default: false.
    pub detach_extraction: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            reasoning_temperature: 0.2,
            extraction_temperature: 0.1,
            high_risk_model: None,
            high_risk_threshold: 70,
            transcript_turn_limit: 60,
            detach_extraction: false,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn with_high_risk_model(mut self, model: impl Into<String>) -> Self {
        self.high_risk_model = Some(model.into());
        self
    }

    pub fn with_detached_extraction(mut self, detach: bool) -> Self {
        self.detach_extraction = detach;
        self
    }

    /// Model override for extracting a call with this risk score.
    pub fn extraction_model_for(&self, risk_score: u8) -> Option<&str> {
        if risk_score >= self.high_risk_threshold {
            self.high_risk_model.as_deref()
        } else {
            None
        }
    }
}

/// Configuration for chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// History messages kept in the chat context. Default: 10.
    pub max_history: usize,

    /// Furthest back a temporal question may reach, in days. Default: 90.
    pub lookback_ceiling_days: i64,

    /// Cap on calls returned by a temporal question. Default: 20.
    pub max_temporal_calls: usize,

    /// Default: 0.3.
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: 10,
            lookback_ceiling_days: 90,
            max_temporal_calls: 20,
            temperature: 0.3,
        }
    }
}

impl ChatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_temporal_calls(mut self, max: usize) -> Self {
        self.max_temporal_calls = max;
        self
    }
}
