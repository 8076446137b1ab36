//! Grounded assessment produced by the reasoning stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::call::CallId;
use super::signals::RiskAssessment;

/// Explanation used when the reasoning model is unavailable after retry.
pub const FALLBACK_EXPLANATION: &str = "Automated grounding was unavailable. This call has been \
flagged for manual review as a precaution. A human assessor should evaluate the risk signals directly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundedAssessment {
    HighRisk,
    MediumRisk,
    LowRisk,
}

impl GroundedAssessment {
    pub const ALL: [GroundedAssessment; 3] = [
        GroundedAssessment::HighRisk,
        GroundedAssessment::MediumRisk,
        GroundedAssessment::LowRisk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroundedAssessment::HighRisk => "high_risk",
            GroundedAssessment::MediumRisk => "medium_risk",
            GroundedAssessment::LowRisk => "low_risk",
        }
    }

    /// Parse a model-produced label. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == label)
    }
}

impl std::fmt::Display for GroundedAssessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    AutoClear,
    FlagForReview,
    ManualReview,
    EscalateToCompliance,
}

impl RecommendedAction {
    pub const ALL: [RecommendedAction; 4] = [
        RecommendedAction::AutoClear,
        RecommendedAction::FlagForReview,
        RecommendedAction::ManualReview,
        RecommendedAction::EscalateToCompliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::AutoClear => "auto_clear",
            RecommendedAction::FlagForReview => "flag_for_review",
            RecommendedAction::ManualReview => "manual_review",
            RecommendedAction::EscalateToCompliance => "escalate_to_compliance",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == label)
    }
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured, always fully populated result of grounded reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagOutput {
    pub grounded_assessment: GroundedAssessment,
    pub explanation: String,
    pub recommended_action: RecommendedAction,
    /// 0.0–1.0
    pub confidence: f64,
    pub regulatory_flags: Vec<String>,
    pub matched_patterns: Vec<String>,
}

impl RagOutput {
    /// Conservative assessment substituted when the model is unavailable.
    pub fn fallback() -> Self {
        Self {
            grounded_assessment: GroundedAssessment::HighRisk,
            explanation: FALLBACK_EXPLANATION.to_string(),
            recommended_action: RecommendedAction::ManualReview,
            confidence: 0.0,
            regulatory_flags: Vec::new(),
            matched_patterns: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.confidence == 0.0 && self.explanation == FALLBACK_EXPLANATION
    }
}

/// Response of the "analyze call" operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub call_id: CallId,
    pub call_timestamp: DateTime<Utc>,
    pub input_risk_assessment: RiskAssessment,
    pub rag_output: RagOutput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_conservative() {
        let fallback = RagOutput::fallback();
        assert_eq!(fallback.grounded_assessment, GroundedAssessment::HighRisk);
        assert_eq!(fallback.recommended_action, RecommendedAction::ManualReview);
        assert_eq!(fallback.confidence, 0.0);
        assert!(fallback.is_fallback());
    }

    #[test]
    fn test_labels_match_serde() {
        for action in RecommendedAction::ALL {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, action.as_str());
            assert_eq!(RecommendedAction::from_label(action.as_str()), Some(action));
        }
        for assessment in GroundedAssessment::ALL {
            let json = serde_json::to_value(assessment).unwrap();
            assert_eq!(json, assessment.as_str());
        }
        assert_eq!(RecommendedAction::from_label("delete_account"), None);
    }
}
