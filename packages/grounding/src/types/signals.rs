//! Inbound risk payload produced by the upstream NLP service.
//!
//! The pipeline treats [`RiskSignals`] as read-only: it is validated once,
//! stored verbatim on the call record, and rendered into prompts.

use serde::{Deserialize, Serialize};

use crate::error::{GroundingError, Result};

/// Minimum length of `summary_for_rag`.
pub const MIN_SUMMARY_LEN: usize = 10;

/// Three-step ordinal used by several signal fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechNaturalness {
    Natural,
    Suspicious,
}

impl std::fmt::Display for SpeechNaturalness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechNaturalness::Natural => write!(f, "natural"),
            SpeechNaturalness::Suspicious => write!(f, "suspicious"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStrength {
    Strong,
    Moderate,
    Weak,
}

impl std::fmt::Display for ObligationStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObligationStrength::Strong => write!(f, "strong"),
            ObligationStrength::Moderate => write!(f, "moderate"),
            ObligationStrength::Weak => write!(f, "weak"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallQuality {
    pub noise_level: Level,
    pub call_stability: Level,
    pub speech_naturalness: SpeechNaturalness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallContext {
    pub call_language: String,
    pub call_quality: CallQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerAnalysis {
    pub customer_only_analysis: bool,
    pub agent_influence_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentInsight {
    pub label: String,
    pub confidence: f64,
    pub conditionality: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentInsight {
    pub label: String,
    pub confidence: f64,
}

/// Entities the NLP service pulled out of the call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMentions {
    #[serde(default)]
    pub payment_commitment: Option<String>,
    #[serde(default)]
    pub amount_mentioned: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NlpInsights {
    pub intent: IntentInsight,
    pub sentiment: SentimentInsight,
    pub obligation_strength: ObligationStrength,
    #[serde(default)]
    pub entities: EntityMentions,
    pub contradictions_detected: bool,
}

/// Audio and behavioral flags raised upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalFlags {
    #[serde(default)]
    pub audio_trust_flags: Vec<String>,
    #[serde(default)]
    pub behavioral_flags: Vec<String>,
}

/// Upstream risk verdict. Never overridden by this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// 0–100
    pub risk_score: u8,
    pub fraud_likelihood: Level,
    /// 0.0–1.0
    pub confidence: f64,
}

/// One transcript utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub speaker: String,
    pub text: String,
}

/// The full payload accepted by the "analyze call" operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSignals {
    pub call_context: CallContext,
    pub speaker_analysis: SpeakerAnalysis,
    pub nlp_insights: NlpInsights,
    #[serde(rename = "risk_signals", default)]
    pub flags: SignalFlags,
    pub risk_assessment: RiskAssessment,
    pub summary_for_rag: String,
    #[serde(default)]
    pub conversation: Vec<TranscriptTurn>,
}

impl RiskSignals {
    /// Check the range constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let risk = &self.risk_assessment;
        if risk.risk_score > 100 {
            return Err(invalid(format!(
                "risk_score must be within 0..=100, got {}",
                risk.risk_score
            )));
        }
        check_unit("risk_assessment.confidence", risk.confidence)?;
        check_unit("nlp_insights.intent.confidence", self.nlp_insights.intent.confidence)?;
        check_unit(
            "nlp_insights.sentiment.confidence",
            self.nlp_insights.sentiment.confidence,
        )?;

        if self.summary_for_rag.trim().chars().count() < MIN_SUMMARY_LEN {
            return Err(invalid(format!(
                "summary_for_rag must be at least {} characters",
                MIN_SUMMARY_LEN
            )));
        }

        Ok(())
    }

    pub fn risk_score(&self) -> u8 {
        self.risk_assessment.risk_score
    }
}

fn check_unit(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{} must be within 0.0..=1.0, got {}", field, value)))
    }
}

fn invalid(reason: String) -> GroundingError {
    GroundingError::InvalidInput { reason }
}
