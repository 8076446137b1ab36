//! Call records, identifiers, and case status.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::assessment::RagOutput;
use super::signals::RiskSignals;

lazy_static! {
    // call_YYYY_MM_DD_ followed by six lowercase hex characters
    static ref CALL_ID_TOKEN: Regex =
        Regex::new(r"\bcall_\d{4}_\d{2}_\d{2}_[0-9a-f]{6}\b").unwrap();
    static ref CALL_ID_EXACT: Regex =
        Regex::new(r"^call_\d{4}_\d{2}_\d{2}_[0-9a-f]{6}$").unwrap();
}

/// Date-coded, unique-suffixed call identifier (`call_2026_02_09_a1b2c3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Generate an ID for a call received now.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate an ID for a call received at `timestamp`.
    pub fn generate_at(timestamp: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "call_{}_{}",
            timestamp.format("%Y_%m_%d"),
            &suffix[..6]
        ))
    }

    /// Parse a string that must be exactly one call ID.
    pub fn parse(value: &str) -> Option<Self> {
        CALL_ID_EXACT
            .is_match(value)
            .then(|| Self(value.to_string()))
    }

    /// Find every call-ID token in free text, in order of appearance, without duplicates.
    pub fn find_all(text: &str) -> Vec<Self> {
        let mut found: Vec<Self> = Vec::new();
        for m in CALL_ID_TOKEN.find_iter(text) {
            let id = Self(m.as_str().to_string());
            if !found.contains(&id) {
                found.push(id);
            }
        }
        found
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CallId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Case workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    InReview,
    Escalated,
    Resolved,
}

impl CaseStatus {
    /// Initial status derived from the upstream risk score.
    ///
    /// `< 30` resolved, `30..=50` in review, `> 50` escalated.
    pub fn from_risk_score(score: u8) -> Self {
        match score {
            0..=29 => CaseStatus::Resolved,
            30..=50 => CaseStatus::InReview,
            _ => CaseStatus::Escalated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::InReview => "in_review",
            CaseStatus::Escalated => "escalated",
            CaseStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(CaseStatus::Open),
            "in_review" => Ok(CaseStatus::InReview),
            "escalated" => Ok(CaseStatus::Escalated),
            "resolved" => Ok(CaseStatus::Resolved),
            other => Err(format!("Invalid case status: {}", other)),
        }
    }
}

/// A persisted call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: CallId,
    pub call_timestamp: DateTime<Utc>,
    pub signals: RiskSignals,
    pub status: CaseStatus,
    /// Unset until the persist stage completes.
    pub rag_output: Option<RagOutput>,
}

impl CallRecord {
    /// A freshly ingested call: status open, no assessment yet.
    pub fn new(call_id: CallId, call_timestamp: DateTime<Utc>, signals: RiskSignals) -> Self {
        Self {
            call_id,
            call_timestamp,
            signals,
            status: CaseStatus::Open,
            rag_output: None,
        }
    }

    pub fn summary(&self) -> &str {
        &self.signals.summary_for_rag
    }

    pub fn risk_score(&self) -> u8 {
        self.signals.risk_assessment.risk_score
    }

    /// True once the persist stage has written an assessment.
    pub fn is_complete(&self) -> bool {
        self.rag_output.is_some()
    }
}

/// How a call entered the chat context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Vector similarity over past call summaries
    Vector,
    /// Call ID named in the question
    Exact,
    /// "last N calls/days" window
    Temporal,
}

/// A call retrieved for chat, with its similarity to the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMatch {
    pub record: CallRecord,
    pub similarity: f32,
    pub source: MatchSource,
}

impl CallMatch {
    pub fn vector(record: CallRecord, similarity: f32) -> Self {
        Self {
            record,
            similarity,
            source: MatchSource::Vector,
        }
    }

    /// Exact ID lookup: similarity pinned to 1.0.
    pub fn exact(record: CallRecord) -> Self {
        Self {
            record,
            similarity: 1.0,
            source: MatchSource::Exact,
        }
    }

    /// Temporal window fetch: similarity pinned to 1.0.
    pub fn temporal(record: CallRecord) -> Self {
        Self {
            record,
            similarity: 1.0,
            source: MatchSource::Temporal,
        }
    }

    /// Direct matches carry richer detail into the chat context.
    pub fn is_direct(&self) -> bool {
        self.source != MatchSource::Vector
    }

    pub fn call_id(&self) -> &CallId {
        &self.record.call_id
    }
}

/// Filter for simple call listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallFilter {
    #[serde(default)]
    pub status: Option<CaseStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_boundaries() {
        assert_eq!(CaseStatus::from_risk_score(0), CaseStatus::Resolved);
        assert_eq!(CaseStatus::from_risk_score(29), CaseStatus::Resolved);
        assert_eq!(CaseStatus::from_risk_score(30), CaseStatus::InReview);
        assert_eq!(CaseStatus::from_risk_score(50), CaseStatus::InReview);
        assert_eq!(CaseStatus::from_risk_score(51), CaseStatus::Escalated);
        assert_eq!(CaseStatus::from_risk_score(100), CaseStatus::Escalated);
    }

    #[test]
    fn test_status_total_over_score_range() {
        for score in 0..=100u8 {
            let status = CaseStatus::from_risk_score(score);
            let expected = if score < 30 {
                CaseStatus::Resolved
            } else if score <= 50 {
                CaseStatus::InReview
            } else {
                CaseStatus::Escalated
            };
            assert_eq!(status, expected, "score {}", score);
        }
    }

    #[test]
    fn test_generated_id_matches_pattern() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 9, 12, 0, 0).unwrap();
        let id = CallId::generate_at(ts);
        assert!(id.as_str().starts_with("call_2026_02_09_"));
        assert_eq!(CallId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(CallId::parse("call_2026_02_09_a1b2c3").is_some());
        assert!(CallId::parse("call_2026_02_09_A1B2C3").is_none());
        assert!(CallId::parse("call_2026_02_09_a1b2c").is_none());
        assert!(CallId::parse("call_26_02_09_a1b2c3").is_none());
        assert!(CallId::parse(" call_2026_02_09_a1b2c3").is_none());
    }

    #[test]
    fn test_find_all_in_text() {
        let found = CallId::find_all(
            "Compare call_2026_02_09_a1b2c3 with call_2026_02_10_ffffff and call_2026_02_09_a1b2c3.",
        );
        let ids: Vec<&str> = found.iter().map(|c| c.as_str()).collect();
        assert_eq!(ids, vec!["call_2026_02_09_a1b2c3", "call_2026_02_10_ffffff"]);
    }

    #[test]
    fn test_find_all_ignores_embedded_tokens() {
        assert!(CallId::find_all("xcall_2026_02_09_a1b2c3").is_empty());
        assert!(CallId::find_all("call_2026_02_09_a1b2c3d").is_empty());
    }

    #[test]
    fn test_status_round_trip_str() {
        for status in [
            CaseStatus::Open,
            CaseStatus::InReview,
            CaseStatus::Escalated,
            CaseStatus::Resolved,
        ] {
            assert_eq!(status.as_str().parse::<CaseStatus>(), Ok(status));
        }
        assert!("closed".parse::<CaseStatus>().is_err());
    }
}
