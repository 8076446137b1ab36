//! Per-call extracted document.
//!
//! Every field tolerates absence on the wire. The extraction validator is
//! responsible for enum coercion and clamping; these types only describe shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::call::CallId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountMention {
    pub value: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub context: String,
}

pub(crate) fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCommitment {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(rename = "type", default)]
    pub commitment_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmiDetails {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub remaining: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialData {
    pub amounts_mentioned: Vec<AmountMention>,
    pub payment_commitments: Vec<PaymentCommitment>,
    pub account_references: Vec<String>,
    pub transaction_references: Vec<String>,
    pub financial_products: Vec<String>,
    pub total_outstanding: Option<f64>,
    pub settlement_offered: Option<f64>,
    pub emi_details: Option<EmiDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedEntities {
    pub persons: Vec<String>,
    pub organizations: Vec<String>,
    pub dates: Vec<String>,
    pub locations: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub reference_numbers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    #[serde(default)]
    pub speaker: String,
    pub commitment: String,
    #[serde(rename = "type", default = "default_commitment_type")]
    pub commitment_type: String,
    /// 0.0–1.0
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub conditional: bool,
    #[serde(default)]
    pub condition: Option<String>,
}

fn default_commitment_type() -> String {
    "other".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// "early", "mid" or "late"
    #[serde(default)]
    pub timestamp_approx: String,
    pub event: String,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub significance: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPurpose {
    DebtCollection,
    AccountInquiry,
    Complaint,
    FraudReport,
    GeneralInquiry,
    SettlementNegotiation,
    PaymentArrangement,
    #[default]
    Other,
}

impl CallPurpose {
    pub const ALL: [CallPurpose; 8] = [
        CallPurpose::DebtCollection,
        CallPurpose::AccountInquiry,
        CallPurpose::Complaint,
        CallPurpose::FraudReport,
        CallPurpose::GeneralInquiry,
        CallPurpose::SettlementNegotiation,
        CallPurpose::PaymentArrangement,
        CallPurpose::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallPurpose::DebtCollection => "debt_collection",
            CallPurpose::AccountInquiry => "account_inquiry",
            CallPurpose::Complaint => "complaint",
            CallPurpose::FraudReport => "fraud_report",
            CallPurpose::GeneralInquiry => "general_inquiry",
            CallPurpose::SettlementNegotiation => "settlement_negotiation",
            CallPurpose::PaymentArrangement => "payment_arrangement",
            CallPurpose::Other => "other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    PaymentCommitted,
    Escalated,
    Unresolved,
    Resolved,
    CallbackScheduled,
    InfoProvided,
    ComplaintRegistered,
    #[default]
    Other,
}

impl CallOutcome {
    pub const ALL: [CallOutcome; 8] = [
        CallOutcome::PaymentCommitted,
        CallOutcome::Escalated,
        CallOutcome::Unresolved,
        CallOutcome::Resolved,
        CallOutcome::CallbackScheduled,
        CallOutcome::InfoProvided,
        CallOutcome::ComplaintRegistered,
        CallOutcome::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::PaymentCommitted => "payment_committed",
            CallOutcome::Escalated => "escalated",
            CallOutcome::Unresolved => "unresolved",
            CallOutcome::Resolved => "resolved",
            CallOutcome::CallbackScheduled => "callback_scheduled",
            CallOutcome::InfoProvided => "info_provided",
            CallOutcome::ComplaintRegistered => "complaint_registered",
            CallOutcome::Other => "other",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == label)
    }
}

/// Summary used when the model gives none.
pub const NO_SUMMARY: &str = "No summary available.";

/// Structured extraction for one call. Upserted; one per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDocument {
    pub call_id: CallId,
    pub financial_data: FinancialData,
    pub entities: NamedEntities,
    pub commitments: Vec<Commitment>,
    pub call_summary: String,
    pub call_purpose: CallPurpose,
    pub call_outcome: CallOutcome,
    pub key_discussion_points: Vec<String>,
    pub compliance_notes: Vec<String>,
    pub risk_flags: Vec<String>,
    pub action_items: Vec<String>,
    pub call_timeline: Vec<TimelineEvent>,
    pub extraction_model: String,
    pub extraction_tokens: u32,
    pub generated_at: DateTime<Utc>,
}

impl CallDocument {
    /// An empty document carrying only identity and defaults.
    pub fn empty(call_id: CallId) -> Self {
        Self {
            call_id,
            financial_data: FinancialData::default(),
            entities: NamedEntities::default(),
            commitments: Vec::new(),
            call_summary: NO_SUMMARY.to_string(),
            call_purpose: CallPurpose::Other,
            call_outcome: CallOutcome::Other,
            key_discussion_points: Vec::new(),
            compliance_notes: Vec::new(),
            risk_flags: Vec::new(),
            action_items: Vec::new(),
            call_timeline: Vec::new(),
            extraction_model: String::new(),
            extraction_tokens: 0,
            generated_at: Utc::now(),
        }
    }
}
