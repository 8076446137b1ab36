//! Validators that turn untyped model JSON into typed records.
//!
//! They repair shape and never add content:
//! - Unknown enum labels become the safe default
//! - Confidences are clamped into 0.0–1.0
//! - List fields that are not lists become empty
//!
//! The reasoning validator rejects output missing a required key; the extraction
//! validator fills anything missing with defaults.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{GroundingError, Result};
use crate::types::document::{default_currency, NO_SUMMARY};
use crate::types::{
    AmountMention, CallDocument, CallId, CallOutcome, CallPurpose, Commitment, EmiDetails,
    FinancialData, GroundedAssessment, NamedEntities, PaymentCommitment, RagOutput,
    RecommendedAction, RiskSignals, TimelineEvent,
};

/// Keys the reasoning model must return.
pub const REQUIRED_RAG_KEYS: [&str; 6] = [
    "grounded_assessment",
    "explanation",
    "recommended_action",
    "confidence",
    "regulatory_flags",
    "matched_patterns",
];

/// Validate reasoning output into a fully populated [`RagOutput`].
///
/// Fails with `InvalidOutput` when the value is not an object, a required key
/// is missing, or `confidence` is not numeric. Validating an already valid
/// record returns it unchanged.
pub fn validate_rag_output(value: &Value) -> Result<RagOutput> {
    let obj = value.as_object().ok_or_else(|| GroundingError::InvalidOutput {
        reason: "reasoning output is not a JSON object".to_string(),
    })?;

    let missing: Vec<&str> = REQUIRED_RAG_KEYS
        .iter()
        .copied()
        .filter(|k| !obj.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(GroundingError::InvalidOutput {
            reason: format!("missing required keys: {}", missing.join(", ")),
        });
    }

    let grounded_assessment = match obj["grounded_assessment"]
        .as_str()
        .and_then(GroundedAssessment::from_label)
    {
        Some(a) => a,
        None => {
            warn!(value = %obj["grounded_assessment"], "Invalid grounded_assessment, defaulting to high_risk");
            GroundedAssessment::HighRisk
        }
    };

    let recommended_action = match obj["recommended_action"]
        .as_str()
        .and_then(RecommendedAction::from_label)
    {
        Some(a) => a,
        None => {
            warn!(value = %obj["recommended_action"], "Invalid recommended_action, defaulting to manual_review");
            RecommendedAction::ManualReview
        }
    };

    let confidence = number(&obj["confidence"])
        .map(clamp_unit)
        .ok_or_else(|| GroundingError::InvalidOutput {
            reason: format!("confidence is not numeric: {}", obj["confidence"]),
        })?;

    Ok(RagOutput {
        grounded_assessment,
        explanation: text(&obj["explanation"]),
        recommended_action,
        confidence,
        regulatory_flags: string_list(&obj["regulatory_flags"]),
        matched_patterns: string_list(&obj["matched_patterns"]),
    })
}

/// Validate extraction output into a [`CallDocument`]. Never fails.
///
/// `extraction_model` and `extraction_tokens` are left for the caller to fill.
pub fn validate_call_document(value: &Value, call_id: CallId) -> CallDocument {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let mut doc = CallDocument::empty(call_id);
    doc.financial_data = financial_data(obj.get("financial_data"));
    doc.entities = named_entities(obj.get("entities"));
    doc.commitments = items(obj.get("commitments"))
        .into_iter()
        .filter_map(|item| object_item(item, "commitment"))
        .map(commitment)
        .collect();

    doc.call_summary = obj
        .get("call_summary")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(NO_SUMMARY)
        .to_string();

    doc.call_purpose = obj
        .get("call_purpose")
        .and_then(Value::as_str)
        .and_then(CallPurpose::from_label)
        .unwrap_or_default();
    doc.call_outcome = obj
        .get("call_outcome")
        .and_then(Value::as_str)
        .and_then(CallOutcome::from_label)
        .unwrap_or_default();

    doc.key_discussion_points = field_list(obj, "key_discussion_points");
    doc.compliance_notes = field_list(obj, "compliance_notes");
    doc.risk_flags = field_list(obj, "risk_flags");
    doc.action_items = field_list(obj, "action_items");
    doc.call_timeline = items(obj.get("call_timeline"))
        .into_iter()
        .filter_map(|item| object_item(item, "timeline event"))
        .map(|event| TimelineEvent {
            timestamp_approx: str_field(event, "timestamp_approx"),
            event: str_field(event, "event"),
            speaker: str_field(event, "speaker"),
            significance: str_field(event, "significance"),
        })
        .collect();

    doc
}

/// Minimal document built from upstream NLP entities when extraction is unavailable.
pub fn fallback_extraction(call_id: CallId, signals: &RiskSignals) -> CallDocument {
    let entities = &signals.nlp_insights.entities;
    let mut doc = CallDocument::empty(call_id);

    if let Some(amount) = entities.amount_mentioned {
        doc.financial_data.amounts_mentioned.push(AmountMention {
            value: amount,
            currency: "INR".to_string(),
            context: "mentioned in call (NLP-extracted)".to_string(),
        });
    }
    if let Some(commitment) = entities.payment_commitment.as_deref().filter(|c| !c.is_empty()) {
        doc.financial_data.payment_commitments.push(PaymentCommitment {
            amount: Some(entities.amount_mentioned.unwrap_or(0.0)),
            due_date: None,
            commitment_type: commitment.to_string(),
        });
    }

    doc.call_summary = signals.summary_for_rag.clone();
    doc.action_items = vec![
        "Manual review required: automated extraction was unavailable".to_string(),
    ];
    doc
}

fn financial_data(value: Option<&Value>) -> FinancialData {
    let Some(obj) = value.and_then(Value::as_object) else {
        return FinancialData::default();
    };

    FinancialData {
        amounts_mentioned: items(obj.get("amounts_mentioned"))
            .into_iter()
            .filter_map(|item| object_item(item, "amount"))
            .map(|amount| AmountMention {
                value: num_field(amount, "value").unwrap_or(0.0),
                currency: opt_str_field(amount, "currency").unwrap_or_else(default_currency),
                context: str_field(amount, "context"),
            })
            .collect(),
        payment_commitments: items(obj.get("payment_commitments"))
            .into_iter()
            .filter_map(|item| object_item(item, "payment commitment"))
            .map(|payment| PaymentCommitment {
                amount: num_field(payment, "amount"),
                due_date: opt_str_field(payment, "due_date"),
                commitment_type: str_field(payment, "type"),
            })
            .collect(),
        account_references: field_list(obj, "account_references"),
        transaction_references: field_list(obj, "transaction_references"),
        financial_products: field_list(obj, "financial_products"),
        total_outstanding: obj.get("total_outstanding").and_then(number),
        settlement_offered: obj.get("settlement_offered").and_then(number),
        emi_details: obj
            .get("emi_details")
            .and_then(Value::as_object)
            .map(|emi| EmiDetails {
                amount: num_field(emi, "amount"),
                frequency: opt_str_field(emi, "frequency"),
                remaining: num_field(emi, "remaining").map(|n| n.round() as i64),
            }),
    }
}

fn named_entities(value: Option<&Value>) -> NamedEntities {
    let Some(obj) = value.and_then(Value::as_object) else {
        return NamedEntities::default();
    };

    NamedEntities {
        persons: field_list(obj, "persons"),
        organizations: field_list(obj, "organizations"),
        dates: field_list(obj, "dates"),
        locations: field_list(obj, "locations"),
        phone_numbers: field_list(obj, "phone_numbers"),
        reference_numbers: field_list(obj, "reference_numbers"),
    }
}

fn items(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    }
}

fn commitment(item: &Map<String, Value>) -> Commitment {
    Commitment {
        speaker: str_field(item, "speaker"),
        commitment: str_field(item, "commitment"),
        commitment_type: opt_str_field(item, "type").unwrap_or_else(|| "other".to_string()),
        confidence: num_field(item, "confidence").map(clamp_unit).unwrap_or(0.0),
        conditional: bool_field(item, "conditional"),
        condition: opt_str_field(item, "condition"),
    }
}

/// List entries must be objects; anything else carries no fields to keep.
fn object_item<'a>(item: &'a Value, what: &str) -> Option<&'a Map<String, Value>> {
    let obj = item.as_object();
    if obj.is_none() {
        warn!(item = what, value = %item, "Skipping non-object extraction item");
    }
    obj
}

/// Missing and null read as empty.
fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).map(text).unwrap_or_default()
}

fn opt_str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .filter(|v| !v.is_null())
        .map(text)
        .filter(|s| !s.is_empty())
}

fn num_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(number)
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn field_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key).map(string_list).unwrap_or_default()
}

/// Strings kept, other scalars stringified, nulls dropped, non-lists empty.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(text)
            .collect(),
        _ => Vec::new(),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// JSON numbers, or strings holding one.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::signals_with_score;
    use serde_json::json;

    fn valid_output() -> Value {
        json!({
            "grounded_assessment": "medium_risk",
            "explanation": "Conditional promise matches a known pattern.",
            "recommended_action": "flag_for_review",
            "confidence": 0.72,
            "regulatory_flags": ["RBI Fair Practices Code"],
            "matched_patterns": ["Conditional Promise"]
        })
    }

    fn call_id() -> CallId {
        CallId::parse("call_2026_02_09_a1b2c3").unwrap()
    }

    #[test]
    fn test_valid_output_passes_through() {
        let output = validate_rag_output(&valid_output()).unwrap();
        assert_eq!(output.grounded_assessment, GroundedAssessment::MediumRisk);
        assert_eq!(output.recommended_action, RecommendedAction::FlagForReview);
        assert_eq!(output.confidence, 0.72);
        assert_eq!(output.matched_patterns, vec!["Conditional Promise"]);
    }

    #[test]
    fn test_validator_is_idempotent() {
        let once = validate_rag_output(&valid_output()).unwrap();
        let twice = validate_rag_output(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_confidence_clamped() {
        let mut raw = valid_output();
        raw["confidence"] = json!(1.7);
        assert_eq!(validate_rag_output(&raw).unwrap().confidence, 1.0);

        raw["confidence"] = json!(-0.2);
        assert_eq!(validate_rag_output(&raw).unwrap().confidence, 0.0);

        raw["confidence"] = json!("0.4");
        assert_eq!(validate_rag_output(&raw).unwrap().confidence, 0.4);
    }

    #[test]
    fn test_non_numeric_confidence_rejected() {
        let mut raw = valid_output();
        raw["confidence"] = json!("very high");
        assert!(matches!(
            validate_rag_output(&raw),
            Err(GroundingError::InvalidOutput { .. })
        ));
    }

    #[test]
    fn test_unknown_enums_coerced_to_safe_defaults() {
        let mut raw = valid_output();
        raw["recommended_action"] = json!("delete_account");
        raw["grounded_assessment"] = json!("catastrophic");
        let output = validate_rag_output(&raw).unwrap();
        assert_eq!(output.recommended_action, RecommendedAction::ManualReview);
        assert_eq!(output.grounded_assessment, GroundedAssessment::HighRisk);
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let mut raw = valid_output();
        raw.as_object_mut().unwrap().remove("matched_patterns");
        let err = validate_rag_output(&raw).unwrap_err();
        assert!(err.to_string().contains("matched_patterns"));
    }

    #[test]
    fn test_non_list_fields_become_empty() {
        let mut raw = valid_output();
        raw["regulatory_flags"] = json!("RBI");
        raw["matched_patterns"] = json!(null);
        let output = validate_rag_output(&raw).unwrap();
        assert!(output.regulatory_flags.is_empty());
        assert!(output.matched_patterns.is_empty());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(validate_rag_output(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_document_defaults_for_empty_object() {
        let doc = validate_call_document(&json!({}), call_id());
        assert_eq!(doc.call_purpose, CallPurpose::Other);
        assert_eq!(doc.call_outcome, CallOutcome::Other);
        assert_eq!(doc.call_summary, NO_SUMMARY);
        assert!(doc.commitments.is_empty());
        assert!(doc.financial_data.emi_details.is_none());
    }

    #[test]
    fn test_document_repairs_shape() {
        let raw = json!({
            "financial_data": {
                "amounts_mentioned": [{"value": 15000, "context": "overdue EMI"}, {"value": "lots"}],
                "account_references": "ACC-1",
                "total_outstanding": 42000.5
            },
            "entities": {"persons": ["Ravi"], "dates": "tomorrow"},
            "commitments": [
                {"speaker": "CUSTOMER", "commitment": "Pay next week", "type": "payment_promise",
                 "confidence": 1.4, "conditional": true, "condition": "if salary arrives"},
                {"speaker": "AGENT", "commitment": "Call back Friday", "confidence": -3}
            ],
            "call_summary": "Customer discussed overdue EMI.",
            "call_purpose": "debt_collection",
            "call_outcome": "promise_of_sorts",
            "risk_flags": ["conditional_commitment", 7],
            "action_items": {"next": "verify"},
            "call_timeline": [{"timestamp_approx": "mid", "event": "Promise made"}, "noise"]
        });
        let doc = validate_call_document(&raw, call_id());

        assert_eq!(doc.financial_data.amounts_mentioned.len(), 2);
        assert_eq!(doc.financial_data.amounts_mentioned[0].currency, "INR");
        assert_eq!(doc.financial_data.amounts_mentioned[1].value, 0.0);
        assert!(doc.financial_data.account_references.is_empty());
        assert_eq!(doc.financial_data.total_outstanding, Some(42000.5));
        assert_eq!(doc.entities.persons, vec!["Ravi"]);
        assert!(doc.entities.dates.is_empty());
        assert_eq!(doc.commitments.len(), 2);
        assert_eq!(doc.commitments[0].confidence, 1.0);
        assert_eq!(doc.commitments[1].confidence, 0.0);
        assert_eq!(doc.commitments[1].commitment_type, "other");
        assert_eq!(doc.call_purpose, CallPurpose::DebtCollection);
        assert_eq!(doc.call_outcome, CallOutcome::Other);
        assert_eq!(doc.risk_flags, vec!["conditional_commitment", "7"]);
        assert!(doc.action_items.is_empty());
        assert_eq!(doc.call_timeline.len(), 1);
    }

    #[test]
    fn test_document_keeps_items_with_loose_field_types() {
        let raw = json!({
            "commitments": [
                {"speaker": null, "commitment": "Pay on Friday", "confidence": 0.8},
                {"commitment": "Send receipt", "confidence": "0.6", "conditional": "true",
                 "condition": null, "type": null}
            ],
            "financial_data": {
                "amounts_mentioned": [{"value": "5000", "currency": null, "context": "EMI"}],
                "payment_commitments": [{"amount": "2500.50", "due_date": null, "type": "partial"}],
                "emi_details": {"amount": 5000, "remaining": 3.0, "frequency": null}
            },
            "call_timeline": [{"timestamp_approx": null, "event": "Promise made", "speaker": 1}]
        });
        let doc = validate_call_document(&raw, call_id());

        assert_eq!(doc.commitments.len(), 2);
        assert_eq!(doc.commitments[0].speaker, "");
        assert_eq!(doc.commitments[0].commitment, "Pay on Friday");
        assert_eq!(doc.commitments[0].confidence, 0.8);
        assert_eq!(doc.commitments[1].confidence, 0.6);
        assert!(doc.commitments[1].conditional);
        assert_eq!(doc.commitments[1].condition, None);
        assert_eq!(doc.commitments[1].commitment_type, "other");

        let amounts = &doc.financial_data.amounts_mentioned;
        assert_eq!(amounts.len(), 1);
        assert_eq!(amounts[0].value, 5000.0);
        assert_eq!(amounts[0].currency, "INR");

        let payment = &doc.financial_data.payment_commitments[0];
        assert_eq!(payment.amount, Some(2500.5));
        assert_eq!(payment.due_date, None);

        let emi = doc.financial_data.emi_details.as_ref().unwrap();
        assert_eq!(emi.amount, Some(5000.0));
        assert_eq!(emi.remaining, Some(3));
        assert_eq!(emi.frequency, None);

        assert_eq!(doc.call_timeline.len(), 1);
        assert_eq!(doc.call_timeline[0].timestamp_approx, "");
        assert_eq!(doc.call_timeline[0].speaker, "1");
    }

    #[test]
    fn test_document_items_survive_revalidation() {
        let raw = json!({
            "commitments": [{"speaker": "customer", "commitment": "Pay next week",
                             "type": "payment", "confidence": 0.7, "conditional": true,
                             "condition": "salary credited"}],
            "financial_data": {"emi_details": {"amount": 4200.0, "frequency": "monthly", "remaining": 6}}
        });
        let once = validate_call_document(&raw, call_id());
        let twice = validate_call_document(&serde_json::to_value(&once).unwrap(), call_id());
        assert_eq!(once.commitments, twice.commitments);
        assert_eq!(once.financial_data, twice.financial_data);
    }

    #[test]
    fn test_document_from_non_object() {
        let doc = validate_call_document(&json!("garbage"), call_id());
        assert_eq!(doc.call_summary, NO_SUMMARY);
    }

    #[test]
    fn test_fallback_extraction_uses_nlp_entities() {
        let signals = signals_with_score(40);
        let doc = fallback_extraction(call_id(), &signals);
        assert_eq!(doc.financial_data.amounts_mentioned[0].value, 15000.0);
        assert_eq!(doc.financial_data.amounts_mentioned[0].currency, "INR");
        assert_eq!(
            doc.financial_data.payment_commitments[0].commitment_type,
            "next_week"
        );
        assert_eq!(doc.call_summary, signals.summary_for_rag);
        assert_eq!(doc.action_items.len(), 1);
    }
}
