//! Per-call document extraction.
//!
//! Extraction is best-effort end to end: a model failure yields a fallback
//! document built from upstream entities, which is still stored.

use tracing::{info, warn};

use crate::error::Result;
use crate::traits::ai::{CompletionOptions, AI};
use crate::traits::store::DocumentStore;
use crate::types::{CallDocument, CallRecord, PipelineConfig, RagOutput, FALLBACK_MODEL};

use super::prompts::EXTRACTION_SYSTEM_PROMPT;
use super::stage::with_retry;
use super::validate::{fallback_extraction, validate_call_document};

/// Render everything known about a call for the extraction model.
pub fn build_extraction_context(
    record: &CallRecord,
    rag_output: Option<&RagOutput>,
    turn_limit: usize,
) -> String {
    let signals = &record.signals;
    let ctx = &signals.call_context;
    let nlp = &signals.nlp_insights;
    let risk = &signals.risk_assessment;

    let mut parts = vec![
        format!("=== CALL ID: {} ===\n", record.call_id),
        format!("Language: {}", ctx.call_language),
        format!(
            "Call Quality: noise={}, stability={}, naturalness={}",
            ctx.call_quality.noise_level,
            ctx.call_quality.call_stability,
            ctx.call_quality.speech_naturalness
        ),
        "\n--- NLP INSIGHTS ---".to_string(),
        format!(
            "Intent: {} (confidence={}, conditionality={})",
            nlp.intent.label, nlp.intent.confidence, nlp.intent.conditionality
        ),
        format!(
            "Sentiment: {} (confidence={})",
            nlp.sentiment.label, nlp.sentiment.confidence
        ),
        format!("Obligation Strength: {}", nlp.obligation_strength),
        format!("Contradictions Detected: {}", nlp.contradictions_detected),
    ];
    if let Some(commitment) = nlp.entities.payment_commitment.as_deref().filter(|c| !c.is_empty()) {
        parts.push(format!("Payment Commitment: {}", commitment));
    }
    if let Some(amount) = nlp.entities.amount_mentioned {
        parts.push(format!("Amount Mentioned (NLP): {}", amount));
    }

    if !signals.flags.audio_trust_flags.is_empty() {
        parts.push(format!(
            "\n--- AUDIO TRUST FLAGS ---\n{}",
            signals.flags.audio_trust_flags.join(", ")
        ));
    }
    if !signals.flags.behavioral_flags.is_empty() {
        parts.push(format!(
            "\n--- BEHAVIORAL FLAGS ---\n{}",
            signals.flags.behavioral_flags.join(", ")
        ));
    }

    parts.push("\n--- RISK ASSESSMENT ---".to_string());
    parts.push(format!("Risk Score: {}/100", risk.risk_score));
    parts.push(format!("Fraud Likelihood: {}", risk.fraud_likelihood));
    parts.push(format!("Confidence: {}", risk.confidence));

    if !signals.summary_for_rag.is_empty() {
        parts.push(format!("\n--- CALL SUMMARY ---\n{}", signals.summary_for_rag));
    }

    let conversation = &signals.conversation;
    if !conversation.is_empty() {
        let turns = if conversation.len() > turn_limit {
            parts.push(format!(
                "\n--- TRANSCRIPT (last {} of {} turns) ---",
                turn_limit,
                conversation.len()
            ));
            &conversation[conversation.len() - turn_limit..]
        } else {
            parts.push(format!(
                "\n--- FULL TRANSCRIPT ({} turns) ---",
                conversation.len()
            ));
            &conversation[..]
        };
        for turn in turns {
            parts.push(format!("[{}]: {}", turn.speaker, turn.text));
        }
    }

    if let Some(rag) = rag_output {
        parts.push("\n--- RAG GROUNDED ASSESSMENT ---".to_string());
        parts.push(format!("Assessment: {}", rag.grounded_assessment));
        parts.push(format!("Recommended Action: {}", rag.recommended_action));
        parts.push(format!("Explanation: {}", rag.explanation));
        if !rag.matched_patterns.is_empty() {
            parts.push(format!("Matched Patterns: {}", rag.matched_patterns.join(", ")));
        }
        if !rag.regulatory_flags.is_empty() {
            parts.push(format!("Regulatory Flags: {}", rag.regulatory_flags.join(", ")));
        }
    }

    parts.join("\n")
}

/// Extract a document for a call with model retry and fallback. Never fails.
pub async fn extract_call_document<A: AI + ?Sized>(
    ai: &A,
    record: &CallRecord,
    rag_output: Option<&RagOutput>,
    config: &PipelineConfig,
) -> CallDocument {
    let context = build_extraction_context(record, rag_output, config.transcript_turn_limit);

    let mut options = CompletionOptions::new().with_temperature(config.extraction_temperature);
    if let Some(model) = config.extraction_model_for(record.risk_score()) {
        options = options.with_model(model);
    }

    info!(
        call_id = %record.call_id,
        model = ?options.model,
        context_chars = context.len(),
        "Extracting call document"
    );

    let completion = with_retry("extraction", || {
        ai.complete_json(EXTRACTION_SYSTEM_PROMPT, &context, &options)
    })
    .await;

    match completion {
        Ok(completion) => {
            let mut doc = validate_call_document(&completion.value, record.call_id.clone());
            doc.extraction_model = completion.model;
            doc.extraction_tokens = completion.tokens_used;
            info!(
                call_id = %record.call_id,
                amounts = doc.financial_data.amounts_mentioned.len(),
                commitments = doc.commitments.len(),
                persons = doc.entities.persons.len(),
                timeline_events = doc.call_timeline.len(),
                "Document extracted"
            );
            doc
        }
        Err(e) => {
            warn!(call_id = %record.call_id, error = %e, "Extraction unavailable, using fallback document");
            let mut doc = fallback_extraction(record.call_id.clone(), &record.signals);
            doc.extraction_model = FALLBACK_MODEL.to_string();
            doc
        }
    }
}

/// Extract, store, and index the document for a call.
///
/// Only the upsert can fail; the summary embedding is best-effort.
pub async fn extract_and_store<S, A>(
    store: &S,
    ai: &A,
    record: &CallRecord,
    rag_output: Option<&RagOutput>,
    config: &PipelineConfig,
) -> Result<CallDocument>
where
    S: DocumentStore + ?Sized,
    A: AI + ?Sized,
{
    let doc = extract_call_document(ai, record, rag_output, config).await;
    store.upsert_document(&doc).await?;

    match ai.embed(&doc.call_summary).await {
        Ok(embedding) => {
            if let Err(e) = store.store_document_embedding(&doc.call_id, &embedding).await {
                warn!(call_id = %doc.call_id, error = %e, "Failed to store document embedding");
            }
        }
        Err(e) => warn!(call_id = %doc.call_id, error = %e, "Failed to embed document summary"),
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::signals_with_score;
    use crate::types::{CallId, TranscriptTurn};
    use chrono::Utc;

    fn record_with_turns(turns: usize) -> CallRecord {
        let mut signals = signals_with_score(75);
        signals.conversation = (0..turns)
            .map(|i| TranscriptTurn {
                speaker: if i % 2 == 0 { "AGENT" } else { "CUSTOMER" }.into(),
                text: format!("turn {}", i),
            })
            .collect();
        CallRecord::new(
            CallId::parse("call_2026_02_09_a1b2c3").unwrap(),
            Utc::now(),
            signals,
        )
    }

    #[test]
    fn test_long_transcript_keeps_last_turns() {
        let context = build_extraction_context(&record_with_turns(65), None, 60);
        assert!(context.contains("--- TRANSCRIPT (last 60 of 65 turns) ---"));
        assert!(!context.contains("turn 4\n"));
        assert!(context.contains("[CUSTOMER]: turn 5"));
        assert!(context.contains("[AGENT]: turn 64"));
    }

    #[test]
    fn test_short_transcript_is_complete() {
        let context = build_extraction_context(&record_with_turns(3), None, 60);
        assert!(context.contains("--- FULL TRANSCRIPT (3 turns) ---"));
        assert!(context.contains("[AGENT]: turn 0"));
    }

    #[test]
    fn test_context_includes_rag_output() {
        let rag = RagOutput::fallback();
        let context = build_extraction_context(&record_with_turns(0), Some(&rag), 60);
        assert!(context.starts_with("=== CALL ID: call_2026_02_09_a1b2c3 ==="));
        assert!(context.contains("Recommended Action: manual_review"));
        assert!(context.contains("Risk Score: 75/100"));
        assert!(!context.contains("TRANSCRIPT"));
    }
}
