//! Prompt context assembly.
//!
//! Rendering is pure and deterministic. Every grounding section is always
//! present; an empty category prints an explicit "no matches" line.

use std::fmt::Write as _;

use crate::types::{CallMatch, ChatContext, KnowledgeMatch, MatchSource, RiskSignals};

use super::retrieval::KnowledgeChunks;

const SECTION_SEPARATOR: &str = "\n\n";

/// Render call signals and retrieved knowledge for the reasoning model.
pub fn build_grounding_context(signals: &RiskSignals, knowledge: &KnowledgeChunks) -> String {
    let sections = [
        render_call_signals(signals),
        render_knowledge_section(
            "MATCHED FRAUD PATTERNS",
            &knowledge.fraud_patterns,
            "No matching fraud patterns found.",
        ),
        render_knowledge_section(
            "COMPLIANCE GUIDANCE",
            &knowledge.compliance,
            "No matching compliance guidance found.",
        ),
        render_knowledge_section(
            "RISK HEURISTICS",
            &knowledge.risk_heuristics,
            "No matching risk heuristics found.",
        ),
    ];
    sections.join(SECTION_SEPARATOR)
}

fn render_call_signals(signals: &RiskSignals) -> String {
    let ctx = &signals.call_context;
    let speakers = &signals.speaker_analysis;
    let nlp = &signals.nlp_insights;
    let risk = &signals.risk_assessment;

    let lines = [
        "=== CALL SIGNALS ===".to_string(),
        format!("Summary: {}", signals.summary_for_rag),
        format!("Call Language: {}", ctx.call_language),
        format!(
            "Call Quality: noise={}, stability={}, speech={}",
            ctx.call_quality.noise_level,
            ctx.call_quality.call_stability,
            ctx.call_quality.speech_naturalness
        ),
        format!(
            "Speaker Analysis: customer_only={}, agent_influence={}",
            speakers.customer_only_analysis, speakers.agent_influence_detected
        ),
        format!(
            "Intent: {} (confidence: {:.2}, conditionality: {})",
            nlp.intent.label, nlp.intent.confidence, nlp.intent.conditionality
        ),
        format!(
            "Sentiment: {} (confidence: {:.2})",
            nlp.sentiment.label, nlp.sentiment.confidence
        ),
        format!("Obligation Strength: {}", nlp.obligation_strength),
        format!(
            "Entities: payment_commitment={}, amount_mentioned={}",
            nlp.entities.payment_commitment.as_deref().unwrap_or("none"),
            nlp.entities
                .amount_mentioned
                .map(|a| a.to_string())
                .unwrap_or_else(|| "none".to_string())
        ),
        format!(
            "Contradictions Detected: {}",
            if nlp.contradictions_detected { "YES" } else { "NO" }
        ),
        format!("Audio Flags: {}", join_or_none(&signals.flags.audio_trust_flags)),
        format!(
            "Behavioral Flags: {}",
            join_or_none(&signals.flags.behavioral_flags)
        ),
        format!(
            "Risk Score: {} | Fraud Likelihood: {} | Confidence: {:.2}",
            risk.risk_score, risk.fraud_likelihood, risk.confidence
        ),
    ];
    lines.join("\n")
}

fn render_knowledge_section(heading: &str, docs: &[KnowledgeMatch], empty_line: &str) -> String {
    if docs.is_empty() {
        return format!("=== {} ===\n{}", heading, empty_line);
    }

    let mut lines = vec![format!("=== {} ===", heading)];
    for (i, doc) in docs.iter().enumerate() {
        lines.push(format!("[{}] ({:.2}) {}", i + 1, doc.similarity, doc.title));
        lines.push(format!("    {}", doc.content));
        lines.push(String::new());
    }
    lines.join("\n")
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Render merged chat retrieval, memory, history, and the question.
///
/// Empty sections are omitted; the question section is always last.
pub fn build_chat_context(context: &ChatContext) -> String {
    let mut sections = Vec::new();

    if !context.knowledge.is_empty() {
        let mut lines = vec!["=== RETRIEVED KNOWLEDGE ===".to_string()];
        for (i, doc) in context.knowledge.iter().enumerate() {
            lines.push(format!(
                "[{}] ({}, sim={:.2}) [{}] {}",
                i + 1,
                doc.category,
                doc.similarity,
                doc.doc_id,
                doc.title
            ));
            lines.push(format!("    {}", doc.content));
            lines.push(String::new());
        }
        sections.push(lines.join("\n"));
    }

    if !context.calls.is_empty() {
        let mut lines = vec!["=== MATCHED CALL ANALYSES ===".to_string()];
        for (i, call) in context.calls.iter().enumerate() {
            render_call_match(&mut lines, i + 1, call);
        }
        sections.push(lines.join("\n"));
    }

    if let Some(memory) = context.memory.as_deref().filter(|m| !m.trim().is_empty()) {
        sections.push(format!("=== CROSS-CALL MEMORY ===\n{}", memory.trim()));
    }

    if !context.history.is_empty() {
        let mut block = String::from("=== CONVERSATION HISTORY ===\n");
        for msg in &context.history {
            let _ = writeln!(block, "{}: {}", msg.role.label(), msg.content);
        }
        sections.push(block);
    }

    sections.push(format!("=== CURRENT QUESTION ===\n{}", context.question));

    sections.join(SECTION_SEPARATOR)
}

fn render_call_match(lines: &mut Vec<String>, index: usize, call: &CallMatch) {
    let record = &call.record;
    let assessment = record
        .rag_output
        .as_ref()
        .map(|r| r.grounded_assessment.as_str())
        .unwrap_or("pending");
    let tag = match call.source {
        MatchSource::Exact => " [DIRECT LOOKUP]",
        MatchSource::Temporal => " [RECENT]",
        MatchSource::Vector => "",
    };

    lines.push(format!(
        "[{}] {} | risk={} | fraud={} | assessment={} | sim={:.2}{}",
        index,
        record.call_id,
        record.risk_score(),
        record.signals.risk_assessment.fraud_likelihood,
        assessment,
        call.similarity,
        tag
    ));
    lines.push(format!("    Summary: {}", record.summary()));

    if call.is_direct() {
        if let Some(rag) = &record.rag_output {
            lines.push(format!("    Explanation: {}", rag.explanation));
            lines.push(format!("    Action: {}", rag.recommended_action));
            lines.push(format!("    Confidence: {}", rag.confidence));
            if !rag.matched_patterns.is_empty() {
                lines.push(format!(
                    "    Matched Patterns: {}",
                    rag.matched_patterns.join(", ")
                ));
            }
            if !rag.regulatory_flags.is_empty() {
                lines.push(format!(
                    "    Regulatory Flags: {}",
                    rag.regulatory_flags.join(", ")
                ));
            }
        }
        let nlp = &record.signals.nlp_insights;
        lines.push(format!(
            "    Intent: {} (confidence={})",
            nlp.intent.label, nlp.intent.confidence
        ));
        lines.push(format!("    Sentiment: {}", nlp.sentiment.label));
    }

    lines.push(String::new());
}
