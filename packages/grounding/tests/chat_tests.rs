//! Integration tests for retrieval-augmented chat.

use std::sync::Arc;

use chrono::{Duration, Utc};
use grounding::testing::{
    sample_knowledge, signals_with_score, FaultyStore, MockAI, MockReply, PromptKind,
    RecordingAuditTrail, StoreOp,
};
use grounding::{
    CallId, CallRecord, CallStore, ChatFilters, ChatMessage, ChatRequest, ChatRole, ChatConfig,
    GroundingError, GroundingPipeline, KnowledgeCategory, MatchSource, MemoryStore, SourceType,
    CHAT_FALLBACK_ANSWER,
};
use serde_json::json;

async fn seeded_pipeline(ai: MockAI) -> GroundingPipeline<MemoryStore, MockAI> {
    let pipeline = GroundingPipeline::new(Arc::new(MemoryStore::new()), Arc::new(ai));
    pipeline.seed_knowledge(sample_knowledge()).await.unwrap();
    pipeline
}

/// Insert `count` calls, one per day going back from today.
async fn insert_history(store: &MemoryStore, count: usize) -> Vec<CallId> {
    let mut ids = Vec::new();
    for i in 0..count {
        let id = CallId::parse(&format!("call_2026_02_{:02}_{:06x}", (i % 28) + 1, i)).unwrap();
        let record = CallRecord::new(
            id.clone(),
            Utc::now() - Duration::days(i as i64),
            signals_with_score(30 + i as u8),
        );
        store.insert_call(&record).await.unwrap();
        ids.push(id);
    }
    ids
}

#[tokio::test]
async fn test_short_question_rejected() {
    let pipeline = seeded_pipeline(MockAI::new()).await;
    let err = pipeline.chat(ChatRequest::new("hi")).await.unwrap_err();
    assert!(matches!(err, GroundingError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_answer_cites_knowledge_sources() {
    let ai = MockAI::new().with_reply(
        PromptKind::Chat,
        MockReply::Json(json!({
            "answer": "This matches the conditional promise pattern [fp_001].",
            "source_ids": ["fp_001"]
        })),
    );
    let pipeline = seeded_pipeline(ai).await;

    let response = pipeline
        .chat(ChatRequest::new("What does a conditional promise look like?"))
        .await
        .unwrap();

    assert!(response.answer.contains("fp_001"));
    assert_eq!(response.metadata.model, "mock-model");
    assert!(response.metadata.knowledge_docs_searched > 0);
    assert!(response.metadata.knowledge_docs_searched <= 5);

    let cited: Vec<_> = response.sources.iter().filter(|s| s.cited).collect();
    assert_eq!(cited.len(), 1);
    assert_eq!(cited[0].doc_id, "fp_001");
    assert_eq!(cited[0].source_type, SourceType::Knowledge);
}

#[tokio::test]
async fn test_exact_call_lookup_has_full_similarity() {
    let pipeline = seeded_pipeline(MockAI::new()).await;
    let ids = insert_history(pipeline.store(), 3).await;
    let named = &ids[2];

    let request = ChatRequest::new(format!("Why was {} flagged?", named));
    let context = pipeline.retrieve_chat_context(&request).await.unwrap();

    assert_eq!(context.calls.len(), 1);
    assert_eq!(context.calls[0].call_id(), named);
    assert_eq!(context.calls[0].similarity, 1.0);
    assert_eq!(context.calls[0].source, MatchSource::Exact);
}

#[tokio::test]
async fn test_unknown_call_id_is_ignored() {
    let pipeline = seeded_pipeline(MockAI::new()).await;
    let response = pipeline
        .chat(ChatRequest::new("What about call_2020_01_01_ffffff?"))
        .await
        .unwrap();
    assert_eq!(response.metadata.calls_searched, 0);
}

#[tokio::test]
async fn test_last_n_calls_is_capped_and_temporal() {
    let pipeline = seeded_pipeline(MockAI::new()).await;
    insert_history(pipeline.store(), 8).await;

    let request = ChatRequest::new("Summarize the last 5 calls");
    let context = pipeline.retrieve_chat_context(&request).await.unwrap();

    assert_eq!(context.calls.len(), 5);
    assert!(context.calls.iter().all(|c| c.source == MatchSource::Temporal));
    // Newest first
    let stamps: Vec<_> = context.calls.iter().map(|c| c.record.call_timestamp).collect();
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_temporal_request_bounded_by_max_calls() {
    let pipeline = seeded_pipeline(MockAI::new())
        .await
        .with_chat_config(ChatConfig::default().with_max_temporal_calls(4));
    insert_history(pipeline.store(), 10).await;

    let request = ChatRequest::new("Any patterns in the past 30 days?");
    let context = pipeline.retrieve_chat_context(&request).await.unwrap();
    assert_eq!(context.calls.len(), 4);
}

#[tokio::test]
async fn test_calls_deduplicated_across_sources() {
    let pipeline = seeded_pipeline(MockAI::new()).await;
    let ids = insert_history(pipeline.store(), 4).await;
    for id in &ids {
        let embedding = pipeline.ai().deterministic_embedding(id.as_str());
        pipeline.store().store_call_embedding(id, &embedding).await.unwrap();
    }

    let filters = ChatFilters {
        search_calls: true,
        ..ChatFilters::default()
    };
    let request =
        ChatRequest::new(format!("Compare {} with the last 4 calls", ids[0])).with_filters(filters);
    let context = pipeline.retrieve_chat_context(&request).await.unwrap();

    let mut seen: Vec<&str> = context.calls.iter().map(|c| c.call_id().as_str()).collect();
    let total = seen.len();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), total);
    assert_eq!(total, 4);
}

#[tokio::test]
async fn test_memory_consulted_for_temporal_questions() {
    let audit = Arc::new(RecordingAuditTrail::new().with_memory("Three calls mentioned salary delays."));
    let pipeline = seeded_pipeline(MockAI::new())
        .await
        .with_audit_trail(audit.clone());

    let context = pipeline
        .retrieve_chat_context(&ChatRequest::new("What happened over the last 7 days?"))
        .await
        .unwrap();
    assert_eq!(
        context.memory.as_deref(),
        Some("Three calls mentioned salary delays.")
    );

    let plain = pipeline
        .retrieve_chat_context(&ChatRequest::new("Define a conditional promise"))
        .await
        .unwrap();
    assert!(plain.memory.is_none());
    assert_eq!(audit.memory_queries().len(), 1);
}

#[tokio::test]
async fn test_knowledge_filters_respected() {
    let pipeline = seeded_pipeline(MockAI::new()).await;
    let filters = ChatFilters {
        categories: vec![KnowledgeCategory::Compliance],
        knowledge_limit: 1,
        ..ChatFilters::default()
    };
    let context = pipeline
        .retrieve_chat_context(&ChatRequest::new("What are the calling hour rules?").with_filters(filters))
        .await
        .unwrap();

    assert_eq!(context.knowledge.len(), 1);
    assert_eq!(context.knowledge[0].category, KnowledgeCategory::Compliance);
}

#[tokio::test]
async fn test_failed_category_is_skipped() {
    let store = FaultyStore::new(MemoryStore::new()).fail_category(KnowledgeCategory::FraudPattern);
    let pipeline = GroundingPipeline::new(Arc::new(store), Arc::new(MockAI::new()));
    pipeline.seed_knowledge(sample_knowledge()).await.unwrap();

    let context = pipeline
        .retrieve_chat_context(&ChatRequest::new("Which rules apply to recovery agents?"))
        .await
        .unwrap();
    assert!(!context.knowledge.is_empty());
    assert!(context
        .knowledge
        .iter()
        .all(|k| k.category != KnowledgeCategory::FraudPattern));
}

#[tokio::test]
async fn test_call_search_failure_is_skipped() {
    let store = FaultyStore::new(MemoryStore::new()).fail(StoreOp::SearchCalls);
    let pipeline = GroundingPipeline::new(Arc::new(store), Arc::new(MockAI::new()));
    pipeline.seed_knowledge(sample_knowledge()).await.unwrap();

    let filters = ChatFilters {
        search_calls: true,
        ..ChatFilters::default()
    };
    let response = pipeline
        .chat(ChatRequest::new("Any calls about salary delays?").with_filters(filters))
        .await
        .unwrap();
    assert_eq!(response.metadata.calls_searched, 0);
    assert!(!response.answer.is_empty());
}

#[tokio::test]
async fn test_plain_text_reply_is_used_as_answer() {
    let ai = MockAI::new().with_reply(
        PromptKind::Chat,
        MockReply::Malformed("The customer seems to be stalling.".into()),
    );
    let pipeline = seeded_pipeline(ai).await;

    let response = pipeline
        .chat(ChatRequest::new("Is this customer stalling?"))
        .await
        .unwrap();
    assert_eq!(response.answer, "The customer seems to be stalling.");
    assert!(response.sources.iter().all(|s| !s.cited));
    assert_eq!(pipeline.ai().completions(PromptKind::Chat), 1);
}

#[tokio::test]
async fn test_model_failure_returns_fallback_answer() {
    let ai = MockAI::new().failing(PromptKind::Chat, 2);
    let pipeline = seeded_pipeline(ai).await;

    let response = pipeline
        .chat(ChatRequest::new("Is this customer stalling?"))
        .await
        .unwrap();
    assert_eq!(response.answer, CHAT_FALLBACK_ANSWER);
    assert_eq!(response.metadata.model, "fallback");
    assert_eq!(response.metadata.tokens_used, 0);
}

#[tokio::test]
async fn test_question_embedding_failure_is_an_error() {
    let pipeline = seeded_pipeline(MockAI::new()).await;
    let ai = MockAI::new().failing_embeddings(2);
    let pipeline = GroundingPipeline::new(pipeline.store().clone(), Arc::new(ai));

    assert!(pipeline
        .chat(ChatRequest::new("Is this customer stalling?"))
        .await
        .is_err());
}

#[tokio::test]
async fn test_history_trimmed_to_recent_turns() {
    let pipeline = seeded_pipeline(MockAI::new()).await;
    let history: Vec<ChatMessage> = (0..14)
        .map(|i| ChatMessage {
            role: if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant },
            content: format!("turn {}", i),
        })
        .collect();

    let request = ChatRequest::new("And what about compliance?").with_history(history);
    let context = pipeline.retrieve_chat_context(&request).await.unwrap();

    assert_eq!(context.history.len(), 10);
    assert_eq!(context.history[0].content, "turn 4");
}
