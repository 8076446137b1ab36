//! Core types for the grounding pipeline.

pub mod assessment;
pub mod call;
pub mod chat;
pub mod config;
pub mod document;
pub mod knowledge;
pub mod signals;

pub use assessment::{
    AnalysisResponse, GroundedAssessment, RagOutput, RecommendedAction, FALLBACK_EXPLANATION,
};
pub use call::{CallFilter, CallId, CallMatch, CallRecord, CaseStatus, MatchSource};
pub use chat::{
    ChatContext, ChatFilters, ChatMessage, ChatMetadata, ChatRequest, ChatResponse, ChatRole,
    ChatSource, SourceType, CHAT_FALLBACK_ANSWER, FALLBACK_MODEL,
};
pub use config::{ChatConfig, PipelineConfig, RetrievalConfig};
pub use document::{
    AmountMention, CallDocument, CallOutcome, CallPurpose, Commitment, EmiDetails, FinancialData,
    NamedEntities, PaymentCommitment, TimelineEvent,
};
pub use knowledge::{KnowledgeCategory, KnowledgeDocument, KnowledgeMatch};
pub use signals::{
    CallContext, CallQuality, EntityMentions, IntentInsight, Level, NlpInsights,
    ObligationStrength, RiskAssessment, RiskSignals, SentimentInsight, SignalFlags,
    SpeakerAnalysis, SpeechNaturalness, TranscriptTurn,
};
