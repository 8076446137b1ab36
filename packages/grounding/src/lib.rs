//! Risk-Signal Grounding Library
//!
//! Takes the structured risk signals an upstream analyzer produced for one
//! collections call and grounds them against a curated knowledge base of fraud
//! patterns, compliance rules, and risk heuristics. The result is a validated,
//! explainable assessment plus a recommended action, persisted alongside the call.
//!
//! # Design Philosophy
//!
//! - The model interprets signals, it never re-scores them
//! - Every model output is validated before it is trusted
//! - Failure handling is declared per stage, not scattered through the code
//! - Storage, model, and audit providers sit behind traits
//!
//! # Usage
//!
//! ```rust,ignore
//! use grounding::{GroundingPipeline, MemoryStore};
//! use grounding::testing::MockAI;
//!
//! let pipeline = GroundingPipeline::new(Arc::new(MemoryStore::new()), Arc::new(MockAI::new()));
//! pipeline.seed_knowledge(documents).await?;
//!
//! let outcome = pipeline.analyze_call(signals).await?;
//! let answer = pipeline.chat(ChatRequest::new("What happened in the last 5 calls?")).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (AI, stores, AuditTrail)
//! - [`types`] - Signals, assessments, documents, and chat types
//! - [`pipeline`] - Grounding, extraction, chat, and seeding
//! - [`stores`] - Storage implementations (MemoryStore, PostgresStore)
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{GroundingError, PipelineError, PipelineResult, Result};
pub use traits::{
    ai::{Completion, CompletionOptions, AI},
    audit::{AuditTrail, NoopAuditTrail},
    store::{CallStore, DocumentStore, KnowledgeStore, RecordStore},
};
pub use types::*;

// Re-export pipeline components
pub use pipeline::{
    build_chat_context, build_grounding_context, fallback_extraction, merge_calls,
    parse_seed_documents, validate_call_document, validate_rag_output, AnalysisOutcome,
    GroundingPipeline, KnowledgeChunks, SeedReport, Stage, StageOutcome, StageTrace,
    TemporalQuery, KNOWLEDGE_FILES,
};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

// Re-export testing utilities
pub use testing::{FaultyStore, MockAI, RecordingAuditTrail};
