//! Pipeline stages for grounding, chat, and seeding.
//!
//! Analysis flow: ingest → embed → retrieve → assemble → reason → persist → extract

pub mod chat;
pub mod context;
pub mod extraction;
pub mod orchestrator;
pub mod prompts;
pub mod retrieval;
pub mod seed;
pub mod stage;
pub mod validate;

pub use chat::{merge_calls, TemporalQuery};
pub use context::{build_chat_context, build_grounding_context};
pub use extraction::{build_extraction_context, extract_call_document};
pub use orchestrator::{AnalysisOutcome, GroundingPipeline};
pub use retrieval::{pool_knowledge, retrieve_knowledge, retrieve_knowledge_for_chat, KnowledgeChunks};
pub use seed::{parse_seed_documents, SeedReport, KNOWLEDGE_FILES};
pub use stage::{FailurePolicy, Stage, StageOutcome, StageTrace};
pub use validate::{fallback_extraction, validate_call_document, validate_rag_output};
