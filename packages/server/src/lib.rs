// VoiceOps RAG Service - API Core
//
// Thin HTTP transport around the grounding pipeline: configuration, provider
// wiring, the Backboard audit client, and the axum routes.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
