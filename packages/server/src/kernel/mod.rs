//! Kernel module - server infrastructure and dependencies.

pub mod backboard_client;
pub mod deps;
pub mod knowledge;

pub use backboard_client::BackboardClient;
pub use deps::{AppPipeline, ServerDeps};
pub use knowledge::{load_knowledge_dir, seed_from_dir};
