//! Server dependencies (using traits for testability)
//!
//! This module wires the grounding pipeline to concrete storage, model, and
//! audit providers. Handlers only ever see the trait objects.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use grounding::ai::OpenAI;
use grounding::{
    AuditTrail, ChatConfig, GroundingPipeline, MemoryStore, NoopAuditTrail, PostgresStore,
    RecordStore, AI,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::kernel::BackboardClient;

/// The pipeline as the server runs it, over trait objects.
pub type AppPipeline = GroundingPipeline<dyn RecordStore, dyn AI>;

/// Server dependencies accessible to handlers
#[derive(Clone)]
pub struct ServerDeps {
    pub pipeline: Arc<AppPipeline>,
    /// Present when running against Postgres; used by the health check
    pub db_pool: Option<PgPool>,
    /// Directory holding the knowledge seed files
    pub knowledge_dir: PathBuf,
}

impl ServerDeps {
    pub fn new(pipeline: AppPipeline, db_pool: Option<PgPool>, knowledge_dir: PathBuf) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            db_pool,
            knowledge_dir,
        }
    }

    /// Connect to every configured provider.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let (store, db_pool): (Arc<dyn RecordStore>, Option<PgPool>) = match &config.database_url {
            Some(url) => {
                info!("Connecting to database...");
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("Failed to connect to database")?;
                let store = PostgresStore::from_pool(pool.clone())
                    .await
                    .context("Failed to prepare database schema")?;
                info!("Database connected");
                (Arc::new(store), Some(pool))
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory storage");
                (Arc::new(MemoryStore::new()), None)
            }
        };

        let ai: Arc<dyn AI> = Arc::new(
            OpenAI::new(config.openai_api_key.clone())
                .with_model(config.llm_model.clone())
                .with_embedding_model(config.embedding_model.clone()),
        );

        let audit: Arc<dyn AuditTrail> = match &config.backboard_api_key {
            Some(key) => {
                info!("Backboard audit trail enabled");
                Arc::new(BackboardClient::new(key.clone())?)
            }
            None => {
                info!("BACKBOARD_API_KEY not set, audit trail disabled");
                Arc::new(NoopAuditTrail)
            }
        };

        let pipeline = GroundingPipeline::new(store, ai)
            .with_audit_trail(audit)
            .with_config(config.pipeline_config())
            .with_chat_config(ChatConfig::default());

        Ok(Self::new(pipeline, db_pool, config.knowledge_dir.clone()))
    }
}
