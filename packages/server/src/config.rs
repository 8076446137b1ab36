use anyhow::{Context, Result};
use dotenvy::dotenv;
use grounding::{PipelineConfig, RetrievalConfig};
use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. In-memory storage when unset.
    pub database_url: Option<String>,
    pub port: u16,
    pub openai_api_key: String,
    pub embedding_model: String,
    pub llm_model: String,
    /// Extraction model for calls at or above the high-risk threshold
    pub llm_model_high_risk: Option<String>,
    pub fraud_pattern_limit: usize,
    pub compliance_limit: usize,
    pub risk_heuristic_limit: usize,
    pub backboard_api_key: Option<String>,
    pub knowledge_dir: PathBuf,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            llm_model_high_risk: optional("LLM_MODEL_HIGH_RISK"),
            fraud_pattern_limit: limit("FRAUD_PATTERN_RETRIEVAL_LIMIT", 3)?,
            compliance_limit: limit("COMPLIANCE_RETRIEVAL_LIMIT", 2)?,
            risk_heuristic_limit: limit("RISK_HEURISTIC_RETRIEVAL_LIMIT", 2)?,
            backboard_api_key: optional("BACKBOARD_API_KEY"),
            knowledge_dir: env::var("KNOWLEDGE_DIR")
                .unwrap_or_else(|_| "knowledge".to_string())
                .into(),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or_default(),
        })
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig::default().with_limits(
            self.fraud_pattern_limit,
            self.compliance_limit,
            self.risk_heuristic_limit,
        )
    }

    /// Pipeline settings for the server: extraction runs in the background.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let config = PipelineConfig::default()
            .with_retrieval(self.retrieval_config())
            .with_detached_extraction(true);
        match &self.llm_model_high_risk {
            Some(model) => config.with_high_risk_model(model.clone()),
            None => config,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn limit(key: &str, default: usize) -> Result<usize> {
    match optional(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{} must be a positive number", key)),
        None => Ok(default),
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
