// Main entry point for the grounding API server

use anyhow::{Context, Result};
use grounding::KnowledgeStore;
use server_core::kernel::ServerDeps;
use server_core::{server::build_app, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,grounding=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting risk-signal grounding API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let deps = ServerDeps::from_config(&config).await?;

    match deps.pipeline.store().count_knowledge().await {
        Ok(0) => tracing::warn!(
            "Knowledge base is empty. Seed it via POST /api/v1/knowledge/seed or the seed_knowledge binary"
        ),
        Ok(count) => tracing::info!(count, "Knowledge base ready"),
        Err(e) => tracing::warn!(error = %e, "Could not count knowledge documents"),
    }

    let app = build_app(deps, &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
