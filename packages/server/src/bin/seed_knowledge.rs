//! Seed the knowledge base from the JSON files in KNOWLEDGE_DIR.
//!
//! Usage: cargo run --bin seed_knowledge [-- <dir>]

use anyhow::{Context, Result};
use server_core::config::Config;
use server_core::kernel::{seed_from_dir, ServerDeps};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,grounding=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    if config.database_url.is_none() {
        anyhow::bail!("DATABASE_URL must be set; seeding in-memory storage would be lost on exit");
    }

    let dir = std::env::args()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| config.knowledge_dir.clone());

    let deps = ServerDeps::from_config(&config).await?;

    println!("Seeding knowledge base from {}\n", dir.display());
    let report = seed_from_dir(&deps.pipeline, &dir)
        .await
        .context("Failed to seed knowledge base")?;

    println!("Processed {} documents", report.documents_processed);
    for (category, count) in &report.by_category {
        println!("  {}: {}", category, count);
    }
    println!("Total in database: {}", report.total_in_db);

    if !report.errors.is_empty() {
        println!("\n{} errors:", report.errors.len());
        for error in &report.errors {
            eprintln!("  {}", error);
        }
    }

    Ok(())
}
