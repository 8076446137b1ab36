//! Loading knowledge seed files from disk.

use std::path::Path;

use grounding::{parse_seed_documents, KnowledgeDocument, SeedReport, KNOWLEDGE_FILES};
use tracing::{info, warn};

use super::deps::AppPipeline;

/// Read every known seed file in `dir`.
///
/// Missing or unparseable files are reported as errors and skipped.
pub async fn load_knowledge_dir(dir: &Path) -> (Vec<KnowledgeDocument>, Vec<String>) {
    let mut documents = Vec::new();
    let mut errors = Vec::new();

    for (filename, category) in KNOWLEDGE_FILES {
        let path = dir.join(filename);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Knowledge file unavailable");
                errors.push(format!("File not found: {}", filename));
                continue;
            }
        };

        match parse_seed_documents(&raw, category) {
            Ok(docs) => {
                info!(file = filename, docs = docs.len(), "Loaded knowledge file");
                documents.extend(docs);
            }
            Err(e) => {
                warn!(file = filename, error = %e, "Invalid knowledge file");
                errors.push(format!("Invalid file {}: {}", filename, e));
            }
        }
    }

    (documents, errors)
}

/// Seed the knowledge base from `dir`, keeping file errors in the report.
pub async fn seed_from_dir(pipeline: &AppPipeline, dir: &Path) -> grounding::Result<SeedReport> {
    let (documents, file_errors) = load_knowledge_dir(dir).await;

    let mut report = SeedReport::default();
    for error in file_errors {
        report.record_error(error);
    }
    pipeline.seed_into(&mut report, documents).await;
    pipeline.finish_seed(report).await
}
