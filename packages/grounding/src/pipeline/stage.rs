//! Pipeline stages and their failure policy.
//!
//! Each stage declares what happens when it fails. The orchestrator hands every
//! stage result to [`StageTrace::settle`], which applies that policy and keeps a
//! record of what ran, so callers (and tests) can see exactly which best-effort
//! stages degraded on a given run.

use std::future::Future;

use serde::Serialize;
use tracing::{error, warn};

use crate::error::{GroundingError, PipelineError, PipelineResult, Result};

/// Attempts made for embedding and completion calls.
pub const MAX_ATTEMPTS: usize = 2;

/// One step of the analysis pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Precondition,
    Ingest,
    Embed,
    StoreEmbedding,
    Retrieve,
    AssembleContext,
    AuditContext,
    Reason,
    AuditOutput,
    Persist,
    DeriveStatus,
    ExtractDocument,
}

/// What a stage failure does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the request.
    Fatal,
    /// Substitute a conservative value and continue.
    Fallback,
    /// Log and continue.
    BestEffort,
}

impl Stage {
    pub fn policy(&self) -> FailurePolicy {
        match self {
            Stage::Precondition
            | Stage::Ingest
            | Stage::Embed
            | Stage::Retrieve
            | Stage::AssembleContext
            | Stage::Persist => FailurePolicy::Fatal,
            Stage::Reason => FailurePolicy::Fallback,
            Stage::StoreEmbedding
            | Stage::AuditContext
            | Stage::AuditOutput
            | Stage::DeriveStatus
            | Stage::ExtractDocument => FailurePolicy::BestEffort,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Precondition => "precondition",
            Stage::Ingest => "ingest",
            Stage::Embed => "embed",
            Stage::StoreEmbedding => "store_embedding",
            Stage::Retrieve => "retrieve",
            Stage::AssembleContext => "assemble_context",
            Stage::AuditContext => "audit_context",
            Stage::Reason => "reason",
            Stage::AuditOutput => "audit_output",
            Stage::Persist => "persist",
            Stage::DeriveStatus => "derive_status",
            Stage::ExtractDocument => "extract_document",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stage ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    /// Failed, but policy let the run continue.
    Degraded { reason: String },
    /// Not attempted (e.g. no audit thread).
    Skipped { reason: String },
    /// Handed off to a background task.
    Detached,
    /// Fatal failure; the run stopped here.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

/// Ordered record of the stages one run went through.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageTrace {
    records: Vec<StageRecord>,
}

impl StageTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.records.push(StageRecord { stage, outcome });
    }

    pub fn completed(&mut self, stage: Stage) {
        self.record(stage, StageOutcome::Completed);
    }

    pub fn skipped(&mut self, stage: Stage, reason: impl Into<String>) {
        self.record(
            stage,
            StageOutcome::Skipped {
                reason: reason.into(),
            },
        );
    }

    /// Apply the stage's failure policy to its result.
    ///
    /// - Ok: recorded as completed, value returned
    /// - Fatal: recorded as failed, error returned
    /// - Fallback / best-effort: recorded as degraded, `Ok(None)` returned
    pub fn settle<T>(&mut self, stage: Stage, result: Result<T>) -> PipelineResult<Option<T>> {
        match result {
            Ok(value) => {
                self.completed(stage);
                Ok(Some(value))
            }
            Err(e) => match stage.policy() {
                FailurePolicy::Fatal => {
                    error!(stage = %stage, error = %e, "Fatal stage failure");
                    self.record(
                        stage,
                        StageOutcome::Failed {
                            reason: e.to_string(),
                        },
                    );
                    Err(PipelineError::Stage { stage, source: e })
                }
                FailurePolicy::Fallback | FailurePolicy::BestEffort => {
                    warn!(stage = %stage, error = %e, "Stage degraded, continuing");
                    self.record(
                        stage,
                        StageOutcome::Degraded {
                            reason: e.to_string(),
                        },
                    );
                    Ok(None)
                }
            },
        }
    }

    /// Outcome of a stage, if it ran.
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    /// Stages in the order they were recorded.
    pub fn stages(&self) -> Vec<Stage> {
        self.records.iter().map(|r| r.stage).collect()
    }

    pub fn is_degraded(&self, stage: Stage) -> bool {
        matches!(self.outcome(stage), Some(StageOutcome::Degraded { .. }))
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }
}

/// Run `op` up to [`MAX_ATTEMPTS`] times, returning the first success or the last error.
pub async fn with_retry<T, F, Fut>(label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<GroundingError> = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt < MAX_ATTEMPTS {
                    warn!(operation = label, attempt, error = %e, "Attempt failed, retrying");
                } else {
                    warn!(operation = label, attempt, error = %e, "All attempts failed");
                }
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| GroundingError::ai(format!("{} was never attempted", label))))
}
