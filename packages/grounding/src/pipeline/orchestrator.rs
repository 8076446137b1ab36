//! The grounding pipeline: main entry point of the library.
//!
//! `analyze_call` runs the stages in [`Stage`] order for one call. Every stage
//! result goes through [`StageTrace::settle`], so whether a failure aborts,
//! falls back, or is merely logged is decided by the stage's policy.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::error::{GroundingError, PipelineError, PipelineResult, Result};
use crate::traits::ai::{CompletionOptions, AI};
use crate::traits::audit::{AuditTrail, NoopAuditTrail};
use crate::traits::store::RecordStore;
use crate::types::{
    AnalysisResponse, CallDocument, CallId, CallRecord, CaseStatus, ChatConfig, PipelineConfig,
    RagOutput, RiskSignals,
};

use super::context::build_grounding_context;
use super::extraction::extract_and_store;
use super::prompts::{prompt_version, REASONING_SYSTEM_PROMPT};
use super::retrieval::retrieve_knowledge;
use super::stage::{with_retry, Stage, StageOutcome, StageTrace};
use super::validate::validate_rag_output;

/// Result of a successful analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub response: AnalysisResponse,
    pub trace: StageTrace,
}

impl AnalysisOutcome {
    /// True when the reasoning model was unavailable and the fallback was used.
    pub fn used_fallback(&self) -> bool {
        self.trace.is_degraded(Stage::Reason)
    }
}

/// Grounding pipeline over a record store and a model provider.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = GroundingPipeline::new(Arc::new(store), Arc::new(ai))
///     .with_audit_trail(Arc::new(backboard));
///
/// let outcome = pipeline.analyze_call(signals).await?;
/// println!("{}", outcome.response.rag_output.recommended_action);
/// ```
pub struct GroundingPipeline<S: RecordStore + ?Sized, A: AI + ?Sized> {
    pub(crate) store: Arc<S>,
    pub(crate) ai: Arc<A>,
    pub(crate) audit: Arc<dyn AuditTrail>,
    pub(crate) config: PipelineConfig,
    pub(crate) chat_config: ChatConfig,
}

impl<S: RecordStore + ?Sized, A: AI + ?Sized> Clone for GroundingPipeline<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ai: self.ai.clone(),
            audit: self.audit.clone(),
            config: self.config.clone(),
            chat_config: self.chat_config.clone(),
        }
    }
}

impl<S, A> GroundingPipeline<S, A>
where
    S: RecordStore + ?Sized + 'static,
    A: AI + ?Sized + 'static,
{
    /// Create a pipeline with default configuration and no audit trail.
    pub fn new(store: Arc<S>, ai: Arc<A>) -> Self {
        Self {
            store,
            ai,
            audit: Arc::new(NoopAuditTrail),
            config: PipelineConfig::default(),
            chat_config: ChatConfig::default(),
        }
    }

    pub fn with_audit_trail(mut self, audit: Arc<dyn AuditTrail>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_chat_config(mut self, config: ChatConfig) -> Self {
        self.chat_config = config;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn ai(&self) -> &Arc<A> {
        &self.ai
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Knowledge base has at least one document.
    pub async fn ensure_ready(&self) -> PipelineResult<usize> {
        let count = self
            .store
            .count_knowledge()
            .await
            .map_err(|source| PipelineError::Stage {
                stage: Stage::Precondition,
                source,
            })?;
        if count == 0 {
            warn!("Knowledge base is empty, refusing to analyze");
            return Err(PipelineError::KnowledgeBaseEmpty);
        }
        Ok(count)
    }

    /// Ground one call's risk signals and persist the assessment.
    #[instrument(
        skip(self, signals),
        fields(risk_score = signals.risk_score(), call_id = tracing::field::Empty)
    )]
    pub async fn analyze_call(&self, signals: RiskSignals) -> PipelineResult<AnalysisOutcome> {
        signals
            .validate()
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        let mut trace = StageTrace::new();

        // Precondition: no mutation before this passes
        let knowledge_docs = self.ensure_ready().await?;
        trace.completed(Stage::Precondition);
        debug!(knowledge_docs, "Knowledge base ready");

        // Ingest
        let call_timestamp = Utc::now();
        let call_id = CallId::generate_at(call_timestamp);
        tracing::Span::current().record("call_id", tracing::field::display(&call_id));
        let mut record = CallRecord::new(call_id.clone(), call_timestamp, signals);
        trace.settle(Stage::Ingest, self.store.insert_call(&record).await)?;
        info!(call_id = %call_id, "Call ingested");

        // Embed (fatal after retry)
        let summary = record.summary().to_string();
        let embedding = trace
            .settle(
                Stage::Embed,
                with_retry("embed", || self.ai.embed(&summary)).await,
            )?
            .ok_or_else(|| fatal(Stage::Embed, "embedding unavailable"))?;

        // Store embedding (best-effort)
        trace.settle(
            Stage::StoreEmbedding,
            self.store.store_call_embedding(&call_id, &embedding).await,
        )?;

        // Retrieve
        let knowledge = trace
            .settle(
                Stage::Retrieve,
                retrieve_knowledge(self.store.as_ref(), &embedding, &self.config.retrieval).await,
            )?
            .ok_or_else(|| fatal(Stage::Retrieve, "knowledge unavailable"))?;

        // Assemble context
        let context = build_grounding_context(&record.signals, &knowledge);
        trace.completed(Stage::AssembleContext);
        debug!(call_id = %call_id, context_chars = context.len(), "Grounding context built");

        // Audit context (best-effort)
        let thread_id = self.audit_context(&mut trace, &record, &context).await?;

        // Reason (falls back after retry)
        let options = CompletionOptions::new().with_temperature(self.config.reasoning_temperature);
        let reasoned = with_retry("reason", || async {
            let completion = self
                .ai
                .complete_json(REASONING_SYSTEM_PROMPT, &context, &options)
                .await?;
            debug!(model = %completion.model, tokens = completion.tokens_used, "Reasoning model responded");
            validate_rag_output(&completion.value)
        })
        .await;
        let rag_output = match trace.settle(Stage::Reason, reasoned)? {
            Some(output) => output,
            None => {
                warn!(call_id = %call_id, "Reasoning unavailable, using fallback assessment");
                RagOutput::fallback()
            }
        };

        // Audit output (best-effort)
        self.audit_output(&mut trace, thread_id.as_deref(), &rag_output)
            .await?;

        // Persist
        trace.settle(
            Stage::Persist,
            self.store.update_rag_output(&call_id, &rag_output).await,
        )?;
        record.rag_output = Some(rag_output.clone());

        // Derive status from the upstream score, regardless of the assessment
        let status = CaseStatus::from_risk_score(record.risk_score());
        if trace
            .settle(
                Stage::DeriveStatus,
                self.store.update_status(&call_id, status).await,
            )?
            .is_some()
        {
            record.status = status;
        }

        info!(
            call_id = %call_id,
            assessment = %rag_output.grounded_assessment,
            action = %rag_output.recommended_action,
            status = %record.status,
            "Call grounded"
        );

        // Extract document (best-effort)
        self.run_extraction(&mut trace, record.clone()).await?;

        Ok(AnalysisOutcome {
            response: AnalysisResponse {
                call_id,
                call_timestamp,
                input_risk_assessment: record.signals.risk_assessment.clone(),
                rag_output,
            },
            trace,
        })
    }

    /// Re-run document extraction for a stored call.
    #[instrument(skip(self), fields(call_id = %call_id))]
    pub async fn regenerate_document(&self, call_id: &CallId) -> Result<CallDocument> {
        let record = self
            .store
            .get_call(call_id)
            .await?
            .ok_or_else(|| GroundingError::CallNotFound {
                call_id: call_id.to_string(),
            })?;

        extract_and_store(
            self.store.as_ref(),
            self.ai.as_ref(),
            &record,
            record.rag_output.as_ref(),
            &self.config,
        )
        .await
    }

    async fn audit_context(
        &self,
        trace: &mut StageTrace,
        record: &CallRecord,
        context: &str,
    ) -> PipelineResult<Option<String>> {
        let thread = match self.audit.start_thread(&record.call_id).await {
            Ok(Some(thread)) => thread,
            Ok(None) => {
                trace.skipped(Stage::AuditContext, "audit trail keeps no threads");
                return Ok(None);
            }
            Err(e) => {
                trace.settle::<()>(Stage::AuditContext, Err(e))?;
                return Ok(None);
            }
        };

        let signals_json = serde_json::to_string_pretty(&record.signals)
            .unwrap_or_else(|_| record.summary().to_string());
        let message = format!(
            "CALL {} | prompt {}\n\n=== INPUT SIGNALS ===\n{}\n\n{}",
            record.call_id,
            prompt_version(),
            signals_json,
            context
        );
        trace.settle(
            Stage::AuditContext,
            self.audit.append(&thread, "grounding_context", &message).await,
        )?;
        Ok(Some(thread))
    }

    async fn audit_output(
        &self,
        trace: &mut StageTrace,
        thread_id: Option<&str>,
        output: &RagOutput,
    ) -> PipelineResult<()> {
        let Some(thread) = thread_id else {
            trace.skipped(Stage::AuditOutput, "no audit thread");
            return Ok(());
        };
        let message = serde_json::to_string_pretty(output).map_err(GroundingError::from);
        let result = match message {
            Ok(message) => self.audit.append(thread, "rag_output", &message).await,
            Err(e) => Err(e),
        };
        trace.settle(Stage::AuditOutput, result)?;
        Ok(())
    }

    async fn run_extraction(&self, trace: &mut StageTrace, record: CallRecord) -> PipelineResult<()> {
        if self.config.detach_extraction {
            let store = self.store.clone();
            let ai = self.ai.clone();
            let config = self.config.clone();
            tokio::spawn(async move {
                let call_id = record.call_id.clone();
                if let Err(e) = extract_and_store(
                    store.as_ref(),
                    ai.as_ref(),
                    &record,
                    record.rag_output.as_ref(),
                    &config,
                )
                .await
                {
                    warn!(call_id = %call_id, error = %e, "Background document extraction failed");
                }
            });
            trace.record(Stage::ExtractDocument, StageOutcome::Detached);
            return Ok(());
        }

        let result = extract_and_store(
            self.store.as_ref(),
            self.ai.as_ref(),
            &record,
            record.rag_output.as_ref(),
            &self.config,
        )
        .await;
        trace.settle(Stage::ExtractDocument, result)?;
        Ok(())
    }
}

fn fatal(stage: Stage, reason: &str) -> PipelineError {
    PipelineError::Stage {
        stage,
        source: GroundingError::InvalidOutput {
            reason: reason.to_string(),
        },
    }
}
