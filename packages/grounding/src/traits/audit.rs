//! Audit trail and cross-record memory.
//!
//! Every operation is best-effort from the core's point of view: errors are
//! logged by the caller and never change a pipeline or chat result.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::CallId;

/// Audit/memory service.
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Open a thread for a call. `None` means the service keeps no threads.
    async fn start_thread(&self, call_id: &CallId) -> Result<Option<String>>;

    /// Append a labelled message to a thread.
    async fn append(&self, thread_id: &str, label: &str, content: &str) -> Result<()>;

    /// Ask a question against one thread's stored context.
    async fn query_thread(&self, thread_id: &str, question: &str) -> Result<Option<String>>;

    /// Ask a question against memory accumulated across all threads.
    async fn query_memory(&self, question: &str) -> Result<Option<String>>;
}

/// Audit trail that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditTrail;

#[async_trait]
impl AuditTrail for NoopAuditTrail {
    async fn start_thread(&self, _call_id: &CallId) -> Result<Option<String>> {
        Ok(None)
    }

    async fn append(&self, _thread_id: &str, _label: &str, _content: &str) -> Result<()> {
        Ok(())
    }

    async fn query_thread(&self, _thread_id: &str, _question: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn query_memory(&self, _question: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
