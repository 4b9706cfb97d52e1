//! Job executor: dispatches jobs to the handler registered for their kind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_entity::job::{Job, JobKind};

/// Trait for job handler implementations.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job kind this handler processes.
    fn kind(&self) -> JobKind;

    /// Run one attempt of the job.
    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError>;

    /// Called once when the job becomes failed-terminal.
    async fn on_terminal_failure(&self, _job: &Job, _reason: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Error from job execution.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure: do not retry.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure: retry with fresh provider work.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// The provider operation is still running; a continuation job
    /// resumes polling it.
    #[error("Waiting on operation {operation}: {message}")]
    Pending {
        /// Operation name to resume.
        operation: String,
        /// Why the attempt stopped waiting.
        message: String,
    },

    /// Internal error; retried when its kind is retryable.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Dispatches jobs to the appropriate handler based on their kind.
#[derive(Debug, Default)]
pub struct JobExecutor {
    /// Registered job handlers by kind.
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let kind = handler.kind();
        info!("Registered job handler for kind '{}'", kind);
        self.handlers.insert(kind, handler);
    }

    /// Execute a job by dispatching to the correct handler.
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.kind).ok_or_else(|| {
            JobExecutionError::Permanent(format!("No handler registered for job kind '{}'", job.kind))
        })?;

        info!(
            job_id = %job.id,
            kind = %job.kind,
            thesis_id = %job.thesis_id,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Executing job"
        );

        handler.execute(job).await
    }

    /// Notify the handler that a job failed terminally.
    pub async fn terminal_failure(&self, job: &Job, reason: &str) -> AppResult<()> {
        match self.handlers.get(&job.kind) {
            Some(handler) => handler.on_terminal_failure(job, reason).await,
            None => Ok(()),
        }
    }

    /// Check if a handler is registered for a job kind.
    pub fn has_handler(&self, kind: JobKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}
