//! Provider calls shared by the generation handlers.

use std::sync::Arc;
use std::time::Duration;

use docgen_core::error::AppError;
use docgen_entity::job::Job;
use docgen_provider::{
    DriveOutcome, Generation, GenerationProvider, GenerationRequest, OperationHandle,
    OperationPoller, PollError, ProviderError,
};

use crate::executor::JobExecutionError;

/// How a provider call got started.
#[derive(Debug, Clone, PartialEq)]
pub enum Started {
    /// The provider answered synchronously.
    Text(String),
    /// A long-running operation to wait on.
    Operation {
        /// Operation handle.
        handle: OperationHandle,
        /// Whether it was carried over from an earlier attempt.
        resumed: bool,
    },
}

/// Starts provider work for a job, or resumes it, and waits for the text.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    provider: Arc<dyn GenerationProvider>,
    poller: OperationPoller,
    max_wait: Duration,
}

impl ProviderCall {
    /// Create a provider call helper waiting at most `max_wait` per attempt.
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        poller: OperationPoller,
        max_wait: Duration,
    ) -> Self {
        Self {
            provider,
            poller,
            max_wait,
        }
    }

    /// Resume the job's remembered operation, or send a new request.
    pub async fn start(
        &self,
        job: &Job,
        request: impl FnOnce() -> GenerationRequest,
    ) -> Result<Started, JobExecutionError> {
        if let Some(operation) = &job.operation {
            return Ok(Started::Operation {
                handle: OperationHandle::new(operation.as_str()),
                resumed: true,
            });
        }
        match self.provider.generate(request()).await {
            Ok(Generation::Text(text)) => Ok(Started::Text(text)),
            Ok(Generation::Pending(handle)) => Ok(Started::Operation {
                handle,
                resumed: false,
            }),
            Err(e) => Err(classify_provider_error(e)),
        }
    }

    /// Poll `handle` for at most the configured wait.
    ///
    /// A timeout or a transport failure while polling becomes
    /// [`JobExecutionError::Pending`], so the next attempt resumes the same
    /// operation instead of paying for a new one.
    pub async fn wait(&self, handle: &OperationHandle) -> Result<String, JobExecutionError> {
        match self.poller.drive(handle, self.max_wait, None).await {
            Ok(DriveOutcome::Completed(snapshot)) => snapshot.response_text().ok_or_else(|| {
                JobExecutionError::Transient(format!(
                    "Operation {handle} finished without a text response"
                ))
            }),
            Ok(DriveOutcome::Failed { error, .. }) => Err(JobExecutionError::Transient(format!(
                "Provider {error}"
            ))),
            Ok(DriveOutcome::TimedOut { elapsed, .. }) => Err(JobExecutionError::Pending {
                operation: handle.name().to_string(),
                message: format!("operation still running after {}s", elapsed.as_secs()),
            }),
            Err(err @ PollError::HandleExpired { .. }) => {
                Err(JobExecutionError::Permanent(AppError::from(err).message))
            }
            Err(err) => Err(JobExecutionError::Pending {
                operation: handle.name().to_string(),
                message: err.to_string(),
            }),
        }
    }

    /// Start (or resume) and wait in one step.
    pub async fn text(
        &self,
        job: &Job,
        request: impl FnOnce() -> GenerationRequest,
    ) -> Result<String, JobExecutionError> {
        match self.start(job, request).await? {
            Started::Text(text) => Ok(text),
            Started::Operation { handle, .. } => self.wait(&handle).await,
        }
    }
}

/// Map a failed generation request onto retry semantics.
pub fn classify_provider_error(err: ProviderError) -> JobExecutionError {
    match err {
        ProviderError::InvalidResponse(_) => JobExecutionError::Transient(err.to_string()),
        e if e.is_retryable() => JobExecutionError::Transient(e.to_string()),
        e => JobExecutionError::Permanent(e.to_string()),
    }
}
