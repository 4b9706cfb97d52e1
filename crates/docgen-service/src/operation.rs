//! Synchronous operation checks for HTTP callers.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_provider::{DriveOutcome, OperationHandle, OperationPoller, OperationSnapshot};

/// Checks or waits on provider operations on behalf of a request.
#[derive(Debug, Clone)]
pub struct OperationService {
    poller: OperationPoller,
    max_wait: Duration,
}

impl OperationService {
    /// Create a service whose waits never exceed `max_wait`.
    pub fn new(poller: OperationPoller, max_wait: Duration) -> Self {
        Self { poller, max_wait }
    }

    /// Longest wait a caller may request.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// One poll attempt, no loop.
    pub async fn check(&self, handle: &str) -> AppResult<OperationSnapshot> {
        let handle = Self::parse_handle(handle)?;
        let snapshot = self.poller.poll_once(&handle).await?;
        debug!(operation = %handle, done = snapshot.done, "Operation checked");
        Ok(snapshot)
    }

    /// Poll until the operation finishes, `max_wait` passes, or `cancel`
    /// fires.
    ///
    /// The wait is capped at the configured maximum. A timeout is returned
    /// as [`DriveOutcome::TimedOut`], not as an error.
    pub async fn wait(
        &self,
        handle: &str,
        max_wait: Option<Duration>,
        cancel: &CancellationToken,
    ) -> AppResult<DriveOutcome> {
        let handle = Self::parse_handle(handle)?;
        let budget = max_wait.map_or(self.max_wait, |w| w.min(self.max_wait));
        let outcome = self.poller.drive(&handle, budget, Some(cancel)).await?;
        info!(
            operation = %handle,
            budget_ms = budget.as_millis() as u64,
            timed_out = outcome.is_timeout(),
            "Operation wait finished"
        );
        Ok(outcome)
    }

    fn parse_handle(raw: &str) -> AppResult<OperationHandle> {
        let handle = OperationHandle::new(raw);
        if handle.is_empty() {
            return Err(AppError::validation("operationHandle must not be empty"));
        }
        Ok(handle)
    }
}
