//! Message broker trait backing the durable job queue.
//!
//! The broker stores opaque job bodies (JSON) and moves job ids between
//! the lists that make up a queue: `wait`, `active`, `delayed`, and the
//! bounded `completed` / `failed` retention sets. It knows nothing about
//! retry policy; that lives in the queue built on top of it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::JobId;

/// Retention set a finished job is recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishedSet {
    /// Jobs that completed successfully.
    Completed,
    /// Jobs that exhausted their attempts.
    Failed,
}

impl FinishedSet {
    /// Key segment for this set.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Number of job ids in each list of one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Ready to be claimed.
    pub waiting: u64,
    /// Claimed by a worker.
    pub active: u64,
    /// Waiting for their backoff delay to elapse.
    pub delayed: u64,
    /// Retained completed jobs.
    pub completed: u64,
    /// Retained failed-terminal jobs.
    pub failed: u64,
}

/// Trait for broker backends (Redis or in-memory).
///
/// Every method is a short, independent round trip; implementations must
/// make `claim_next`, `promote_due`, and `record_finished` atomic with
/// respect to other workers sharing the same broker.
#[async_trait]
pub trait QueueBroker: Send + Sync + std::fmt::Debug + 'static {
    /// Persist (or overwrite) the serialized body of a job.
    async fn store_job(&self, queue: &str, id: JobId, body: &str) -> AppResult<()>;

    /// Load the serialized body of a job.
    async fn load_job(&self, queue: &str, id: JobId) -> AppResult<Option<String>>;

    /// Delete a job body.
    async fn remove_job(&self, queue: &str, id: JobId) -> AppResult<()>;

    /// Append a job id to the wait list.
    async fn push_waiting(&self, queue: &str, id: JobId) -> AppResult<()>;

    /// Schedule a job id to become ready at `ready_at_ms` (unix millis).
    async fn push_delayed(&self, queue: &str, id: JobId, ready_at_ms: i64) -> AppResult<()>;

    /// Move every delayed job whose ready time is `<= now_ms` to the wait
    /// list. Returns how many were moved.
    async fn promote_due(&self, queue: &str, now_ms: i64) -> AppResult<u64>;

    /// Atomically move the oldest waiting job id to the active list.
    async fn claim_next(&self, queue: &str) -> AppResult<Option<JobId>>;

    /// Remove a job id from the active list. Returns `false` when it was
    /// not active.
    async fn release_active(&self, queue: &str, id: JobId) -> AppResult<bool>;

    /// Job ids currently in the active list.
    async fn list_active(&self, queue: &str) -> AppResult<Vec<JobId>>;

    /// Record a finished job id in a bounded retention set and trim the set
    /// to `keep` entries, oldest first. Returns the evicted ids so their
    /// bodies can be removed.
    async fn record_finished(
        &self,
        queue: &str,
        set: FinishedSet,
        id: JobId,
        finished_at_ms: i64,
        keep: usize,
    ) -> AppResult<Vec<JobId>>;

    /// Current list sizes of a queue.
    async fn counts(&self, queue: &str) -> AppResult<QueueCounts>;

    /// Check that the broker backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
