//! Worker runner: main loop that claims jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing::{error, info, trace, warn};

use docgen_core::config::WorkerConfig;
use docgen_core::result::AppResult;
use docgen_entity::job::Job;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::{FailOutcome, JobQueue};

/// Grace period for in-flight jobs on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Main worker runner that polls queues and executes jobs.
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue for polling.
    queue: Arc<JobQueue>,
    /// Job executor for dispatching.
    executor: Arc<JobExecutor>,
    /// Worker configuration.
    config: WorkerConfig,
    /// Worker identifier.
    worker_id: String,
    /// Queues to poll (in priority order).
    queues: Vec<String>,
}

impl WorkerRunner {
    /// Create a new worker runner polling every queue of `queue`.
    pub fn new(
        queue: Arc<JobQueue>,
        executor: Arc<JobExecutor>,
        config: WorkerConfig,
        worker_id: String,
    ) -> Self {
        let queues = queue.queue_names();
        Self {
            queue,
            executor,
            config,
            worker_id,
            queues,
        }
    }

    /// Set the queues to poll.
    pub fn with_queues(mut self, queues: Vec<String>) -> Self {
        self.queues = queues;
        self
    }

    /// Start the worker runner; runs until the cancel signal is received.
    ///
    /// Every job runs on its own task, so a job waiting on the provider
    /// never blocks the others.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);
        info!(
            worker_id = %self.worker_id,
            concurrency,
            poll_interval_ms = self.config.poll_interval_ms,
            queues = ?self.queues,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if *cancel.borrow() {
                break;
            }

            let claimed = self.poll_and_spawn(&semaphore).await;
            if claimed {
                continue;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!(worker_id = %self.worker_id, "Worker received shutdown signal");
                        break;
                    }
                }
                _ = time::sleep(poll_interval) => {}
            }
        }

        info!(worker_id = %self.worker_id, "Waiting for in-flight jobs to complete");
        let permits = u32::try_from(concurrency).unwrap_or(u32::MAX);
        if time::timeout(SHUTDOWN_GRACE, semaphore.acquire_many(permits))
            .await
            .is_err()
        {
            warn!(worker_id = %self.worker_id, "In-flight jobs still running after grace period");
        }
        info!(worker_id = %self.worker_id, "Worker shut down complete");
    }

    /// Claim one job and process it on the current task.
    ///
    /// Returns `false` when no job was ready.
    pub async fn run_once(&self) -> AppResult<bool> {
        match self.queue.dequeue(&self.queues).await? {
            Some(job) => {
                process_job(&self.queue, &self.executor, job).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Claim a job if a slot is free and spawn it. Returns whether a job
    /// was claimed.
    async fn poll_and_spawn(&self, semaphore: &Arc<Semaphore>) -> bool {
        let Ok(permit) = Arc::clone(semaphore).try_acquire_owned() else {
            trace!("All worker slots occupied, waiting");
            return false;
        };

        match self.queue.dequeue(&self.queues).await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                tokio::spawn(async move {
                    let _permit = permit;
                    process_job(&queue, &executor, job).await;
                });
                true
            }
            Ok(None) => {
                trace!("No jobs available in queues");
                false
            }
            Err(e) => {
                error!("Failed to dequeue job: {}", e);
                false
            }
        }
    }
}

/// Execute one claimed job and settle it in the queue.
pub async fn process_job(queue: &JobQueue, executor: &JobExecutor, mut job: Job) {
    let job_id = job.id;

    let settled = match executor.execute(&job).await {
        Ok(result) => {
            let completed = queue.complete(&mut job, result).await;
            if completed.is_ok() {
                info!(job_id = %job_id, "Job completed successfully");
            }
            completed
        }
        Err(JobExecutionError::Pending { operation, message }) => {
            info!(job_id = %job_id, operation = %operation, "Job handed to continuation: {}", message);
            match queue.defer(&mut job, &operation, &message).await {
                Ok(outcome) => settle_outcome(executor, &job, outcome, &message).await,
                Err(e) => Err(e),
            }
        }
        Err(JobExecutionError::Transient(message)) => {
            warn!(job_id = %job_id, attempt = job.attempts, "Job failed (transient): {}", message);
            match queue.fail(&mut job, &message).await {
                Ok(outcome) => settle_outcome(executor, &job, outcome, &message).await,
                Err(e) => Err(e),
            }
        }
        Err(JobExecutionError::Internal(err)) if err.kind.is_retryable() => {
            let message = err.to_string();
            warn!(job_id = %job_id, attempt = job.attempts, "Job failed (retryable): {}", message);
            match queue.fail(&mut job, &message).await {
                Ok(outcome) => settle_outcome(executor, &job, outcome, &message).await,
                Err(e) => Err(e),
            }
        }
        Err(err) => {
            let message = match err {
                JobExecutionError::Permanent(message) => message,
                other => other.to_string(),
            };
            error!(job_id = %job_id, "Job failed permanently: {}", message);
            match queue.fail_permanently(&mut job, &message).await {
                Ok(()) => settle_outcome(executor, &job, FailOutcome::Terminal, &message).await,
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = settled {
        error!(job_id = %job_id, "Failed to settle job: {}", e);
    }
}

async fn settle_outcome(
    executor: &JobExecutor,
    job: &Job,
    outcome: FailOutcome,
    reason: &str,
) -> AppResult<()> {
    match outcome {
        FailOutcome::Retrying { attempt, ready_at } => {
            info!(job_id = %job.id, attempt, ready_at = %ready_at, "Job will be retried");
            Ok(())
        }
        FailOutcome::Terminal => executor.terminal_failure(job, reason).await,
    }
}
