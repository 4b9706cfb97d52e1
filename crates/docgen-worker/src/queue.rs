//! Durable job queue over a message broker.
//!
//! The queue owns the `queued`, `delayed` and `active` states of a job and
//! applies the retry, backoff and retention policy. Job bodies live in the
//! broker so any worker process can pick them up after a crash.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use docgen_broker::BrokerManager;
use docgen_core::config::QueueConfig;
use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::traits::{FinishedSet, QueueBroker, QueueCounts};
use docgen_core::types::{JobId, ThesisId};
use docgen_entity::job::{BackoffPolicy, GenerationParams, Job, JobKind, JobStatus, NewJob};

/// Parameters for enqueueing a job.
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    /// Kind of work.
    pub kind: JobKind,
    /// The thesis the job is about.
    pub thesis_id: Option<ThesisId>,
    /// Payload snapshot.
    pub payload: serde_json::Value,
    /// Id reserved by the caller, e.g. to claim the status record first.
    pub id: Option<JobId>,
}

impl EnqueueRequest {
    /// Request a job of `kind` for `thesis_id`.
    pub fn new(kind: JobKind, thesis_id: ThesisId, payload: serde_json::Value) -> Self {
        Self {
            kind,
            thesis_id: Some(thesis_id),
            payload,
            id: None,
        }
    }

    /// Use a pre-assigned job id.
    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = Some(id);
        self
    }
}

/// What happened to a job whose attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Scheduled for another attempt.
    Retrying {
        /// Attempt that just failed (1-based).
        attempt: u32,
        /// When the job becomes ready again.
        ready_at: DateTime<Utc>,
    },
    /// Attempts are exhausted; the job is failed-terminal.
    Terminal,
}

/// List sizes of one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Queue name.
    pub name: String,
    /// List sizes.
    #[serde(flatten)]
    pub counts: QueueCounts,
}

/// Statistics of every queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Per-queue counts.
    pub queues: Vec<QueueSnapshot>,
}

/// Result of one stalled-job sweep.
#[derive(Debug, Clone, Default)]
pub struct StallRecovery {
    /// Jobs put back on their wait list.
    pub requeued: u64,
    /// Jobs whose stalled attempt was their last; now failed-terminal.
    pub failed: Vec<Job>,
}

/// Durable job queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Broker holding job bodies and lists.
    broker: BrokerManager,
    /// Retry, backoff and retention policy.
    config: QueueConfig,
    /// Active-list entries the last stall sweep found still unclaimed.
    unclaimed: Arc<DashSet<JobId>>,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(broker: BrokerManager, config: QueueConfig) -> Self {
        Self {
            broker,
            config,
            unclaimed: Arc::new(DashSet::new()),
        }
    }

    /// Queue policy.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Names of all queues served by this queue.
    pub fn queue_names(&self) -> Vec<String> {
        self.config.queues()
    }

    /// Queue a job kind is routed to.
    pub fn queue_for(&self, kind: JobKind) -> &str {
        match kind {
            JobKind::ThesisGeneration => &self.config.generation_queue,
            JobKind::QuizGeneration | JobKind::SearchQueryGeneration => {
                &self.config.artifact_queue
            }
        }
    }

    /// Validate and durably enqueue a job.
    ///
    /// Nothing is written when validation fails.
    pub async fn enqueue(&self, request: EnqueueRequest) -> AppResult<Job> {
        let thesis_id = request
            .thesis_id
            .ok_or_else(|| AppError::validation("domainId is required"))?;
        if request.payload.is_null() {
            return Err(AppError::validation("generationPayload is required"));
        }
        if request.kind == JobKind::ThesisGeneration {
            let params: GenerationParams = serde_json::from_value(request.payload.clone())
                .map_err(|e| AppError::validation(format!("Invalid generation payload: {e}")))?;
            params.validate()?;
        }

        let mut job = Job::new(NewJob {
            queue: self.queue_for(request.kind).to_string(),
            kind: request.kind,
            thesis_id,
            payload: request.payload,
            max_attempts: self.config.max_attempts,
            backoff: BackoffPolicy::from(&self.config.backoff),
            operation: None,
        });
        if let Some(id) = request.id {
            job.id = id;
        }

        self.save(&job).await?;
        self.broker.push_waiting(&job.queue, job.id).await?;

        debug!(
            job_id = %job.id,
            kind = %job.kind,
            queue = %job.queue,
            thesis_id = %job.thesis_id,
            "Enqueued job"
        );
        Ok(job)
    }

    /// Claim the next ready job from the given queues, in order.
    ///
    /// Due delayed jobs are promoted first. The claimed job is `active`
    /// and its attempt counter already includes the new attempt.
    pub async fn dequeue(&self, queues: &[String]) -> AppResult<Option<Job>> {
        let now_ms = Utc::now().timestamp_millis();
        for queue in queues {
            self.broker.promote_due(queue, now_ms).await?;

            while let Some(id) = self.broker.claim_next(queue).await? {
                let Some(mut job) = self.get(queue, id).await? else {
                    warn!(job_id = %id, queue = %queue, "Claimed job has no body, dropping");
                    self.broker.release_active(queue, id).await?;
                    continue;
                };

                let now = Utc::now();
                job.status = JobStatus::Active;
                job.attempts += 1;
                job.started_at = Some(now);
                job.ready_at = None;
                job.updated_at = now;
                self.save(&job).await?;

                debug!(
                    job_id = %job.id,
                    kind = %job.kind,
                    queue = %job.queue,
                    attempt = job.attempts,
                    "Dequeued job"
                );
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    /// Mark an active job completed and apply completed-job retention.
    pub async fn complete(
        &self,
        job: &mut Job,
        result: Option<serde_json::Value>,
    ) -> AppResult<()> {
        let now = Utc::now();
        job.status = JobStatus::Completed;
        job.result = result;
        job.finished_at = Some(now);
        job.updated_at = now;

        self.broker.release_active(&job.queue, job.id).await?;
        if self.config.keep_completed == 0 {
            self.broker.remove_job(&job.queue, job.id).await?;
        } else {
            self.save(job).await?;
            self.retain(job, FinishedSet::Completed, self.config.keep_completed)
                .await?;
        }

        debug!(job_id = %job.id, "Job completed");
        Ok(())
    }

    /// Record a failed attempt and schedule a fresh retry after the backoff
    /// delay, or fail the job when its attempts are exhausted.
    ///
    /// The retry starts new provider work: any remembered operation is
    /// dropped.
    pub async fn fail(&self, job: &mut Job, reason: &str) -> AppResult<FailOutcome> {
        job.operation = None;
        self.retry_or_fail(job, reason).await
    }

    /// Hand an attempt that is still waiting on `operation` to a
    /// continuation that resumes polling the same operation.
    ///
    /// A continuation counts as an attempt.
    pub async fn defer(
        &self,
        job: &mut Job,
        operation: &str,
        reason: &str,
    ) -> AppResult<FailOutcome> {
        job.operation = Some(operation.to_string());
        self.retry_or_fail(job, reason).await
    }

    /// Fail an active job without further attempts.
    pub async fn fail_permanently(&self, job: &mut Job, reason: &str) -> AppResult<()> {
        let now = Utc::now();
        job.status = JobStatus::Failed;
        job.last_error = Some(reason.to_string());
        job.finished_at = Some(now);
        job.updated_at = now;

        self.save(job).await?;
        self.broker.release_active(&job.queue, job.id).await?;
        self.retain(job, FinishedSet::Failed, self.config.keep_failed)
            .await?;

        info!(
            job_id = %job.id,
            kind = %job.kind,
            attempts = job.attempts,
            "Job failed terminally: {}",
            reason
        );
        Ok(())
    }

    /// Load a job by queue and id.
    pub async fn get(&self, queue: &str, id: JobId) -> AppResult<Option<Job>> {
        match self.broker.load_job(queue, id).await? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Move delayed jobs whose backoff elapsed back to their wait lists.
    pub async fn promote_due(&self) -> AppResult<u64> {
        let now_ms = Utc::now().timestamp_millis();
        let mut moved = 0;
        for queue in self.queue_names() {
            moved += self.broker.promote_due(&queue, now_ms).await?;
        }
        Ok(moved)
    }

    /// Re-queue active jobs whose attempt started more than the stall
    /// timeout before `now` (their worker died).
    ///
    /// A job still marked queued sits between the list move and the body
    /// update of a claim. It counts from its last update instead and is
    /// only recovered when the previous sweep saw it unclaimed as well. A
    /// stalled job that was on its last attempt fails terminally.
    pub async fn recover_stalled(&self, now: DateTime<Utc>) -> AppResult<StallRecovery> {
        let timeout = ChronoDuration::seconds(
            i64::try_from(self.config.stall_timeout_seconds).unwrap_or(i64::MAX / 1000),
        );
        let mut recovery = StallRecovery::default();
        let seen_unclaimed: HashSet<JobId> = self.unclaimed.iter().map(|id| *id).collect();
        self.unclaimed.clear();

        for queue in self.queue_names() {
            for id in self.broker.list_active(&queue).await? {
                let Some(mut job) = self.get(&queue, id).await? else {
                    self.broker.release_active(&queue, id).await?;
                    continue;
                };
                let since = match (job.status, job.started_at) {
                    (JobStatus::Active, Some(started)) => started,
                    _ => job.updated_at,
                };
                if now.signed_duration_since(since) <= timeout {
                    continue;
                }
                if job.status != JobStatus::Active && !seen_unclaimed.contains(&id) {
                    self.unclaimed.insert(id);
                    continue;
                }

                if job.status == JobStatus::Active && job.is_last_attempt() {
                    let reason = format!("Worker stalled on final attempt {}", job.attempts);
                    warn!(job_id = %id, queue = %queue, attempt = job.attempts, "Stalled job out of attempts");
                    self.fail_permanently(&mut job, &reason).await?;
                    recovery.failed.push(job);
                    continue;
                }

                // Another worker may have finished it meanwhile.
                if !self.broker.release_active(&queue, id).await? {
                    continue;
                }

                job.status = JobStatus::Queued;
                job.started_at = None;
                job.updated_at = now;
                self.save(&job).await?;
                self.broker.push_waiting(&queue, id).await?;
                recovery.requeued += 1;
                warn!(job_id = %id, queue = %queue, attempt = job.attempts, "Recovered stalled job");
            }
        }
        Ok(recovery)
    }

    /// Counts of every queue.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        let mut queues = Vec::new();
        for name in self.queue_names() {
            let counts = self.broker.counts(&name).await?;
            queues.push(QueueSnapshot { name, counts });
        }
        Ok(QueueStats { queues })
    }

    /// Check that the broker is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.broker.health_check().await
    }

    async fn retry_or_fail(&self, job: &mut Job, reason: &str) -> AppResult<FailOutcome> {
        if job.is_last_attempt() {
            self.fail_permanently(job, reason).await?;
            return Ok(FailOutcome::Terminal);
        }

        let now = Utc::now();
        let delay = job.backoff.delay_for(job.attempts);
        let ready_at = now
            + ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::seconds(3600));
        job.status = JobStatus::Delayed;
        job.last_error = Some(reason.to_string());
        job.ready_at = Some(ready_at);
        job.started_at = None;
        job.updated_at = now;

        self.save(job).await?;
        self.broker.release_active(&job.queue, job.id).await?;
        self.broker
            .push_delayed(&job.queue, job.id, ready_at.timestamp_millis())
            .await?;

        debug!(
            job_id = %job.id,
            attempt = job.attempts,
            delay_ms = delay.as_millis() as u64,
            "Job scheduled for retry"
        );
        Ok(FailOutcome::Retrying {
            attempt: job.attempts,
            ready_at,
        })
    }

    async fn retain(&self, job: &Job, set: FinishedSet, keep: usize) -> AppResult<()> {
        let finished_ms = job
            .finished_at
            .unwrap_or_else(Utc::now)
            .timestamp_millis();
        let evicted = self
            .broker
            .record_finished(&job.queue, set, job.id, finished_ms, keep)
            .await?;
        for id in evicted {
            self.broker.remove_job(&job.queue, id).await?;
        }
        Ok(())
    }

    async fn save(&self, job: &Job) -> AppResult<()> {
        let body = serde_json::to_string(job)?;
        self.broker.store_job(&job.queue, job.id, &body).await
    }
}
