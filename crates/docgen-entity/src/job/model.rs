//! Job entity model.

use chrono::{DateTime, Utc};
use docgen_core::types::{JobId, ThesisId};
use serde::{Deserialize, Serialize};

use super::backoff::BackoffPolicy;
use super::status::{JobKind, JobStatus};

/// A durable unit of work tied to one thesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier assigned by the queue.
    pub id: JobId,
    /// Queue the job belongs to.
    pub queue: String,
    /// Kind of work.
    pub kind: JobKind,
    /// The thesis this job is about.
    pub thesis_id: ThesisId,
    /// Snapshot of the generation parameters taken at enqueue time.
    pub payload: serde_json::Value,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Attempts started so far.
    pub attempts: u32,
    /// Attempts allowed before the job becomes failed-terminal.
    pub max_attempts: u32,
    /// Delay policy between attempts.
    pub backoff: BackoffPolicy,
    /// Provider operation a continuation attempt resumes polling.
    pub operation: Option<String>,
    /// Result data on completion.
    pub result: Option<serde_json::Value>,
    /// Error of the most recent failed attempt.
    pub last_error: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the current attempt was claimed.
    pub started_at: Option<DateTime<Utc>>,
    /// When a delayed job becomes ready again.
    pub ready_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a queued job from creation data.
    pub fn new(new: NewJob) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            queue: new.queue,
            kind: new.kind,
            thesis_id: new.thesis_id,
            payload: new.payload,
            status: JobStatus::Queued,
            attempts: 0,
            max_attempts: new.max_attempts.max(1),
            backoff: new.backoff,
            operation: new.operation,
            result: None,
            last_error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            ready_at: None,
            finished_at: None,
        }
    }

    /// Attempts remaining after the current one.
    pub fn attempts_left(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Whether the attempt in progress is the last one allowed.
    pub fn is_last_attempt(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Queue name.
    pub queue: String,
    /// Kind of work.
    pub kind: JobKind,
    /// The thesis the job is about.
    pub thesis_id: ThesisId,
    /// Payload snapshot.
    pub payload: serde_json::Value,
    /// Maximum attempts.
    pub max_attempts: u32,
    /// Backoff policy.
    pub backoff: BackoffPolicy,
    /// Operation to resume instead of starting new provider work.
    pub operation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Job {
        Job::new(NewJob {
            queue: "thesis-generation".into(),
            kind: JobKind::ThesisGeneration,
            thesis_id: ThesisId::new(),
            payload: serde_json::json!({ "title": "T" }),
            max_attempts: 3,
            backoff: BackoffPolicy::Fixed { delay_ms: 10 },
            operation: None,
        })
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = sample();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.attempts_left(), 3);
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_last_attempt() {
        let mut job = sample();
        job.attempts = 3;
        assert!(job.is_last_attempt());
        assert_eq!(job.attempts_left(), 0);
    }

    #[test]
    fn test_zero_max_attempts_is_clamped() {
        let job = Job::new(NewJob {
            queue: "q".into(),
            kind: JobKind::QuizGeneration,
            thesis_id: ThesisId::new(),
            payload: serde_json::Value::Null,
            max_attempts: 0,
            backoff: BackoffPolicy::Fixed { delay_ms: 0 },
            operation: None,
        });
        assert_eq!(job.max_attempts, 1);
    }
}
