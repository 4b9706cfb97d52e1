//! Job queue retry, backoff, and retention policy.

use serde::{Deserialize, Serialize};

/// Durable job queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue receiving thesis generation jobs.
    #[serde(default = "default_generation_queue")]
    pub generation_queue: String,
    /// Queue receiving follow-on artifact jobs (quiz, search queries).
    #[serde(default = "default_artifact_queue")]
    pub artifact_queue: String,
    /// Attempts before a job becomes failed-terminal.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts.
    #[serde(default)]
    pub backoff: BackoffConfig,
    /// Completed jobs kept for inspection (0 removes them on completion).
    #[serde(default)]
    pub keep_completed: usize,
    /// Failed-terminal jobs kept for inspection, oldest evicted first.
    #[serde(default = "default_keep_failed")]
    pub keep_failed: usize,
    /// Active jobs older than this are considered abandoned by a dead worker.
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout_seconds: u64,
}

impl QueueConfig {
    /// Every queue a worker should consume, in priority order.
    pub fn queues(&self) -> Vec<String> {
        vec![self.generation_queue.clone(), self.artifact_queue.clone()]
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            generation_queue: default_generation_queue(),
            artifact_queue: default_artifact_queue(),
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
            keep_completed: 0,
            keep_failed: default_keep_failed(),
            stall_timeout_seconds: default_stall_timeout(),
        }
    }
}

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Constant delay.
    Fixed,
    /// Delay doubling with each attempt.
    Exponential,
}

/// Backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Strategy.
    #[serde(default = "default_backoff_kind")]
    pub kind: BackoffKind,
    /// Base delay in milliseconds.
    #[serde(default = "default_backoff_delay")]
    pub delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            kind: default_backoff_kind(),
            delay_ms: default_backoff_delay(),
        }
    }
}

fn default_generation_queue() -> String {
    "thesis-generation".to_string()
}

fn default_artifact_queue() -> String {
    "thesis-artifacts".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_keep_failed() -> usize {
    100
}

fn default_stall_timeout() -> u64 {
    1800
}

fn default_backoff_kind() -> BackoffKind {
    BackoffKind::Exponential
}

fn default_backoff_delay() -> u64 {
    5000
}
