//! Job status and kind enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// In the wait list, ready for a worker.
    Queued,
    /// Waiting for its backoff delay before re-delivery.
    Delayed,
    /// Claimed by a worker.
    Active,
    /// Finished successfully.
    Completed,
    /// Exhausted its attempts or failed permanently.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Delayed => "delayed",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of work a job performs. Handlers are registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Generate the thesis document.
    ThesisGeneration,
    /// Generate a quiz from the thesis content.
    QuizGeneration,
    /// Generate literature search queries for the thesis.
    SearchQueryGeneration,
}

impl JobKind {
    /// Return the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThesisGeneration => "thesis_generation",
            Self::QuizGeneration => "quiz_generation",
            Self::SearchQueryGeneration => "search_query_generation",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
