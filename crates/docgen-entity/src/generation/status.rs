//! Coarse generation status of a thesis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the most recent generation request for a thesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "generation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Accepted and queued, no worker has started yet.
    Pending,
    /// A worker owns the generation.
    Processing,
    /// The document artifact was persisted.
    Completed,
    /// Generation failed terminally.
    Failed,
}

impl GenerationStatus {
    /// Pending or processing: a new request must not be enqueued.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Completed or failed.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
