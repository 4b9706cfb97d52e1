//! Persisted status record.

use chrono::{DateTime, Utc};
use docgen_core::types::{JobId, ThesisId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::GenerationStatus;

/// Durable projection of a thesis' generation state.
///
/// One row per thesis. Only the worker moves a record into `processing`
/// or a terminal state; intake only creates `pending` records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StatusRecord {
    /// The thesis.
    pub thesis_id: ThesisId,
    /// Coarse status.
    pub status: GenerationStatus,
    /// Job that owns the current generation.
    pub job_id: Option<JobId>,
    /// Provider operation being awaited, if any.
    pub operation_name: Option<String>,
    /// Last error (terminal failure or most recent failed attempt).
    pub error_message: Option<String>,
    /// Reference to the produced artifact on success.
    pub artifact: Option<serde_json::Value>,
    /// When the record was first created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
    /// When the record reached `completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusRecord {
    /// A fresh record in the given status.
    pub fn new(thesis_id: ThesisId, status: GenerationStatus, job_id: JobId) -> Self {
        let now = Utc::now();
        Self {
            thesis_id,
            status,
            job_id: Some(job_id),
            operation_name: None,
            error_message: None,
            artifact: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Whether `job_id` owns this record.
    pub fn is_owned_by(&self, job_id: JobId) -> bool {
        self.job_id == Some(job_id)
    }
}
