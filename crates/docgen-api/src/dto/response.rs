//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docgen_core::types::{JobId, ThesisId};
use docgen_entity::generation::{GenerationStatus, StatusRecord};
use docgen_entity::thesis::{Thesis, ThesisVersion};
use docgen_provider::OperationSnapshot;

/// Status record as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Thesis id.
    pub domain_id: ThesisId,
    /// Coarse status.
    pub status: GenerationStatus,
    /// Owning job.
    pub job_id: Option<JobId>,
    /// Provider operation being awaited.
    pub operation_name: Option<String>,
    /// Last error.
    pub error: Option<String>,
    /// Artifact reference on success.
    pub artifact: Option<serde_json::Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<StatusRecord> for StatusResponse {
    fn from(record: StatusRecord) -> Self {
        Self {
            domain_id: record.thesis_id,
            status: record.status,
            job_id: record.job_id,
            operation_name: record.operation_name,
            error: record.error_message,
            artifact: record.artifact,
            created_at: record.created_at,
            updated_at: record.updated_at,
            completed_at: record.completed_at,
        }
    }
}

/// Result of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationAccepted {
    /// Queued job, `null` when nothing was queued.
    pub job_id: Option<JobId>,
    /// Status after the request.
    pub status: GenerationStatus,
    /// The existing record when a generation was already running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<StatusResponse>,
    /// Current content version when the document already existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<i32>,
}

/// Result of a quiz or search query request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactResponse {
    /// Queued job, `null` when the artifact already existed.
    pub job_id: Option<JobId>,
    /// The existing artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Body of a bounded poll that ran out of time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollTimeoutResponse {
    /// Always `TIMEOUT`.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Last snapshot seen before giving up.
    pub snapshot: Option<OperationSnapshot>,
    /// Time spent waiting.
    pub elapsed_ms: u64,
}

/// Thesis content after a rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThesisResponse {
    /// Thesis id.
    pub domain_id: ThesisId,
    /// Title.
    pub title: String,
    /// Current content.
    pub content: Option<String>,
    /// Version the content came from.
    pub current_version: Option<i32>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl From<Thesis> for ThesisResponse {
    fn from(thesis: Thesis) -> Self {
        Self {
            domain_id: thesis.id,
            title: thesis.title,
            content: thesis.content,
            current_version: thesis.current_version,
            updated_at: thesis.updated_at,
        }
    }
}

/// One entry of a version listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    /// Version number.
    pub version_number: i32,
    /// Change comment.
    pub comment: Option<String>,
    /// Words in the snapshot.
    pub word_count: usize,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
}

impl From<ThesisVersion> for VersionResponse {
    fn from(version: ThesisVersion) -> Self {
        Self {
            version_number: version.version_number,
            comment: version.comment,
            word_count: version.content.split_whitespace().count(),
            created_at: version.created_at,
        }
    }
}

/// Health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Readiness report with per-dependency checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// `ready` or `unavailable`.
    pub status: String,
    /// Job record store reachable.
    pub store: bool,
    /// Message broker reachable.
    pub broker: bool,
}
