//! Content snapshots.

use chrono::{DateTime, Utc};
use docgen_core::types::{ThesisId, VersionId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An immutable snapshot of thesis content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ThesisVersion {
    /// Unique identifier.
    pub id: VersionId,
    /// The thesis.
    pub thesis_id: ThesisId,
    /// Sequential number per thesis, starting at 1.
    pub version_number: i32,
    /// Snapshot content.
    pub content: String,
    /// What produced the snapshot.
    pub comment: Option<String>,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
}
