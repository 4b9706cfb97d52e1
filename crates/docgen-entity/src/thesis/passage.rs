//! Semantic search results.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A passage of an indexed source ranked by similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Passage {
    /// Chunk identifier.
    pub id: Uuid,
    /// Passage text.
    pub content: String,
    /// Similarity to the query embedding (higher is closer).
    pub similarity: f64,
    /// Source metadata (title, page...).
    pub metadata: Option<serde_json::Value>,
}
