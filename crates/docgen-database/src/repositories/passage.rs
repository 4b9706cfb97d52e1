//! Passage similarity search backed by pgvector.

use async_trait::async_trait;
use sqlx::PgPool;

use docgen_core::result::AppResult;
use docgen_core::types::ThesisId;
use docgen_entity::thesis::Passage;

use crate::error::map_sqlx;
use crate::store::PassageIndex;

/// Repository calling the `match_source_chunks` database function.
#[derive(Debug, Clone)]
pub struct PassageRepository {
    pool: PgPool,
}

impl PassageRepository {
    /// Create a new passage repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PassageIndex for PassageRepository {
    async fn search(
        &self,
        thesis_id: ThesisId,
        embedding: &[f32],
        limit: u32,
        threshold: f64,
    ) -> AppResult<Vec<Passage>> {
        sqlx::query_as::<_, Passage>(
            "SELECT id, content, similarity, metadata \
             FROM match_source_chunks($1, $2::real[]::vector, $3, $4)",
        )
        .bind(thesis_id)
        .bind(embedding)
        .bind(limit as i32)
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to search passages", e))
    }
}
