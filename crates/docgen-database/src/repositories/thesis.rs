//! Thesis and version repository.

use async_trait::async_trait;
use sqlx::PgPool;

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::types::{ThesisId, VersionId};
use docgen_entity::thesis::{Thesis, ThesisVersion};

use crate::error::map_sqlx;
use crate::store::ThesisStore;

/// Repository for `theses` and `thesis_versions`.
#[derive(Debug, Clone)]
pub struct ThesisRepository {
    pool: PgPool,
}

impl ThesisRepository {
    /// Create a new thesis repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn update_json(
        &self,
        id: ThesisId,
        column: &'static str,
        value: &serde_json::Value,
    ) -> AppResult<()> {
        let sql = format!("UPDATE theses SET {column} = $2, updated_at = NOW() WHERE id = $1");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("Failed to update thesis", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Thesis {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl ThesisStore for ThesisRepository {
    async fn find(&self, id: ThesisId) -> AppResult<Option<Thesis>> {
        sqlx::query_as::<_, Thesis>("SELECT * FROM theses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("Failed to find thesis", e))
    }

    async fn save_content(
        &self,
        id: ThesisId,
        title: &str,
        content: &str,
        citations: &serde_json::Value,
        comment: &str,
    ) -> AppResult<ThesisVersion> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx("Failed to begin transaction", e))?;

        sqlx::query(
            "INSERT INTO theses (id, title, created_at, updated_at) VALUES ($1, $2, NOW(), NOW()) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(title)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx("Failed to create thesis", e))?;

        // Row lock serializes version numbering per thesis.
        sqlx::query("SELECT id FROM theses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx("Failed to lock thesis", e))?;

        let version = sqlx::query_as::<_, ThesisVersion>(
            "INSERT INTO thesis_versions (id, thesis_id, version_number, content, comment, created_at) \
             SELECT $1, $2, COALESCE(MAX(version_number), 0) + 1, $3, $4, NOW() \
             FROM thesis_versions WHERE thesis_id = $2 \
             RETURNING *",
        )
        .bind(VersionId::new())
        .bind(id)
        .bind(content)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx("Failed to create thesis version", e))?;

        sqlx::query(
            "UPDATE theses SET content = $2, citations = $3, current_version = $4, \
                quiz_data = NULL, search_queries = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(content)
        .bind(citations)
        .bind(version.version_number)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx("Failed to store thesis content", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx("Failed to commit thesis content", e))?;
        Ok(version)
    }

    async fn save_quiz(&self, id: ThesisId, quiz: &serde_json::Value) -> AppResult<()> {
        self.update_json(id, "quiz_data", quiz).await
    }

    async fn save_search_queries(
        &self,
        id: ThesisId,
        queries: &serde_json::Value,
    ) -> AppResult<()> {
        self.update_json(id, "search_queries", queries).await
    }

    async fn list_versions(&self, id: ThesisId) -> AppResult<Vec<ThesisVersion>> {
        sqlx::query_as::<_, ThesisVersion>(
            "SELECT * FROM thesis_versions WHERE thesis_id = $1 ORDER BY version_number DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to list thesis versions", e))
    }

    async fn find_version(&self, id: ThesisId, number: i32) -> AppResult<Option<ThesisVersion>> {
        sqlx::query_as::<_, ThesisVersion>(
            "SELECT * FROM thesis_versions WHERE thesis_id = $1 AND version_number = $2",
        )
        .bind(id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to find thesis version", e))
    }

    async fn restore_version(&self, id: ThesisId, number: i32) -> AppResult<Thesis> {
        sqlx::query_as::<_, Thesis>(
            "UPDATE theses t SET content = v.content, current_version = v.version_number, \
                updated_at = NOW() \
             FROM thesis_versions v \
             WHERE t.id = $1 AND v.thesis_id = t.id AND v.version_number = $2 \
             RETURNING t.*",
        )
        .bind(id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to restore thesis version", e))?
        .ok_or_else(|| AppError::not_found(format!("Version {number} of thesis {id} not found")))
    }
}
