//! Generation status repository.
//!
//! Compare-and-set transitions are single `INSERT .. ON CONFLICT DO UPDATE
//! .. WHERE` statements; an empty `RETURNING` means the guard rejected the
//! transition.

use async_trait::async_trait;
use sqlx::PgPool;

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::types::{JobId, ThesisId};
use docgen_entity::generation::StatusRecord;

use crate::error::map_sqlx;
use crate::store::StatusStore;

/// Repository for the `generation_status` table.
#[derive(Debug, Clone)]
pub struct StatusRepository {
    pool: PgPool,
}

impl StatusRepository {
    /// Create a new status repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for StatusRepository {
    async fn get(&self, thesis_id: ThesisId) -> AppResult<Option<StatusRecord>> {
        sqlx::query_as::<_, StatusRecord>("SELECT * FROM generation_status WHERE thesis_id = $1")
            .bind(thesis_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx("Failed to load generation status", e))
    }

    async fn claim_pending(&self, thesis_id: ThesisId, job_id: JobId) -> AppResult<StatusRecord> {
        sqlx::query_as::<_, StatusRecord>(
            "INSERT INTO generation_status (thesis_id, status, job_id, created_at, updated_at) \
             VALUES ($1, 'pending', $2, NOW(), NOW()) \
             ON CONFLICT (thesis_id) DO UPDATE SET \
                status = 'pending', job_id = EXCLUDED.job_id, operation_name = NULL, \
                error_message = NULL, completed_at = NULL, updated_at = NOW() \
             WHERE generation_status.status IN ('completed', 'failed') \
             RETURNING *",
        )
        .bind(thesis_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to claim generation status", e))?
        .ok_or_else(|| {
            AppError::already_in_progress(format!(
                "Generation for thesis {thesis_id} is already pending or processing"
            ))
        })
    }

    async fn begin_processing(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
    ) -> AppResult<StatusRecord> {
        sqlx::query_as::<_, StatusRecord>(
            "INSERT INTO generation_status (thesis_id, status, job_id, created_at, updated_at) \
             VALUES ($1, 'processing', $2, NOW(), NOW()) \
             ON CONFLICT (thesis_id) DO UPDATE SET \
                status = 'processing', job_id = EXCLUDED.job_id, completed_at = NULL, \
                operation_name = CASE WHEN generation_status.job_id = EXCLUDED.job_id \
                    THEN generation_status.operation_name ELSE NULL END, \
                updated_at = NOW() \
             WHERE generation_status.status <> 'processing' \
                OR generation_status.job_id = EXCLUDED.job_id \
             RETURNING *",
        )
        .bind(thesis_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to start processing", e))?
        .ok_or_else(|| {
            AppError::already_in_progress(format!(
                "Thesis {thesis_id} is being processed by another job"
            ))
        })
    }

    async fn attach_operation(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        operation: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE generation_status SET operation_name = $3, updated_at = NOW() \
             WHERE thesis_id = $1 AND job_id = $2",
        )
        .bind(thesis_id)
        .bind(job_id)
        .bind(operation)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to attach operation", e))?;
        Ok(())
    }

    async fn record_attempt_error(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        message: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE generation_status SET error_message = $3, updated_at = NOW() \
             WHERE thesis_id = $1 AND job_id = $2",
        )
        .bind(thesis_id)
        .bind(job_id)
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to record attempt error", e))?;
        Ok(())
    }

    async fn complete(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        artifact: &serde_json::Value,
    ) -> AppResult<StatusRecord> {
        sqlx::query_as::<_, StatusRecord>(
            "INSERT INTO generation_status \
                (thesis_id, status, job_id, artifact, created_at, updated_at, completed_at) \
             VALUES ($1, 'completed', $2, $3, NOW(), NOW(), NOW()) \
             ON CONFLICT (thesis_id) DO UPDATE SET \
                status = 'completed', job_id = EXCLUDED.job_id, artifact = EXCLUDED.artifact, \
                error_message = NULL, updated_at = NOW(), completed_at = NOW() \
             RETURNING *",
        )
        .bind(thesis_id)
        .bind(job_id)
        .bind(artifact)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to complete generation status", e))
    }

    async fn fail(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        message: &str,
    ) -> AppResult<StatusRecord> {
        sqlx::query_as::<_, StatusRecord>(
            "INSERT INTO generation_status \
                (thesis_id, status, job_id, error_message, created_at, updated_at) \
             VALUES ($1, 'failed', $2, $3, NOW(), NOW()) \
             ON CONFLICT (thesis_id) DO UPDATE SET \
                status = 'failed', job_id = EXCLUDED.job_id, \
                error_message = EXCLUDED.error_message, updated_at = NOW() \
             RETURNING *",
        )
        .bind(thesis_id)
        .bind(job_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to fail generation status", e))
    }

    async fn revert_pending(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        message: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE generation_status SET status = 'failed', error_message = $3, updated_at = NOW() \
             WHERE thesis_id = $1 AND job_id = $2 AND status = 'pending'",
        )
        .bind(thesis_id)
        .bind(job_id)
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("Failed to revert pending status", e))?;
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| map_sqlx("Health check failed", e))
    }
}
