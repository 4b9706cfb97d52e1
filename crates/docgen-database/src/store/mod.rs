//! Store traits and backend selection.
//!
//! Workers and services hold `Arc<dyn ...>` handles so tests can swap in
//! the in-memory implementations.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use docgen_core::config::DatabaseConfig;
use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::types::{JobId, ThesisId};
use docgen_entity::generation::StatusRecord;
use docgen_entity::thesis::{Passage, Thesis, ThesisVersion};

use crate::connection::DatabasePool;
use crate::migration::run_migrations;
use crate::repositories::{PassageRepository, StatusRepository, ThesisRepository};

use self::memory::{MemoryPassageIndex, MemoryStatusStore, MemoryThesisStore};

/// Generation status records, one per thesis.
///
/// Transitions into `pending` and `processing` are compare-and-set: they
/// fail with `AlreadyInProgress` instead of overwriting a record another
/// job owns. Terminal transitions are last-write-wins.
#[async_trait]
pub trait StatusStore: Send + Sync + std::fmt::Debug + 'static {
    /// Current record of a thesis.
    async fn get(&self, thesis_id: ThesisId) -> AppResult<Option<StatusRecord>>;

    /// Create or reset the record to `pending` for a newly enqueued job.
    ///
    /// Succeeds only when no record exists or the existing one is terminal.
    async fn claim_pending(&self, thesis_id: ThesisId, job_id: JobId) -> AppResult<StatusRecord>;

    /// Move the record into `processing` for `job_id`.
    ///
    /// Allowed from any non-processing state, or when `job_id` already owns
    /// the processing record (a retry or continuation of the same job).
    async fn begin_processing(&self, thesis_id: ThesisId, job_id: JobId)
    -> AppResult<StatusRecord>;

    /// Remember the provider operation the owning job is waiting on.
    async fn attach_operation(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        operation: &str,
    ) -> AppResult<()>;

    /// Record the error of a failed attempt that will be retried.
    async fn record_attempt_error(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        message: &str,
    ) -> AppResult<()>;

    /// Mark the generation completed with a reference to its artifact.
    async fn complete(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        artifact: &serde_json::Value,
    ) -> AppResult<StatusRecord>;

    /// Mark the generation failed.
    async fn fail(&self, thesis_id: ThesisId, job_id: JobId, message: &str)
    -> AppResult<StatusRecord>;

    /// Fail a `pending` record whose job never reached the queue.
    async fn revert_pending(&self, thesis_id: ThesisId, job_id: JobId, message: &str)
    -> AppResult<()>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Thesis content, versions, and derived artifacts.
#[async_trait]
pub trait ThesisStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a thesis by id.
    async fn find(&self, id: ThesisId) -> AppResult<Option<Thesis>>;

    /// Store generated content as a new version and make it current.
    ///
    /// Creates the thesis row when it does not exist yet. The quiz and
    /// search queries of the previous content are cleared.
    async fn save_content(
        &self,
        id: ThesisId,
        title: &str,
        content: &str,
        citations: &serde_json::Value,
        comment: &str,
    ) -> AppResult<ThesisVersion>;

    /// Store a generated quiz.
    async fn save_quiz(&self, id: ThesisId, quiz: &serde_json::Value) -> AppResult<()>;

    /// Store generated search queries.
    async fn save_search_queries(&self, id: ThesisId, queries: &serde_json::Value)
    -> AppResult<()>;

    /// All versions of a thesis, newest first.
    async fn list_versions(&self, id: ThesisId) -> AppResult<Vec<ThesisVersion>>;

    /// One version by number.
    async fn find_version(&self, id: ThesisId, number: i32) -> AppResult<Option<ThesisVersion>>;

    /// Make a stored version the current content.
    ///
    /// Restoring the same version again yields identical content.
    async fn restore_version(&self, id: ThesisId, number: i32) -> AppResult<Thesis>;
}

/// Similarity search over indexed source passages of a thesis.
#[async_trait]
pub trait PassageIndex: Send + Sync + std::fmt::Debug + 'static {
    /// Passages ranked by similarity to `embedding`, at most `limit`,
    /// none below `threshold`.
    async fn search(
        &self,
        thesis_id: ThesisId,
        embedding: &[f32],
        limit: u32,
        threshold: f64,
    ) -> AppResult<Vec<Passage>>;
}

/// The set of stores used by services and workers.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Generation status records.
    pub status: Arc<dyn StatusStore>,
    /// Thesis artifacts and versions.
    pub theses: Arc<dyn ThesisStore>,
    /// Passage search.
    pub passages: Arc<dyn PassageIndex>,
    /// Underlying pool when backed by PostgreSQL.
    pub pool: Option<DatabasePool>,
}

impl Stores {
    /// Open the stores selected by `config.backend`.
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend.as_str() {
            "postgres" => {
                let db = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(db.pool()).await?;
                }
                info!("Job record store: PostgreSQL");
                Ok(Self {
                    status: Arc::new(StatusRepository::new(db.pool().clone())),
                    theses: Arc::new(ThesisRepository::new(db.pool().clone())),
                    passages: Arc::new(PassageRepository::new(db.pool().clone())),
                    pool: Some(db),
                })
            }
            "memory" => {
                info!("Job record store: in-memory");
                Ok(Self::in_memory())
            }
            other => Err(AppError::configuration(format!(
                "Unknown database backend: {other}"
            ))),
        }
    }

    /// In-memory stores for tests and single-process development.
    pub fn in_memory() -> Self {
        Self {
            status: Arc::new(MemoryStatusStore::new()),
            theses: Arc::new(MemoryThesisStore::new()),
            passages: Arc::new(MemoryPassageIndex::new()),
            pool: None,
        }
    }
}
