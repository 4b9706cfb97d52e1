//! Generation intake: status guard first, then the durable queue.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use docgen_core::error::{AppError, ErrorKind};
use docgen_core::result::AppResult;
use docgen_core::types::{JobId, ThesisId};
use docgen_database::{StatusStore, ThesisStore};
use docgen_entity::generation::StatusRecord;
use docgen_entity::job::{GenerationParams, JobKind, QuizParams, SearchQueryParams};
use docgen_entity::thesis::Thesis;
use docgen_worker::{EnqueueRequest, JobQueue};

/// Result of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    /// A new job was queued and the status record is `pending`.
    Enqueued {
        /// The queued job.
        job_id: JobId,
        /// The freshly claimed record.
        status: StatusRecord,
    },
    /// Another job is pending or processing for the thesis.
    AlreadyInProgress(StatusRecord),
    /// Content exists and regeneration was not requested.
    AlreadyCompleted {
        /// Version the current content came from.
        current_version: Option<i32>,
    },
}

/// Result of a quiz or search query request.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactOutcome {
    /// The artifact already exists; no job was queued.
    Existing(serde_json::Value),
    /// A generation job was queued.
    Enqueued(JobId),
}

/// Accepts generation requests and hands them to the queue.
#[derive(Debug, Clone)]
pub struct GenerationService {
    status: Arc<dyn StatusStore>,
    theses: Arc<dyn ThesisStore>,
    queue: Arc<JobQueue>,
}

impl GenerationService {
    /// Creates a new generation service.
    pub fn new(
        status: Arc<dyn StatusStore>,
        theses: Arc<dyn ThesisStore>,
        queue: Arc<JobQueue>,
    ) -> Self {
        Self {
            status,
            theses,
            queue,
        }
    }

    /// Queue a document generation for `thesis_id`.
    ///
    /// The status record is claimed with a compare-and-set before the job
    /// is written, so two concurrent requests for one thesis never both
    /// reach the queue. A claim whose enqueue fails is reverted to `failed`.
    pub async fn request_generation(
        &self,
        thesis_id: ThesisId,
        params: GenerationParams,
    ) -> AppResult<IntakeOutcome> {
        params.validate()?;

        if !params.regenerate
            && let Some(thesis) = self.theses.find(thesis_id).await?
            && thesis.existing_content().is_some()
        {
            info!(thesis_id = %thesis_id, "Document already exists, not enqueuing");
            return Ok(IntakeOutcome::AlreadyCompleted {
                current_version: thesis.current_version,
            });
        }

        let job_id = JobId::new();
        let status = match self.status.claim_pending(thesis_id, job_id).await {
            Ok(record) => record,
            Err(e) if e.is(ErrorKind::AlreadyInProgress) => {
                let existing = self.status.get(thesis_id).await?.ok_or(e)?;
                info!(
                    thesis_id = %thesis_id,
                    status = existing.status.as_str(),
                    "Generation already in progress"
                );
                return Ok(IntakeOutcome::AlreadyInProgress(existing));
            }
            Err(e) => return Err(e),
        };

        let payload = serde_json::to_value(&params)?;
        let request =
            EnqueueRequest::new(JobKind::ThesisGeneration, thesis_id, payload).with_id(job_id);
        if let Err(e) = self.queue.enqueue(request).await {
            warn!(thesis_id = %thesis_id, job_id = %job_id, "Enqueue failed, reverting status: {}", e);
            if let Err(revert) = self
                .status
                .revert_pending(thesis_id, job_id, &format!("Failed to queue generation: {e}"))
                .await
            {
                warn!(thesis_id = %thesis_id, "Failed to revert pending status: {}", revert);
            }
            return Err(e);
        }

        info!(thesis_id = %thesis_id, job_id = %job_id, "Generation enqueued");
        Ok(IntakeOutcome::Enqueued { job_id, status })
    }

    /// Return the existing quiz or queue its generation.
    pub async fn request_quiz(
        &self,
        thesis_id: ThesisId,
        params: QuizParams,
    ) -> AppResult<ArtifactOutcome> {
        if params.question_count == 0 {
            return Err(AppError::validation("questionCount must be positive"));
        }
        let thesis = self.require_content(thesis_id).await?;
        if let Some(quiz) = thesis.existing_quiz() {
            info!(thesis_id = %thesis_id, "Quiz already exists");
            return Ok(ArtifactOutcome::Existing(quiz.clone()));
        }
        self.enqueue_artifact(JobKind::QuizGeneration, thesis_id, json!(params))
            .await
    }

    /// Return the existing search queries or queue their generation.
    pub async fn request_search_queries(
        &self,
        thesis_id: ThesisId,
        params: SearchQueryParams,
    ) -> AppResult<ArtifactOutcome> {
        if params.query_count == 0 {
            return Err(AppError::validation("queryCount must be positive"));
        }
        let thesis = self.require_content(thesis_id).await?;
        if let Some(queries) = thesis.existing_search_queries() {
            info!(thesis_id = %thesis_id, "Search queries already exist");
            return Ok(ArtifactOutcome::Existing(queries.clone()));
        }
        self.enqueue_artifact(JobKind::SearchQueryGeneration, thesis_id, json!(params))
            .await
    }

    async fn require_content(&self, thesis_id: ThesisId) -> AppResult<Thesis> {
        let thesis = self
            .theses
            .find(thesis_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Thesis {thesis_id} not found")))?;
        if thesis.existing_content().is_none() {
            return Err(AppError::validation(format!(
                "Thesis {thesis_id} has no generated content yet"
            )));
        }
        Ok(thesis)
    }

    async fn enqueue_artifact(
        &self,
        kind: JobKind,
        thesis_id: ThesisId,
        payload: serde_json::Value,
    ) -> AppResult<ArtifactOutcome> {
        let job = self
            .queue
            .enqueue(EnqueueRequest::new(kind, thesis_id, payload))
            .await?;
        info!(thesis_id = %thesis_id, job_id = %job.id, kind = %kind, "Artifact generation enqueued");
        Ok(ArtifactOutcome::Enqueued(job.id))
    }
}
