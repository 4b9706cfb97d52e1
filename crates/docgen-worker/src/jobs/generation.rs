//! Thesis document generation.
//!
//! One attempt walks `received → validating → awaiting-provider →
//! persisting-success | persisting-failure → done`. Every transition is
//! logged with the job and thesis ids.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use docgen_core::error::ErrorKind;
use docgen_core::result::AppResult;
use docgen_database::{StatusStore, ThesisStore};
use docgen_entity::job::{GenerationParams, Job, JobKind, QuizParams, SearchQueryParams};
use docgen_entity::thesis::{Citation, DocumentArtifact, Thesis};
use docgen_provider::response::parse_document;
use docgen_provider::{GenerationRequest, QualityChecker, prompt, quality};

use crate::executor::{JobExecutionError, JobHandler};
use crate::jobs::provider::{ProviderCall, Started};
use crate::queue::{EnqueueRequest, JobQueue};

/// Generates the thesis document and triggers the follow-up artifacts.
#[derive(Debug)]
pub struct ThesisGenerationHandler {
    status: Arc<dyn StatusStore>,
    theses: Arc<dyn ThesisStore>,
    provider: ProviderCall,
    queue: Arc<JobQueue>,
    checker: QualityChecker,
}

impl ThesisGenerationHandler {
    /// Create a new generation handler.
    pub fn new(
        status: Arc<dyn StatusStore>,
        theses: Arc<dyn ThesisStore>,
        provider: ProviderCall,
        queue: Arc<JobQueue>,
    ) -> Self {
        Self {
            status,
            theses,
            provider,
            queue,
            checker: QualityChecker::new(),
        }
    }

    fn stage(job: &Job, stage: &'static str) {
        info!(job_id = %job.id, thesis_id = %job.thesis_id, attempt = job.attempts, stage, "Generation stage");
    }

    /// Build the artifact reference of content that already exists.
    fn existing_artifact(
        &self,
        thesis: &Thesis,
        content: &str,
        params: &GenerationParams,
    ) -> DocumentArtifact {
        let citations: Vec<Citation> = thesis
            .citations
            .clone()
            .and_then(|c| serde_json::from_value(c).ok())
            .unwrap_or_default();
        DocumentArtifact {
            version_number: thesis.current_version.unwrap_or(0),
            word_count: quality::count_words(content),
            citation_count: citations.len(),
            quality: self.checker.check(content, params, &citations),
        }
    }

    /// Record a failed attempt on the status record, best effort.
    async fn note_attempt_error(&self, job: &Job, err: &JobExecutionError) {
        Self::stage(job, "persisting-failure");
        let message = err.to_string();
        if let Err(e) = self
            .status
            .record_attempt_error(job.thesis_id, job.id, &message)
            .await
        {
            warn!(job_id = %job.id, "Failed to record attempt error: {}", e);
        }
    }

    /// Queue quiz and search query generation for a finished document.
    async fn enqueue_follow_ups(&self, job: &Job) {
        let follow_ups = [
            (JobKind::QuizGeneration, json!(QuizParams::default())),
            (
                JobKind::SearchQueryGeneration,
                json!(SearchQueryParams::default()),
            ),
        ];
        for (kind, payload) in follow_ups {
            match self
                .queue
                .enqueue(EnqueueRequest::new(kind, job.thesis_id, payload))
                .await
            {
                Ok(follow_up) => {
                    info!(job_id = %job.id, follow_up_id = %follow_up.id, kind = %kind, "Follow-up job enqueued")
                }
                Err(e) => warn!(job_id = %job.id, kind = %kind, "Failed to enqueue follow-up job: {}", e),
            }
        }
    }

    /// Provider text → parsed, checked and persisted document.
    async fn persist(
        &self,
        job: &Job,
        params: &GenerationParams,
        text: &str,
    ) -> Result<Value, JobExecutionError> {
        let document =
            parse_document(text).map_err(|e| JobExecutionError::Transient(e.to_string()))?;
        let quality = self
            .checker
            .check(&document.content, params, &document.citations);
        if !quality.valid {
            warn!(job_id = %job.id, errors = ?quality.errors, "Generated document failed quality checks");
        }

        let citations = serde_json::to_value(&document.citations)
            .map_err(|e| JobExecutionError::Internal(e.into()))?;
        let version = self
            .theses
            .save_content(
                job.thesis_id,
                &params.title,
                &document.content,
                &citations,
                &format!("Generated by job {}", job.id),
            )
            .await?;

        let artifact = DocumentArtifact {
            version_number: version.version_number,
            word_count: quality.word_count,
            citation_count: document.citations.len(),
            quality,
        };
        let artifact = serde_json::to_value(&artifact)
            .map_err(|e| JobExecutionError::Internal(e.into()))?;
        self.status
            .complete(job.thesis_id, job.id, &artifact)
            .await?;
        Ok(artifact)
    }

    async fn run(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        Self::stage(job, "received");

        Self::stage(job, "validating");
        let params: GenerationParams = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobExecutionError::Permanent(format!("Invalid generation payload: {e}")))?;
        params
            .validate()
            .map_err(|e| JobExecutionError::Permanent(e.message))?;

        if !params.regenerate
            && let Some(thesis) = self.theses.find(job.thesis_id).await?
            && let Some(content) = thesis.existing_content()
        {
            info!(job_id = %job.id, thesis_id = %job.thesis_id, "Document already exists, skipping generation");
            let artifact = serde_json::to_value(self.existing_artifact(&thesis, content, &params))
                .map_err(|e| JobExecutionError::Internal(e.into()))?;
            self.status
                .complete(job.thesis_id, job.id, &artifact)
                .await?;
            Self::stage(job, "done");
            return Ok(Some(json!({ "skipped": true, "artifact": artifact })));
        }

        match self.status.begin_processing(job.thesis_id, job.id).await {
            Ok(_) => {}
            Err(e) if e.is(ErrorKind::AlreadyInProgress) => {
                info!(job_id = %job.id, thesis_id = %job.thesis_id, "Another job is processing this thesis, skipping");
                return Ok(Some(json!({ "skipped": true, "reason": "already_in_progress" })));
            }
            Err(e) => return Err(e.into()),
        }

        Self::stage(job, "awaiting-provider");
        let started = self
            .provider
            .start(job, || GenerationRequest::json(prompt::document_prompt(&params)))
            .await?;
        let text = match started {
            Started::Text(text) => text,
            Started::Operation { handle, resumed } => {
                if resumed {
                    info!(job_id = %job.id, operation = %handle, "Resuming provider operation");
                } else {
                    self.status
                        .attach_operation(job.thesis_id, job.id, handle.name())
                        .await?;
                }
                self.provider.wait(&handle).await?
            }
        };

        Self::stage(job, "persisting-success");
        let artifact = self.persist(job, &params, &text).await?;
        self.enqueue_follow_ups(job).await;

        Self::stage(job, "done");
        Ok(Some(artifact))
    }
}

#[async_trait]
impl JobHandler for ThesisGenerationHandler {
    fn kind(&self) -> JobKind {
        JobKind::ThesisGeneration
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let result = self.run(job).await;
        if let Err(err) = &result {
            self.note_attempt_error(job, err).await;
        }
        result
    }

    async fn on_terminal_failure(&self, job: &Job, reason: &str) -> AppResult<()> {
        self.status.fail(job.thesis_id, job.id, reason).await?;
        Self::stage(job, "done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use docgen_broker::BrokerManager;
    use docgen_broker::memory::MemoryQueueBroker;
    use docgen_core::config::{BackoffConfig, BackoffKind, QueueConfig};
    use docgen_core::types::{JobId, ThesisId};
    use docgen_database::Stores;
    use docgen_entity::generation::GenerationStatus;
    use docgen_entity::job::JobStatus;
    use docgen_provider::{
        Generation, GenerationProvider, OperationClient, OperationHandle, OperationPoller,
        OperationRef, OperationSnapshot, ProviderError,
    };

    use super::*;
    use crate::executor::JobExecutor;
    use crate::runner::process_job;

    const OPERATION: &str = "operations/op-1";

    /// Always starts the same long-running operation.
    #[derive(Debug, Default)]
    struct PendingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationProvider for PendingProvider {
        async fn generate(&self, _request: GenerationRequest) -> Result<Generation, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Generation::Pending(OperationHandle::new(OPERATION)))
        }
    }

    /// Replays scripted snapshots, then reports "still running".
    #[derive(Debug, Default)]
    struct ScriptedOperations {
        replies: Mutex<VecDeque<OperationSnapshot>>,
        expired: bool,
    }

    #[async_trait]
    impl OperationClient for ScriptedOperations {
        async fn get_operation(
            &self,
            _operation: OperationRef<'_>,
        ) -> Result<OperationSnapshot, ProviderError> {
            if self.expired {
                return Err(ProviderError::NotFound(OPERATION.to_string()));
            }
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| OperationSnapshot::running(OPERATION)))
        }
    }

    struct Harness {
        queue: Arc<JobQueue>,
        executor: JobExecutor,
        stores: Stores,
        provider: Arc<PendingProvider>,
    }

    fn harness(max_attempts: u32, operations: ScriptedOperations) -> Harness {
        let config = QueueConfig {
            max_attempts,
            backoff: BackoffConfig {
                kind: BackoffKind::Fixed,
                delay_ms: 0,
            },
            ..QueueConfig::default()
        };
        let queue = Arc::new(JobQueue::new(
            BrokerManager::from_broker(Arc::new(MemoryQueueBroker::new())),
            config,
        ));
        let stores = Stores::in_memory();
        let provider = Arc::new(PendingProvider::default());
        let poller = OperationPoller::new(Arc::new(operations), Duration::from_millis(2000));
        let call = ProviderCall::new(provider.clone(), poller, Duration::from_secs(5));

        let mut executor = JobExecutor::new();
        executor.register(Arc::new(ThesisGenerationHandler::new(
            stores.status.clone(),
            stores.theses.clone(),
            call,
            queue.clone(),
        )));

        Harness {
            queue,
            executor,
            stores,
            provider,
        }
    }

    fn params() -> Value {
        json!({
            "title": "Remote work and productivity",
            "researchQuestion": "Does remote work change output?",
            "outline": [{ "title": "Introduction" }],
            "specifications": { "targetLength": 1000, "lengthUnit": "words" }
        })
    }

    impl Harness {
        async fn submit(&self, thesis_id: ThesisId) -> JobId {
            let job_id = JobId::new();
            self.stores
                .status
                .claim_pending(thesis_id, job_id)
                .await
                .unwrap();
            self.queue
                .enqueue(
                    EnqueueRequest::new(JobKind::ThesisGeneration, thesis_id, params())
                        .with_id(job_id),
                )
                .await
                .unwrap();
            job_id
        }

        async fn work_once(&self) {
            let generation = self.queue.config().generation_queue.clone();
            let job = self.queue.dequeue(&[generation]).await.unwrap().unwrap();
            process_job(&self.queue, &self.executor, job).await;
        }

        async fn job(&self, id: JobId) -> Job {
            let generation = self.queue.config().generation_queue.clone();
            self.queue.get(&generation, id).await.unwrap().unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_completes_and_enqueues_follow_ups() {
        let operations = ScriptedOperations::default();
        operations.replies.lock().unwrap().extend([
            OperationSnapshot::running(OPERATION),
            OperationSnapshot::finished(OPERATION, json!("# Introduction\n\nRemote work.")),
        ]);
        let h = harness(3, operations);
        let thesis_id = ThesisId::new();
        h.submit(thesis_id).await;

        h.work_once().await;

        let record = h.stores.status.get(thesis_id).await.unwrap().unwrap();
        assert_eq!(record.status, GenerationStatus::Completed);
        let artifact: DocumentArtifact =
            serde_json::from_value(record.artifact.unwrap()).unwrap();
        assert_eq!(artifact.version_number, 1);

        let thesis = h.stores.theses.find(thesis_id).await.unwrap().unwrap();
        assert_eq!(
            thesis.existing_content(),
            Some("# Introduction\n\nRemote work.")
        );

        let stats = h.queue.stats().await.unwrap();
        let artifacts = stats
            .queues
            .iter()
            .find(|q| q.name == h.queue.config().artifact_queue)
            .unwrap();
        assert_eq!(artifacts.counts.waiting, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_resumes_same_operation_then_fails_terminally() {
        let h = harness(2, ScriptedOperations::default());
        let thesis_id = ThesisId::new();
        let job_id = h.submit(thesis_id).await;

        h.work_once().await;
        let job = h.job(job_id).await;
        assert_eq!(job.status, JobStatus::Delayed);
        assert_eq!(job.operation.as_deref(), Some(OPERATION));
        let record = h.stores.status.get(thesis_id).await.unwrap().unwrap();
        assert_eq!(record.status, GenerationStatus::Processing);
        assert_eq!(record.operation_name.as_deref(), Some(OPERATION));

        h.work_once().await;
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.job(job_id).await.status, JobStatus::Failed);
        let record = h.stores.status.get(thesis_id).await.unwrap().unwrap();
        assert_eq!(record.status, GenerationStatus::Failed);
        assert!(record.error_message.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_operation_fails_without_retry() {
        let h = harness(
            3,
            ScriptedOperations {
                expired: true,
                ..ScriptedOperations::default()
            },
        );
        let thesis_id = ThesisId::new();
        let job_id = h.submit(thesis_id).await;

        h.work_once().await;

        let job = h.job(job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 1);
        let record = h.stores.status.get(thesis_id).await.unwrap().unwrap();
        assert_eq!(record.status, GenerationStatus::Failed);
        assert!(record.error_message.unwrap().contains("submit the generation again"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_content_skips_provider() {
        let h = harness(3, ScriptedOperations::default());
        let thesis_id = ThesisId::new();
        h.stores
            .theses
            .save_content(thesis_id, "Existing", "Already written.", &json!([]), "seed")
            .await
            .unwrap();
        h.submit(thesis_id).await;

        h.work_once().await;

        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
        let record = h.stores.status.get(thesis_id).await.unwrap().unwrap();
        assert_eq!(record.status, GenerationStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_record_owned_by_other_job_is_left_alone() {
        let h = harness(3, ScriptedOperations::default());
        let thesis_id = ThesisId::new();
        let other = JobId::new();
        h.stores
            .status
            .begin_processing(thesis_id, other)
            .await
            .unwrap();
        let job_id = JobId::new();
        h.queue
            .enqueue(
                EnqueueRequest::new(JobKind::ThesisGeneration, thesis_id, params())
                    .with_id(job_id),
            )
            .await
            .unwrap();

        h.work_once().await;

        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
        let record = h.stores.status.get(thesis_id).await.unwrap().unwrap();
        assert_eq!(record.status, GenerationStatus::Processing);
        assert!(record.is_owned_by(other));
    }

    #[tokio::test(start_paused = true)]
    async fn test_regenerated_document_gets_a_fresh_quiz() {
        let operations = ScriptedOperations::default();
        operations.replies.lock().unwrap().push_back(OperationSnapshot::finished(
            OPERATION,
            json!("# Introduction\n\nBrand new document."),
        ));
        let mut h = harness(3, operations);

        let quiz_operations = ScriptedOperations::default();
        quiz_operations.replies.lock().unwrap().push_back(OperationSnapshot::finished(
            OPERATION,
            json!(r#"[{"question": "About the new document?", "options": ["Yes", "No"], "correctIndex": 0}]"#),
        ));
        let quiz_call = ProviderCall::new(
            h.provider.clone(),
            OperationPoller::new(Arc::new(quiz_operations), Duration::from_millis(2000)),
            Duration::from_secs(5),
        );
        h.executor.register(Arc::new(crate::jobs::quiz::QuizGenerationHandler::new(
            h.stores.theses.clone(),
            quiz_call,
        )));

        let thesis_id = ThesisId::new();
        h.stores
            .theses
            .save_content(thesis_id, "Remote work", "Old document.", &json!([]), "seed")
            .await
            .unwrap();
        h.stores
            .theses
            .save_quiz(thesis_id, &json!([{ "question": "About the old document?" }]))
            .await
            .unwrap();

        let mut payload = params();
        payload["regenerate"] = json!(true);
        let job_id = JobId::new();
        h.stores.status.claim_pending(thesis_id, job_id).await.unwrap();
        h.queue
            .enqueue(
                EnqueueRequest::new(JobKind::ThesisGeneration, thesis_id, payload).with_id(job_id),
            )
            .await
            .unwrap();
        h.work_once().await;

        let thesis = h.stores.theses.find(thesis_id).await.unwrap().unwrap();
        assert_eq!(
            thesis.existing_content(),
            Some("# Introduction\n\nBrand new document.")
        );
        assert!(thesis.existing_quiz().is_none());

        let artifacts = h.queue.config().artifact_queue.clone();
        let quiz_job = h.queue.dequeue(&[artifacts]).await.unwrap().unwrap();
        assert_eq!(quiz_job.kind, JobKind::QuizGeneration);
        process_job(&h.queue, &h.executor, quiz_job.clone()).await;

        // Completed jobs are not retained by default.
        assert!(h.queue.get(&quiz_job.queue, quiz_job.id).await.unwrap().is_none());
        let thesis = h.stores.theses.find(thesis_id).await.unwrap().unwrap();
        assert_eq!(
            thesis.existing_quiz().unwrap()[0]["question"],
            "About the new document?"
        );
    }
}
