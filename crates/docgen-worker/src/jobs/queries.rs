//! Literature search query generation for a thesis.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use docgen_database::ThesisStore;
use docgen_entity::job::{Job, JobKind, SearchQueryParams};
use docgen_provider::response::parse_search_queries;
use docgen_provider::{GenerationRequest, prompt};

use crate::executor::{JobExecutionError, JobHandler};
use crate::jobs::provider::ProviderCall;

/// Generates and stores literature search queries for a thesis.
#[derive(Debug)]
pub struct SearchQueryHandler {
    theses: Arc<dyn ThesisStore>,
    provider: ProviderCall,
}

impl SearchQueryHandler {
    /// Create a new search query handler.
    pub fn new(theses: Arc<dyn ThesisStore>, provider: ProviderCall) -> Self {
        Self { theses, provider }
    }
}

#[async_trait]
impl JobHandler for SearchQueryHandler {
    fn kind(&self) -> JobKind {
        JobKind::SearchQueryGeneration
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let thesis = self
            .theses
            .find(job.thesis_id)
            .await?
            .ok_or_else(|| JobExecutionError::Permanent(format!("Thesis {} not found", job.thesis_id)))?;

        if let Some(existing) = thesis.existing_search_queries() {
            let queries = existing.as_array().map_or(0, Vec::len);
            info!(job_id = %job.id, thesis_id = %job.thesis_id, queries, "Search queries already exist, skipping");
            return Ok(Some(json!({ "skipped": true, "queries": queries })));
        }

        let content = thesis.existing_content().ok_or_else(|| {
            JobExecutionError::Permanent("Thesis has no content to derive search queries from".into())
        })?;
        let params: SearchQueryParams = if job.payload.is_null() {
            SearchQueryParams::default()
        } else {
            serde_json::from_value(job.payload.clone())
                .map_err(|e| JobExecutionError::Permanent(format!("Invalid search query payload: {e}")))?
        };

        let text = self
            .provider
            .text(job, || {
                GenerationRequest::json(prompt::search_query_prompt(
                    &thesis.title,
                    content,
                    params.query_count,
                ))
            })
            .await?;
        let queries =
            parse_search_queries(&text).map_err(|e| JobExecutionError::Transient(e.to_string()))?;

        let stored = serde_json::to_value(&queries)
            .map_err(|e| JobExecutionError::Internal(e.into()))?;
        self.theses.save_search_queries(job.thesis_id, &stored).await?;

        info!(job_id = %job.id, thesis_id = %job.thesis_id, queries = queries.len(), "Search queries stored");
        Ok(Some(json!({ "queries": queries.len() })))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use docgen_core::types::ThesisId;
    use docgen_database::store::memory::MemoryThesisStore;
    use docgen_entity::job::{BackoffPolicy, NewJob};
    use docgen_entity::thesis::Thesis;
    use docgen_provider::{
        Generation, GenerationProvider, OperationClient, OperationPoller, OperationRef,
        OperationSnapshot, ProviderError,
    };

    use super::*;

    #[derive(Debug)]
    struct QueryProvider;

    #[async_trait]
    impl GenerationProvider for QueryProvider {
        async fn generate(&self, _request: GenerationRequest) -> Result<Generation, ProviderError> {
            Ok(Generation::Text(
                r#"{"queries": [
                    {"query": "coral bleaching AND sea temperature", "purpose": "causes"},
                    {"query": "   "},
                    {"query": "reef recovery after bleaching", "language": "en"}
                ]}"#
                .to_string(),
            ))
        }
    }

    #[derive(Debug)]
    struct NoOperations;

    #[async_trait]
    impl OperationClient for NoOperations {
        async fn get_operation(
            &self,
            operation: OperationRef<'_>,
        ) -> Result<OperationSnapshot, ProviderError> {
            Err(ProviderError::NotFound(format!("{operation:?}")))
        }
    }

    fn job(thesis_id: ThesisId, payload: Value) -> Job {
        Job::new(NewJob {
            queue: "artifact-generation".into(),
            kind: JobKind::SearchQueryGeneration,
            thesis_id,
            payload,
            max_attempts: 3,
            backoff: BackoffPolicy::Fixed { delay_ms: 0 },
            operation: None,
        })
    }

    fn handler(theses: Arc<MemoryThesisStore>) -> SearchQueryHandler {
        let poller = OperationPoller::new(Arc::new(NoOperations), Duration::from_millis(100));
        let call = ProviderCall::new(Arc::new(QueryProvider), poller, Duration::from_secs(1));
        SearchQueryHandler::new(theses, call)
    }

    #[tokio::test]
    async fn test_wrapped_queries_are_stored_without_blanks() {
        let theses = Arc::new(MemoryThesisStore::new());
        let thesis_id = ThesisId::new();
        let mut thesis = Thesis::new(thesis_id, "Coral reef bleaching");
        thesis.content = Some("Reefs bleach when water warms.".to_string());
        theses.insert(thesis);

        let result = handler(theses.clone())
            .execute(&job(thesis_id, Value::Null))
            .await
            .unwrap();

        assert_eq!(result, Some(json!({ "queries": 2 })));
        let stored = theses.find(thesis_id).await.unwrap().unwrap();
        let queries = stored.existing_search_queries().unwrap();
        assert_eq!(queries[1]["query"], "reef recovery after bleaching");
    }

    #[tokio::test]
    async fn test_thesis_without_content_fails_permanently() {
        let theses = Arc::new(MemoryThesisStore::new());
        let thesis_id = ThesisId::new();
        theses.insert(Thesis::new(thesis_id, "Empty"));

        let err = handler(theses)
            .execute(&job(thesis_id, json!({ "queryCount": 5 })))
            .await
            .unwrap_err();

        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }
}
