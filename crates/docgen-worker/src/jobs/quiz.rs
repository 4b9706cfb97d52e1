//! Quiz generation from a finished thesis.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use docgen_database::ThesisStore;
use docgen_entity::job::{Job, JobKind, QuizParams};
use docgen_provider::response::parse_quiz;
use docgen_provider::{GenerationRequest, prompt};

use crate::executor::{JobExecutionError, JobHandler};
use crate::jobs::provider::ProviderCall;

/// Generates and stores the quiz of a thesis.
#[derive(Debug)]
pub struct QuizGenerationHandler {
    theses: Arc<dyn ThesisStore>,
    provider: ProviderCall,
}

impl QuizGenerationHandler {
    /// Create a new quiz handler.
    pub fn new(theses: Arc<dyn ThesisStore>, provider: ProviderCall) -> Self {
        Self { theses, provider }
    }
}

#[async_trait]
impl JobHandler for QuizGenerationHandler {
    fn kind(&self) -> JobKind {
        JobKind::QuizGeneration
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let thesis = self
            .theses
            .find(job.thesis_id)
            .await?
            .ok_or_else(|| JobExecutionError::Permanent(format!("Thesis {} not found", job.thesis_id)))?;

        if let Some(existing) = thesis.existing_quiz() {
            let questions = existing.as_array().map_or(0, Vec::len);
            info!(job_id = %job.id, thesis_id = %job.thesis_id, questions, "Quiz already exists, skipping");
            return Ok(Some(json!({ "skipped": true, "questions": questions })));
        }

        let content = thesis.existing_content().ok_or_else(|| {
            JobExecutionError::Permanent("Thesis has no content to build a quiz from".into())
        })?;
        let params: QuizParams = if job.payload.is_null() {
            QuizParams::default()
        } else {
            serde_json::from_value(job.payload.clone())
                .map_err(|e| JobExecutionError::Permanent(format!("Invalid quiz payload: {e}")))?
        };

        let text = self
            .provider
            .text(job, || {
                GenerationRequest::json(prompt::quiz_prompt(
                    &thesis.title,
                    content,
                    params.question_count,
                ))
            })
            .await?;
        let questions =
            parse_quiz(&text).map_err(|e| JobExecutionError::Transient(e.to_string()))?;

        let quiz = serde_json::to_value(&questions)
            .map_err(|e| JobExecutionError::Internal(e.into()))?;
        self.theses.save_quiz(job.thesis_id, &quiz).await?;

        info!(job_id = %job.id, thesis_id = %job.thesis_id, questions = questions.len(), "Quiz stored");
        Ok(Some(json!({ "questions": questions.len() })))
    }
}
