//! Semantic passage lookup: embed the query, then search the index.

use std::sync::Arc;

use tracing::debug;

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::types::ThesisId;
use docgen_database::PassageIndex;
use docgen_entity::thesis::Passage;
use docgen_provider::EmbeddingProvider;

/// Largest number of passages one search may return.
pub const MAX_LIMIT: u32 = 50;

/// Finds source passages similar to a free-text query.
#[derive(Debug, Clone)]
pub struct PassageService {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn PassageIndex>,
}

impl PassageService {
    /// Creates a new passage service.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn PassageIndex>) -> Self {
        Self { embedder, index }
    }

    /// Passages of `thesis_id` ranked by similarity to `query`.
    pub async fn search(
        &self,
        thesis_id: ThesisId,
        query: &str,
        limit: u32,
        threshold: f64,
    ) -> AppResult<Vec<Passage>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("query must not be empty"));
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AppError::validation("threshold must be between 0 and 1"));
        }

        let embedding = self.embedder.embed(query).await?;
        let passages = self
            .index
            .search(thesis_id, &embedding, limit, threshold)
            .await?;
        debug!(thesis_id = %thesis_id, found = passages.len(), "Passage search finished");
        Ok(passages)
    }
}
