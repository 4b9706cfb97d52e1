//! In-memory stores backed by `dashmap`.
//!
//! Each record is mutated under its map entry, which gives the same
//! compare-and-set behavior as the conditional SQL updates.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::types::{JobId, ThesisId, VersionId};
use docgen_entity::generation::{GenerationStatus, StatusRecord};
use docgen_entity::thesis::{Passage, Thesis, ThesisVersion};

use super::{PassageIndex, StatusStore, ThesisStore};

/// In-memory [`StatusStore`].
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: DashMap<ThesisId, StatusRecord>,
}

impl MemoryStatusStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn update_owned<F>(&self, thesis_id: ThesisId, job_id: JobId, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut StatusRecord),
    {
        if let Some(mut record) = self.records.get_mut(&thesis_id) {
            if record.is_owned_by(job_id) {
                apply(&mut *record);
                record.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    fn terminal(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        status: GenerationStatus,
        apply: impl FnOnce(&mut StatusRecord),
    ) -> StatusRecord {
        let mut record = self
            .records
            .entry(thesis_id)
            .or_insert_with(|| StatusRecord::new(thesis_id, status, job_id));
        let now = Utc::now();
        record.status = status;
        record.job_id = Some(job_id);
        record.updated_at = now;
        apply(&mut *record);
        record.clone()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn get(&self, thesis_id: ThesisId) -> AppResult<Option<StatusRecord>> {
        Ok(self.records.get(&thesis_id).map(|r| r.clone()))
    }

    async fn claim_pending(&self, thesis_id: ThesisId, job_id: JobId) -> AppResult<StatusRecord> {
        match self.records.entry(thesis_id) {
            Entry::Vacant(slot) => {
                let record = StatusRecord::new(thesis_id, GenerationStatus::Pending, job_id);
                slot.insert(record.clone());
                Ok(record)
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.status.is_active() {
                    return Err(AppError::already_in_progress(format!(
                        "Generation for thesis {thesis_id} is already {}",
                        record.status
                    )));
                }
                record.status = GenerationStatus::Pending;
                record.job_id = Some(job_id);
                record.operation_name = None;
                record.error_message = None;
                record.completed_at = None;
                record.updated_at = Utc::now();
                Ok(record.clone())
            }
        }
    }

    async fn begin_processing(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
    ) -> AppResult<StatusRecord> {
        match self.records.entry(thesis_id) {
            Entry::Vacant(slot) => {
                let record = StatusRecord::new(thesis_id, GenerationStatus::Processing, job_id);
                slot.insert(record.clone());
                Ok(record)
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.status == GenerationStatus::Processing && !record.is_owned_by(job_id) {
                    return Err(AppError::already_in_progress(format!(
                        "Thesis {thesis_id} is being processed by another job"
                    )));
                }
                if !record.is_owned_by(job_id) {
                    record.operation_name = None;
                }
                record.status = GenerationStatus::Processing;
                record.job_id = Some(job_id);
                record.completed_at = None;
                record.updated_at = Utc::now();
                Ok(record.clone())
            }
        }
    }

    async fn attach_operation(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        operation: &str,
    ) -> AppResult<()> {
        self.update_owned(thesis_id, job_id, |r| {
            r.operation_name = Some(operation.to_string());
        })
    }

    async fn record_attempt_error(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        message: &str,
    ) -> AppResult<()> {
        self.update_owned(thesis_id, job_id, |r| {
            r.error_message = Some(message.to_string());
        })
    }

    async fn complete(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        artifact: &serde_json::Value,
    ) -> AppResult<StatusRecord> {
        Ok(
            self.terminal(thesis_id, job_id, GenerationStatus::Completed, |r| {
                r.artifact = Some(artifact.clone());
                r.error_message = None;
                r.completed_at = Some(Utc::now());
            }),
        )
    }

    async fn fail(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        message: &str,
    ) -> AppResult<StatusRecord> {
        Ok(self.terminal(thesis_id, job_id, GenerationStatus::Failed, |r| {
            r.error_message = Some(message.to_string());
        }))
    }

    async fn revert_pending(
        &self,
        thesis_id: ThesisId,
        job_id: JobId,
        message: &str,
    ) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&thesis_id) {
            if record.status == GenerationStatus::Pending && record.is_owned_by(job_id) {
                record.status = GenerationStatus::Failed;
                record.error_message = Some(message.to_string());
                record.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[derive(Debug, Clone)]
struct ThesisEntry {
    thesis: Thesis,
    versions: Vec<ThesisVersion>,
}

/// In-memory [`ThesisStore`].
#[derive(Debug, Default)]
pub struct MemoryThesisStore {
    entries: DashMap<ThesisId, ThesisEntry>,
}

impl MemoryThesisStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a thesis row.
    pub fn insert(&self, thesis: Thesis) {
        let id = thesis.id;
        self.entries
            .entry(id)
            .and_modify(|e| e.thesis = thesis.clone())
            .or_insert_with(|| ThesisEntry {
                thesis,
                versions: Vec::new(),
            });
    }

    fn modify<F>(&self, id: ThesisId, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut Thesis),
    {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Thesis {id} not found")))?;
        apply(&mut entry.thesis);
        entry.thesis.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ThesisStore for MemoryThesisStore {
    async fn find(&self, id: ThesisId) -> AppResult<Option<Thesis>> {
        Ok(self.entries.get(&id).map(|e| e.thesis.clone()))
    }

    async fn save_content(
        &self,
        id: ThesisId,
        title: &str,
        content: &str,
        citations: &serde_json::Value,
        comment: &str,
    ) -> AppResult<ThesisVersion> {
        let mut entry = self.entries.entry(id).or_insert_with(|| ThesisEntry {
            thesis: Thesis::new(id, title),
            versions: Vec::new(),
        });
        let number = entry
            .versions
            .iter()
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0)
            + 1;
        let version = ThesisVersion {
            id: VersionId::new(),
            thesis_id: id,
            version_number: number,
            content: content.to_string(),
            comment: Some(comment.to_string()),
            created_at: Utc::now(),
        };
        entry.versions.push(version.clone());
        entry.thesis.content = Some(content.to_string());
        entry.thesis.citations = Some(citations.clone());
        entry.thesis.quiz_data = None;
        entry.thesis.search_queries = None;
        entry.thesis.current_version = Some(number);
        entry.thesis.updated_at = Utc::now();
        debug!(thesis_id = %id, version = number, "Stored content version");
        Ok(version)
    }

    async fn save_quiz(&self, id: ThesisId, quiz: &serde_json::Value) -> AppResult<()> {
        self.modify(id, |t| t.quiz_data = Some(quiz.clone()))
    }

    async fn save_search_queries(
        &self,
        id: ThesisId,
        queries: &serde_json::Value,
    ) -> AppResult<()> {
        self.modify(id, |t| t.search_queries = Some(queries.clone()))
    }

    async fn list_versions(&self, id: ThesisId) -> AppResult<Vec<ThesisVersion>> {
        let mut versions = self
            .entries
            .get(&id)
            .map(|e| e.versions.clone())
            .unwrap_or_default();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    async fn find_version(&self, id: ThesisId, number: i32) -> AppResult<Option<ThesisVersion>> {
        Ok(self.entries.get(&id).and_then(|e| {
            e.versions
                .iter()
                .find(|v| v.version_number == number)
                .cloned()
        }))
    }

    async fn restore_version(&self, id: ThesisId, number: i32) -> AppResult<Thesis> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Thesis {id} not found")))?;
        let content = entry
            .versions
            .iter()
            .find(|v| v.version_number == number)
            .map(|v| v.content.clone())
            .ok_or_else(|| {
                AppError::not_found(format!("Version {number} of thesis {id} not found"))
            })?;
        entry.thesis.content = Some(content);
        entry.thesis.current_version = Some(number);
        entry.thesis.updated_at = Utc::now();
        Ok(entry.thesis.clone())
    }
}

/// In-memory [`PassageIndex`] using cosine similarity.
#[derive(Debug, Default)]
pub struct MemoryPassageIndex {
    passages: DashMap<ThesisId, Vec<(Passage, Vec<f32>)>>,
}

impl MemoryPassageIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a passage with its embedding.
    pub fn insert(&self, thesis_id: ThesisId, passage: Passage, embedding: Vec<f32>) {
        self.passages
            .entry(thesis_id)
            .or_default()
            .push((passage, embedding));
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

#[async_trait]
impl PassageIndex for MemoryPassageIndex {
    async fn search(
        &self,
        thesis_id: ThesisId,
        embedding: &[f32],
        limit: u32,
        threshold: f64,
    ) -> AppResult<Vec<Passage>> {
        let Some(entries) = self.passages.get(&thesis_id) else {
            return Ok(Vec::new());
        };
        let mut ranked: Vec<Passage> = entries
            .iter()
            .map(|(passage, vector)| Passage {
                similarity: cosine(embedding, vector),
                ..passage.clone()
            })
            .filter(|p| p.similarity >= threshold)
            .collect();
        ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        ranked.truncate(limit as usize);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgen_core::ErrorKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_claim_pending_rejects_active_record() {
        let store = MemoryStatusStore::new();
        let thesis = ThesisId::new();
        store.claim_pending(thesis, JobId::new()).await.expect("first claim");

        let err = store
            .claim_pending(thesis, JobId::new())
            .await
            .expect_err("second claim must be rejected");
        assert_eq!(err.kind, ErrorKind::AlreadyInProgress);
    }

    #[tokio::test]
    async fn test_claim_pending_after_terminal_state() {
        let store = MemoryStatusStore::new();
        let thesis = ThesisId::new();
        let first = JobId::new();
        store.claim_pending(thesis, first).await.expect("claim");
        store.fail(thesis, first, "boom").await.expect("fail");

        let second = JobId::new();
        let record = store.claim_pending(thesis, second).await.expect("reclaim");
        assert_eq!(record.status, GenerationStatus::Pending);
        assert!(record.is_owned_by(second));
        assert!(record.error_message.is_none());
    }

    #[tokio::test]
    async fn test_begin_processing_is_exclusive_per_thesis() {
        let store = MemoryStatusStore::new();
        let thesis = ThesisId::new();
        let owner = JobId::new();
        store.begin_processing(thesis, owner).await.expect("owner");
        store
            .begin_processing(thesis, owner)
            .await
            .expect("owner may re-enter on retry");

        let err = store
            .begin_processing(thesis, JobId::new())
            .await
            .expect_err("other job rejected");
        assert_eq!(err.kind, ErrorKind::AlreadyInProgress);

        let record = store.get(thesis).await.expect("get").expect("record");
        assert_eq!(record.status, GenerationStatus::Processing);
        assert!(record.is_owned_by(owner));
    }

    #[tokio::test]
    async fn test_complete_sets_artifact_and_timestamp() {
        let store = MemoryStatusStore::new();
        let thesis = ThesisId::new();
        let job = JobId::new();
        store.begin_processing(thesis, job).await.expect("begin");
        store
            .attach_operation(thesis, job, "operations/op-1")
            .await
            .expect("attach");
        let record = store
            .complete(thesis, job, &json!({ "version_number": 1 }))
            .await
            .expect("complete");
        assert_eq!(record.status, GenerationStatus::Completed);
        assert!(record.completed_at.is_some());
        assert_eq!(record.operation_name.as_deref(), Some("operations/op-1"));
    }

    #[tokio::test]
    async fn test_revert_pending_only_touches_own_pending_record() {
        let store = MemoryStatusStore::new();
        let thesis = ThesisId::new();
        let job = JobId::new();
        store.claim_pending(thesis, job).await.expect("claim");
        store
            .revert_pending(thesis, JobId::new(), "other")
            .await
            .expect("noop");
        assert_eq!(
            store.get(thesis).await.expect("get").expect("record").status,
            GenerationStatus::Pending
        );
        store
            .revert_pending(thesis, job, "broker down")
            .await
            .expect("revert");
        let record = store.get(thesis).await.expect("get").expect("record");
        assert_eq!(record.status, GenerationStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("broker down"));
    }

    #[tokio::test]
    async fn test_rollback_is_idempotent() {
        let store = MemoryThesisStore::new();
        let id = ThesisId::new();
        store
            .save_content(id, "T", "first draft", &json!([]), "generated")
            .await
            .expect("v1");
        store
            .save_content(id, "T", "second draft", &json!([]), "generated")
            .await
            .expect("v2");

        let once = store.restore_version(id, 1).await.expect("restore");
        let twice = store.restore_version(id, 1).await.expect("restore again");
        assert_eq!(once.content.as_deref(), Some("first draft"));
        assert_eq!(once.content, twice.content);
        assert_eq!(twice.current_version, Some(1));
        assert_eq!(store.list_versions(id).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn test_restore_missing_version_is_not_found() {
        let store = MemoryThesisStore::new();
        let id = ThesisId::new();
        store
            .save_content(id, "T", "draft", &json!([]), "generated")
            .await
            .expect("v1");
        let err = store.restore_version(id, 7).await.expect_err("missing");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_new_content_clears_derived_artifacts() {
        let store = MemoryThesisStore::new();
        let id = ThesisId::new();
        store
            .save_content(id, "T", "old draft", &json!([]), "generated")
            .await
            .expect("v1");
        store
            .save_quiz(id, &json!([{ "question": "About the old draft?" }]))
            .await
            .expect("quiz");
        store
            .save_search_queries(id, &json!([{ "query": "old draft" }]))
            .await
            .expect("queries");

        store
            .save_content(id, "T", "new draft", &json!([]), "regenerated")
            .await
            .expect("v2");

        let thesis = store.find(id).await.expect("find").expect("thesis");
        assert_eq!(thesis.existing_content(), Some("new draft"));
        assert!(thesis.quiz_data.is_none());
        assert!(thesis.search_queries.is_none());
    }

    #[tokio::test]
    async fn test_passage_search_ranks_and_filters() {
        let index = MemoryPassageIndex::new();
        let thesis = ThesisId::new();
        let passage = |content: &str| Passage {
            id: uuid::Uuid::new_v4(),
            content: content.to_string(),
            similarity: 0.0,
            metadata: None,
        };
        index.insert(thesis, passage("close"), vec![1.0, 0.1]);
        index.insert(thesis, passage("far"), vec![0.0, 1.0]);
        index.insert(thesis, passage("closest"), vec![1.0, 0.0]);

        let hits = index
            .search(thesis, &[1.0, 0.0], 5, 0.5)
            .await
            .expect("search");
        let names: Vec<_> = hits.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(names, vec!["closest", "close"]);
    }
}
