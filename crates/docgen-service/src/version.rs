//! Content versions and rollback.

use std::sync::Arc;

use tracing::info;

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::types::ThesisId;
use docgen_database::ThesisStore;
use docgen_entity::thesis::{Thesis, ThesisVersion};

/// Manages the version history of generated content.
#[derive(Debug, Clone)]
pub struct VersionService {
    theses: Arc<dyn ThesisStore>,
}

impl VersionService {
    /// Creates a new version service.
    pub fn new(theses: Arc<dyn ThesisStore>) -> Self {
        Self { theses }
    }

    /// Lists all versions of a thesis, newest first.
    pub async fn list(&self, thesis_id: ThesisId) -> AppResult<Vec<ThesisVersion>> {
        self.require_thesis(thesis_id).await?;
        self.theses.list_versions(thesis_id).await
    }

    /// Make version `version_number` the current content.
    pub async fn rollback(&self, thesis_id: ThesisId, version_number: i32) -> AppResult<Thesis> {
        if version_number < 1 {
            return Err(AppError::validation("versionNumber must be at least 1"));
        }
        self.require_thesis(thesis_id).await?;
        if self
            .theses
            .find_version(thesis_id, version_number)
            .await?
            .is_none()
        {
            return Err(AppError::not_found(format!(
                "Version {version_number} of thesis {thesis_id} not found"
            )));
        }

        let thesis = self.theses.restore_version(thesis_id, version_number).await?;
        info!(thesis_id = %thesis_id, version_number, "Thesis rolled back");
        Ok(thesis)
    }

    async fn require_thesis(&self, thesis_id: ThesisId) -> AppResult<Thesis> {
        self.theses
            .find(thesis_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Thesis {thesis_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use docgen_core::error::ErrorKind;
    use docgen_database::Stores;
    use serde_json::json;

    use super::*;

    async fn seeded() -> (VersionService, ThesisId) {
        let stores = Stores::in_memory();
        let thesis_id = ThesisId::new();
        for content in ["First draft.", "Second draft."] {
            stores
                .theses
                .save_content(thesis_id, "Drafts", content, &json!([]), "test")
                .await
                .unwrap();
        }
        (VersionService::new(stores.theses.clone()), thesis_id)
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (svc, thesis_id) = seeded().await;
        let versions = svc.list(thesis_id).await.unwrap();
        let numbers: Vec<i32> = versions.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_rollback_twice_yields_same_content() {
        let (svc, thesis_id) = seeded().await;

        let first = svc.rollback(thesis_id, 1).await.unwrap();
        let second = svc.rollback(thesis_id, 1).await.unwrap();

        assert_eq!(first.content.as_deref(), Some("First draft."));
        assert_eq!(first.content, second.content);
        assert_eq!(second.current_version, Some(1));
    }

    #[tokio::test]
    async fn test_rollback_to_missing_version_is_not_found() {
        let (svc, thesis_id) = seeded().await;
        let err = svc.rollback(thesis_id, 7).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = svc.rollback(thesis_id, 0).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
