//! Read-only projection of generation status records.

use std::sync::Arc;

use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::types::ThesisId;
use docgen_database::StatusStore;
use docgen_entity::generation::StatusRecord;

/// Serves status reads straight from the durable store.
#[derive(Debug, Clone)]
pub struct StatusQueryService {
    status: Arc<dyn StatusStore>,
}

impl StatusQueryService {
    /// Creates a new status query service.
    pub fn new(status: Arc<dyn StatusStore>) -> Self {
        Self { status }
    }

    /// Current status record of a thesis.
    pub async fn get_status(&self, thesis_id: ThesisId) -> AppResult<StatusRecord> {
        self.status.get(thesis_id).await?.ok_or_else(|| {
            AppError::not_found(format!("No generation status for thesis {thesis_id}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use docgen_core::error::ErrorKind;
    use docgen_core::types::JobId;
    use docgen_database::Stores;
    use docgen_entity::generation::GenerationStatus;

    use super::*;

    #[tokio::test]
    async fn test_get_status_reads_store() {
        let stores = Stores::in_memory();
        let svc = StatusQueryService::new(stores.status.clone());
        let thesis_id = ThesisId::new();

        let err = svc.get_status(thesis_id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        stores
            .status
            .claim_pending(thesis_id, JobId::new())
            .await
            .unwrap();
        let record = svc.get_status(thesis_id).await.unwrap();
        assert_eq!(record.status, GenerationStatus::Pending);
    }
}
