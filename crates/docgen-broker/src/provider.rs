//! Broker manager that dispatches to the configured backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use docgen_core::config::BrokerConfig;
use docgen_core::error::AppError;
use docgen_core::result::AppResult;
use docgen_core::traits::{FinishedSet, QueueBroker, QueueCounts};
use docgen_core::types::JobId;

/// Broker manager that wraps the configured broker backend.
///
/// Cloning shares the underlying connection; one manager is created per
/// process and handed to every queue and worker.
#[derive(Debug, Clone)]
pub struct BrokerManager {
    inner: Arc<dyn QueueBroker>,
}

impl BrokerManager {
    /// Create a broker manager from configuration.
    ///
    /// The Redis backend does not connect here; the first command does.
    pub fn new(config: &BrokerConfig) -> AppResult<Self> {
        let inner: Arc<dyn QueueBroker> = match config.backend.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis queue broker");
                let client = crate::redis::RedisClient::open(&config.redis)?;
                Arc::new(crate::redis::RedisQueueBroker::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory queue broker");
                Arc::new(crate::memory::MemoryQueueBroker::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown broker backend: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a broker manager from an existing backend (for testing).
    pub fn from_broker(broker: Arc<dyn QueueBroker>) -> Self {
        Self { inner: broker }
    }
}

#[async_trait]
impl QueueBroker for BrokerManager {
    async fn store_job(&self, queue: &str, id: JobId, body: &str) -> AppResult<()> {
        self.inner.store_job(queue, id, body).await
    }

    async fn load_job(&self, queue: &str, id: JobId) -> AppResult<Option<String>> {
        self.inner.load_job(queue, id).await
    }

    async fn remove_job(&self, queue: &str, id: JobId) -> AppResult<()> {
        self.inner.remove_job(queue, id).await
    }

    async fn push_waiting(&self, queue: &str, id: JobId) -> AppResult<()> {
        self.inner.push_waiting(queue, id).await
    }

    async fn push_delayed(&self, queue: &str, id: JobId, ready_at_ms: i64) -> AppResult<()> {
        self.inner.push_delayed(queue, id, ready_at_ms).await
    }

    async fn promote_due(&self, queue: &str, now_ms: i64) -> AppResult<u64> {
        self.inner.promote_due(queue, now_ms).await
    }

    async fn claim_next(&self, queue: &str) -> AppResult<Option<JobId>> {
        self.inner.claim_next(queue).await
    }

    async fn release_active(&self, queue: &str, id: JobId) -> AppResult<bool> {
        self.inner.release_active(queue, id).await
    }

    async fn list_active(&self, queue: &str) -> AppResult<Vec<JobId>> {
        self.inner.list_active(queue).await
    }

    async fn record_finished(
        &self,
        queue: &str,
        set: FinishedSet,
        id: JobId,
        finished_at_ms: i64,
        keep: usize,
    ) -> AppResult<Vec<JobId>> {
        self.inner
            .record_finished(queue, set, id, finished_at_ms, keep)
            .await
    }

    async fn counts(&self, queue: &str) -> AppResult<QueueCounts> {
        self.inner.counts(queue).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
