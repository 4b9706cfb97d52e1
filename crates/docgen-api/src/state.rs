//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Duration;

use docgen_core::config::AppConfig;
use docgen_database::Stores;
use docgen_provider::{EmbeddingProvider, OperationPoller};
use docgen_service::{
    GenerationService, OperationService, PassageService, StatusQueryService, VersionService,
};
use docgen_worker::JobQueue;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// Job record and artifact stores
    pub stores: Stores,
    /// Durable job queue
    pub queue: Arc<JobQueue>,

    // ── Services ─────────────────────────────────────────────
    /// Generation intake
    pub generation_service: Arc<GenerationService>,
    /// Status reads
    pub status_service: Arc<StatusQueryService>,
    /// Operation checks and bounded waits
    pub operation_service: Arc<OperationService>,
    /// Version listing and rollback
    pub version_service: Arc<VersionService>,
    /// Passage search
    pub passage_service: Arc<PassageService>,
}

impl AppState {
    /// Wire the services over the given infrastructure handles.
    pub fn new(
        config: Arc<AppConfig>,
        stores: Stores,
        queue: Arc<JobQueue>,
        poller: OperationPoller,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let max_poll_wait = Duration::from_millis(config.server.max_poll_wait_ms);
        Self {
            generation_service: Arc::new(GenerationService::new(
                stores.status.clone(),
                stores.theses.clone(),
                Arc::clone(&queue),
            )),
            status_service: Arc::new(StatusQueryService::new(stores.status.clone())),
            operation_service: Arc::new(OperationService::new(poller, max_poll_wait)),
            version_service: Arc::new(VersionService::new(stores.theses.clone())),
            passage_service: Arc::new(PassageService::new(embedder, stores.passages.clone())),
            config,
            stores,
            queue,
        }
    }
}
