//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use docgen_broker::BrokerManager;
use docgen_broker::memory::MemoryQueueBroker;
use docgen_core::config::AppConfig;
use docgen_database::Stores;
use docgen_provider::{
    EmbeddingProvider, Generation, GenerationProvider, GenerationRequest, OperationClient,
    OperationHandle, OperationPoller, OperationRef, OperationSnapshot, ProviderError,
};
use docgen_worker::jobs::{ProviderCall, ThesisGenerationHandler};
use docgen_worker::runner::process_job;
use docgen_worker::{JobExecutor, JobQueue};

/// Provider answer for every generation call.
#[derive(Debug, Clone)]
pub enum ProviderReply {
    /// Answer synchronously with this text.
    Text(String),
    /// Start a long-running operation with this name.
    Operation(String),
}

/// Generation provider replaying one configured answer.
#[derive(Debug)]
pub struct ScriptedProvider {
    reply: Mutex<ProviderReply>,
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate(&self, _request: GenerationRequest) -> Result<Generation, ProviderError> {
        Ok(match self.reply.lock().unwrap().clone() {
            ProviderReply::Text(text) => Generation::Text(text),
            ProviderReply::Operation(name) => Generation::Pending(OperationHandle::new(name)),
        })
    }
}

/// Operation client replaying queued snapshots, then reporting "running".
#[derive(Debug, Default)]
pub struct ScriptedOperations {
    replies: Mutex<VecDeque<OperationSnapshot>>,
}

impl ScriptedOperations {
    /// Queue the next snapshot returned by the provider.
    pub fn push(&self, snapshot: OperationSnapshot) {
        self.replies.lock().unwrap().push_back(snapshot);
    }
}

#[async_trait]
impl OperationClient for ScriptedOperations {
    async fn get_operation(
        &self,
        operation: OperationRef<'_>,
    ) -> Result<OperationSnapshot, ProviderError> {
        let name = match operation {
            OperationRef::Handle(handle) => handle.name().to_string(),
            OperationRef::Id(id) => id.to_string(),
        };
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| OperationSnapshot::running(name)))
    }
}

/// Embedder returning a fixed vector.
#[derive(Debug)]
pub struct FixedEmbedder;

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(vec![1.0, 0.0, 0.0])
    }
}

/// Response captured from the router.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Parsed JSON body, `Null` when empty.
    pub body: Value,
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Job record and artifact stores
    pub stores: Stores,
    /// Durable job queue
    pub queue: Arc<JobQueue>,
    /// Executor with the generation handler registered
    pub executor: JobExecutor,
    /// Provider operation replies
    pub operations: Arc<ScriptedOperations>,
    provider: Arc<ScriptedProvider>,
}

impl TestApp {
    /// Create a new test application over in-memory backends.
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.server.max_poll_wait_ms = 300_000;
        let config = Arc::new(config);

        let stores = Stores::in_memory();
        let queue = Arc::new(JobQueue::new(
            BrokerManager::from_broker(Arc::new(MemoryQueueBroker::new())),
            config.queue.clone(),
        ));
        let operations = Arc::new(ScriptedOperations::default());
        let provider = Arc::new(ScriptedProvider {
            reply: Mutex::new(ProviderReply::Text(document_text())),
        });
        let poller = OperationPoller::new(operations.clone(), Duration::from_millis(2000));

        let mut executor = JobExecutor::new();
        executor.register(Arc::new(ThesisGenerationHandler::new(
            stores.status.clone(),
            stores.theses.clone(),
            ProviderCall::new(provider.clone(), poller.clone(), Duration::from_secs(60)),
            queue.clone(),
        )));

        let state = docgen_api::AppState::new(
            config,
            stores.clone(),
            queue.clone(),
            poller,
            Arc::new(FixedEmbedder),
        );

        Self {
            router: docgen_api::build_app(state),
            stores,
            queue,
            executor,
            operations,
            provider,
        }
    }

    /// Change what the provider answers to generation calls.
    pub fn provider_reply(&self, reply: ProviderReply) {
        *self.provider.reply.lock().unwrap() = reply;
    }

    /// Send a request through the router.
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse { status, body }
    }

    /// GET helper.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    /// POST helper.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Claim and run one job from the generation queue.
    ///
    /// Returns `false` when the queue is empty.
    pub async fn run_worker_once(&self) -> bool {
        let generation = self.queue.config().generation_queue.clone();
        match self.queue.dequeue(&[generation]).await.unwrap() {
            Some(job) => {
                process_job(&self.queue, &self.executor, job).await;
                true
            }
            None => false,
        }
    }
}

/// A valid generation payload.
pub fn generation_payload() -> Value {
    json!({
        "title": "Remote work and team productivity",
        "researchQuestion": "How does remote work affect the output of software teams?",
        "outline": [
            { "title": "Introduction" },
            { "title": "Method" },
            { "title": "Results" }
        ],
        "specifications": { "targetLength": 40, "lengthUnit": "words" }
    })
}

/// A provider answer that parses as a document with one citation.
pub fn document_text() -> String {
    let content = "Remote work changes how software teams coordinate. ".repeat(8);
    json!({
        "content": content.trim(),
        "citations": [
            { "title": "Working from home", "authors": ["Bloom, N."], "year": 2015 }
        ]
    })
    .to_string()
}
