//! Bounded polling of provider operations.
//!
//! A drive is a pure read loop against provider state, so it can be
//! repeated or resumed on the same handle from any process without
//! creating work at the provider.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{OperationClient, RetrievalStrategy};
use crate::error::{PollError, ProviderError};
use crate::operation::{DriveOutcome, OperationHandle, OperationSnapshot};

/// Drives provider operations to completion.
#[derive(Debug, Clone)]
pub struct OperationPoller {
    client: Arc<dyn OperationClient>,
    strategies: Vec<RetrievalStrategy>,
    poll_interval: Duration,
}

impl OperationPoller {
    /// Create a poller using the default retrieval strategy order.
    pub fn new(client: Arc<dyn OperationClient>, poll_interval: Duration) -> Self {
        Self {
            client,
            strategies: RetrievalStrategy::default_order(),
            poll_interval,
        }
    }

    /// Replace the retrieval strategies, tried in the given order.
    pub fn with_strategies(mut self, strategies: Vec<RetrievalStrategy>) -> Self {
        if !strategies.is_empty() {
            self.strategies = strategies;
        }
        self
    }

    /// Interval between polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Read the operation once, trying each strategy until one succeeds.
    pub async fn poll_once(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationSnapshot, PollError> {
        if handle.is_empty() {
            return Err(PollError::Transport {
                primary: ProviderError::Configuration("operation handle is empty".into()),
                fallback: None,
            });
        }

        let mut errors: Vec<ProviderError> = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match self.client.get_operation(strategy.reference(handle)).await {
                Ok(snapshot) => {
                    if !errors.is_empty() {
                        info!(
                            operation = %handle,
                            strategy = strategy.as_str(),
                            "Operation retrieved with fallback strategy"
                        );
                    }
                    return Ok(snapshot);
                }
                Err(e) => {
                    warn!(
                        operation = %handle,
                        strategy = strategy.as_str(),
                        error = %e,
                        "Operation retrieval failed"
                    );
                    errors.push(e);
                }
            }
        }

        if errors.iter().all(ProviderError::is_not_found) {
            return Err(PollError::HandleExpired {
                name: handle.name().to_string(),
            });
        }

        let mut errors = errors.into_iter();
        let primary = errors
            .next()
            .unwrap_or_else(|| ProviderError::Configuration("no retrieval strategy".into()));
        Err(PollError::Transport {
            primary,
            fallback: errors.last(),
        })
    }

    /// Poll until the operation is done, `max_wait` elapses, or `cancel`
    /// fires.
    ///
    /// Running out of time is not an error: the outcome carries the last
    /// snapshot so the caller can resume on the same handle later. The
    /// remote operation keeps running either way.
    pub async fn drive(
        &self,
        handle: &OperationHandle,
        max_wait: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<DriveOutcome, PollError> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let snapshot = tokio::select! {
                biased;
                _ = cancelled(cancel) => return Err(PollError::Cancelled),
                result = self.poll_once(handle) => result?,
            };
            polls += 1;

            if snapshot.done {
                debug!(operation = %handle, polls, "Operation finished");
                return Ok(DriveOutcome::from_done(snapshot));
            }

            let elapsed = started.elapsed();
            if elapsed >= max_wait {
                info!(
                    operation = %handle,
                    polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Operation still running after wait budget"
                );
                return Ok(DriveOutcome::TimedOut {
                    last: Some(snapshot),
                    elapsed,
                });
            }

            let pause = self.poll_interval.min(max_wait - elapsed);
            tokio::select! {
                biased;
                _ = cancelled(cancel) => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}

async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::client::OperationRef;

    type Reply = Result<OperationSnapshot, ProviderError>;

    /// Replays scripted replies per strategy; an empty script means
    /// "still running".
    #[derive(Debug, Default)]
    struct ScriptedClient {
        structured: Mutex<VecDeque<Reply>>,
        bare: Mutex<VecDeque<Reply>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn structured(self, replies: Vec<Reply>) -> Self {
            *self.structured.lock().unwrap() = replies.into();
            self
        }

        fn bare(self, replies: Vec<Reply>) -> Self {
            *self.bare.lock().unwrap() = replies.into();
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OperationClient for ScriptedClient {
        async fn get_operation(&self, operation: OperationRef<'_>) -> Reply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (script, name) = match operation {
                OperationRef::Handle(h) => (&self.structured, h.name().to_string()),
                OperationRef::Id(id) => (&self.bare, id.to_string()),
            };
            script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(OperationSnapshot::running(name)))
        }
    }

    fn poller(client: Arc<ScriptedClient>) -> OperationPoller {
        OperationPoller::new(client, Duration::from_millis(2000))
    }

    fn handle() -> OperationHandle {
        OperationHandle::new("operations/op-1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_completes_after_second_poll() {
        let client = Arc::new(ScriptedClient::default().structured(vec![
            Ok(OperationSnapshot::running("operations/op-1")),
            Ok(OperationSnapshot::finished("operations/op-1", json!("DOC"))),
        ]));
        let outcome = poller(client.clone())
            .drive(&handle(), Duration::from_secs(60), None)
            .await
            .unwrap();

        match outcome {
            DriveOutcome::Completed(snapshot) => {
                assert_eq!(snapshot.response_text().as_deref(), Some("DOC"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_times_out_with_last_snapshot() {
        let client = Arc::new(ScriptedClient::default());
        let started = Instant::now();
        let outcome = poller(client.clone())
            .drive(&handle(), Duration::from_millis(5000), None)
            .await
            .unwrap();

        match outcome {
            DriveOutcome::TimedOut { last, elapsed } => {
                let last = last.expect("last snapshot");
                assert!(!last.done);
                assert!(elapsed >= Duration::from_millis(5000));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // Polls at 0s, 2s, 4s and at the 5s deadline.
        assert_eq!(client.calls(), 4);
        assert!(started.elapsed() < Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_is_distinct_from_transport() {
        let client = Arc::new(ScriptedClient::default().structured(vec![Ok(
            OperationSnapshot::failed("operations/op-1", 13, "quota exhausted"),
        )]));
        let outcome = poller(client)
            .drive(&handle(), Duration::from_secs(10), None)
            .await
            .unwrap();
        match outcome {
            DriveOutcome::Failed { error, snapshot } => {
                assert_eq!(error.message, "quota exhausted");
                assert!(snapshot.done);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fallback_strategy_used_when_primary_rejected() {
        let client = Arc::new(
            ScriptedClient::default()
                .structured(vec![Err(ProviderError::Status {
                    code: 400,
                    body: "invalid argument".into(),
                })])
                .bare(vec![Ok(OperationSnapshot::finished("op-1", json!("DOC")))]),
        );
        let snapshot = poller(client.clone()).poll_once(&handle()).await.unwrap();
        assert!(snapshot.done);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_all_strategies_failing_keeps_primary_error() {
        let client = Arc::new(
            ScriptedClient::default()
                .structured(vec![Err(ProviderError::Transport("connection reset".into()))])
                .bare(vec![Err(ProviderError::NotFound("op-1".into()))]),
        );
        let err = poller(client).poll_once(&handle()).await.unwrap_err();
        match err {
            PollError::Transport { primary, fallback } => {
                assert!(matches!(primary, ProviderError::Transport(_)));
                assert!(matches!(fallback, Some(ProviderError::NotFound(_))));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_found_everywhere_is_handle_expired() {
        let client = Arc::new(
            ScriptedClient::default()
                .structured(vec![Err(ProviderError::NotFound("operations/op-1".into()))])
                .bare(vec![Err(ProviderError::NotFound("op-1".into()))]),
        );
        let err = poller(client)
            .drive(&handle(), Duration::from_secs(10), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::HandleExpired { ref name } if name == "operations/op-1"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_drive_is_idempotent_once_done() {
        let done = OperationSnapshot::finished("operations/op-1", json!("DOC"));
        let client = Arc::new(
            ScriptedClient::default().structured(vec![Ok(done.clone()), Ok(done.clone())]),
        );
        let poller = poller(client);
        let first = poller.drive(&handle(), Duration::from_secs(5), None).await.unwrap();
        let second = poller.drive(&handle(), Duration::from_secs(5), None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, DriveOutcome::Completed(done));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_polling() {
        let client = Arc::new(ScriptedClient::default());
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3000)).await;
            trigger.cancel();
        });

        let err = poller(client.clone())
            .drive(&handle(), Duration::from_secs(60), Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Cancelled));
        // Polls at 0s and 2s; the sleep towards 4s is interrupted.
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_handle_is_rejected() {
        let client = Arc::new(ScriptedClient::default());
        let err = poller(client.clone())
            .poll_once(&OperationHandle::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Transport { .. }));
        assert_eq!(client.calls(), 0);
    }
}
