//! In-process queue broker.
//!
//! Each queue is a single `dashmap` entry, so every operation on a queue
//! runs under that entry's lock and is atomic like the Redis scripts.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use dashmap::DashMap;

use docgen_core::result::AppResult;
use docgen_core::traits::{FinishedSet, QueueBroker, QueueCounts};
use docgen_core::types::JobId;

#[derive(Debug, Default)]
struct QueueState {
    jobs: HashMap<JobId, String>,
    wait: VecDeque<JobId>,
    active: Vec<JobId>,
    delayed: Vec<(i64, JobId)>,
    completed: VecDeque<(i64, JobId)>,
    failed: VecDeque<(i64, JobId)>,
}

impl QueueState {
    fn finished_mut(&mut self, set: FinishedSet) -> &mut VecDeque<(i64, JobId)> {
        match set {
            FinishedSet::Completed => &mut self.completed,
            FinishedSet::Failed => &mut self.failed,
        }
    }
}

/// In-memory [`QueueBroker`].
#[derive(Debug, Default)]
pub struct MemoryQueueBroker {
    queues: DashMap<String, QueueState>,
}

impl MemoryQueueBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_queue<T>(&self, queue: &str, f: impl FnOnce(&mut QueueState) -> T) -> T {
        let mut state = self.queues.entry(queue.to_string()).or_default();
        f(&mut *state)
    }
}

#[async_trait]
impl QueueBroker for MemoryQueueBroker {
    async fn store_job(&self, queue: &str, id: JobId, body: &str) -> AppResult<()> {
        self.with_queue(queue, |q| q.jobs.insert(id, body.to_string()));
        Ok(())
    }

    async fn load_job(&self, queue: &str, id: JobId) -> AppResult<Option<String>> {
        Ok(self.with_queue(queue, |q| q.jobs.get(&id).cloned()))
    }

    async fn remove_job(&self, queue: &str, id: JobId) -> AppResult<()> {
        self.with_queue(queue, |q| q.jobs.remove(&id));
        Ok(())
    }

    async fn push_waiting(&self, queue: &str, id: JobId) -> AppResult<()> {
        self.with_queue(queue, |q| q.wait.push_back(id));
        Ok(())
    }

    async fn push_delayed(&self, queue: &str, id: JobId, ready_at_ms: i64) -> AppResult<()> {
        self.with_queue(queue, |q| {
            q.delayed.retain(|(_, existing)| *existing != id);
            q.delayed.push((ready_at_ms, id));
        });
        Ok(())
    }

    async fn promote_due(&self, queue: &str, now_ms: i64) -> AppResult<u64> {
        Ok(self.with_queue(queue, |q| {
            q.delayed.sort_by_key(|(ready, _)| *ready);
            let due = q.delayed.partition_point(|(ready, _)| *ready <= now_ms);
            let promoted: Vec<_> = q.delayed.drain(..due).map(|(_, id)| id).collect();
            let moved = promoted.len() as u64;
            q.wait.extend(promoted);
            moved
        }))
    }

    async fn claim_next(&self, queue: &str) -> AppResult<Option<JobId>> {
        Ok(self.with_queue(queue, |q| {
            let id = q.wait.pop_front()?;
            q.active.push(id);
            Some(id)
        }))
    }

    async fn release_active(&self, queue: &str, id: JobId) -> AppResult<bool> {
        Ok(self.with_queue(queue, |q| {
            let before = q.active.len();
            q.active.retain(|existing| *existing != id);
            q.active.len() != before
        }))
    }

    async fn list_active(&self, queue: &str) -> AppResult<Vec<JobId>> {
        Ok(self.with_queue(queue, |q| q.active.clone()))
    }

    async fn record_finished(
        &self,
        queue: &str,
        set: FinishedSet,
        id: JobId,
        finished_at_ms: i64,
        keep: usize,
    ) -> AppResult<Vec<JobId>> {
        Ok(self.with_queue(queue, |q| {
            let finished = q.finished_mut(set);
            finished.retain(|(_, existing)| *existing != id);
            finished.push_back((finished_at_ms, id));
            let mut evicted = Vec::new();
            while finished.len() > keep {
                if let Some((_, old)) = finished.pop_front() {
                    evicted.push(old);
                }
            }
            evicted
        }))
    }

    async fn counts(&self, queue: &str) -> AppResult<QueueCounts> {
        Ok(self.with_queue(queue, |q| QueueCounts {
            waiting: q.wait.len() as u64,
            active: q.active.len() as u64,
            delayed: q.delayed.len() as u64,
            completed: q.completed.len() as u64,
            failed: q.failed.len() as u64,
        }))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
