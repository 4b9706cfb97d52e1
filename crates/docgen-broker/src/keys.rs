//! Redis key builders for one queue.
//!
//! Centralising key construction keeps every key of a queue under one
//! `{prefix}:queue:{name}` namespace.

use docgen_core::types::JobId;

/// Keys of a single queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    base: String,
}

impl QueueKeys {
    /// Keys for `queue` under `prefix`.
    pub fn new(prefix: &str, queue: &str) -> Self {
        let prefix = prefix.trim_end_matches(':');
        Self {
            base: format!("{prefix}:queue:{queue}"),
        }
    }

    /// String holding the serialized job body.
    pub fn job(&self, id: JobId) -> String {
        format!("{}:job:{id}", self.base)
    }

    /// List of ready job ids.
    pub fn wait(&self) -> String {
        format!("{}:wait", self.base)
    }

    /// List of claimed job ids.
    pub fn active(&self) -> String {
        format!("{}:active", self.base)
    }

    /// Sorted set of delayed job ids scored by ready time.
    pub fn delayed(&self) -> String {
        format!("{}:delayed", self.base)
    }

    /// Sorted set of finished job ids scored by finish time.
    pub fn finished(&self, set: docgen_core::traits::FinishedSet) -> String {
        format!("{}:{}", self.base, set.as_str())
    }
}
