//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether `serve` also runs an embedded worker.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent job processing tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in milliseconds between queue polls when idle.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Cron expression (with seconds) for stalled-job recovery.
    #[serde(default = "default_recovery_cron")]
    pub recovery_cron: String,
    /// Cron expression (with seconds) for queue statistics logging.
    #[serde(default = "default_stats_cron")]
    pub stats_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval(),
            recovery_cron: default_recovery_cron(),
            stats_cron: default_stats_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_recovery_cron() -> String {
    "0 * * * * *".to_string()
}

fn default_stats_cron() -> String {
    "0 */5 * * * *".to_string()
}
