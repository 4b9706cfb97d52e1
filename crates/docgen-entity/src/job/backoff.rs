//! Retry delay policy attached to every job at enqueue time.

use std::time::Duration;

use docgen_core::config::{BackoffConfig, BackoffKind};
use serde::{Deserialize, Serialize};

/// Longest delay an exponential policy will produce.
const MAX_DELAY: Duration = Duration::from_secs(3600);

/// Delay strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackoffPolicy {
    /// The same delay before every retry.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// `delay_ms * 2^(attempt - 1)`, capped at one hour.
    Exponential {
        /// Base delay in milliseconds.
        delay_ms: u64,
    },
}

impl BackoffPolicy {
    /// Delay before re-delivering a job that just failed its `attempt`-th
    /// attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { delay_ms } => {
                let exponent = attempt.saturating_sub(1).min(20);
                let millis = delay_ms.saturating_mul(1u64 << exponent);
                Duration::from_millis(millis).min(MAX_DELAY)
            }
        }
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(config: &BackoffConfig) -> Self {
        match config.kind {
            BackoffKind::Fixed => Self::Fixed {
                delay_ms: config.delay_ms,
            },
            BackoffKind::Exponential => Self::Exponential {
                delay_ms: config.delay_ms,
            },
        }
    }
}
