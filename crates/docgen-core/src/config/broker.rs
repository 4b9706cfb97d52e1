//! Message broker configuration.

use serde::{Deserialize, Serialize};

/// Top-level broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker backend: `"redis"` or `"memory"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Redis-specific settings.
    #[serde(default)]
    pub redis: RedisBrokerConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis: RedisBrokerConfig::default(),
        }
    }
}

/// Redis broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisBrokerConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all Docgen queue keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisBrokerConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_backend() -> String {
    "redis".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "docgen".to_string()
}
