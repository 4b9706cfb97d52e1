//! External generation provider configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Gemini-compatible provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key sent as `x-goog-api-key`.
    #[serde(default)]
    pub api_key: String,
    /// Model used for document, quiz, and query generation.
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    /// Model used for embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum output tokens per generation call.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Timeout of a single HTTP request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Sleep between two polls of a long-running operation.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// How long one worker attempt waits on an operation before handing
    /// off to a continuation job.
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: u64,
}

impl ProviderConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-attempt wait budget as a [`Duration`].
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_seconds)
    }

    /// HTTP request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_seconds: default_request_timeout(),
            poll_interval_ms: default_poll_interval(),
            max_wait_seconds: default_max_wait(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_generation_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    65536
}

fn default_request_timeout() -> u64 {
    600
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_max_wait() -> u64 {
    600
}
