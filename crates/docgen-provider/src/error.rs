//! Provider and poller error types.

use docgen_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Failure talking to the external provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or connection failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The HTTP request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The addressed resource does not exist (or no longer exists).
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider answered with a body we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The client is misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Check if repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::NotFound(_) | Self::InvalidResponse(_) | Self::Configuration(_) => false,
        }
    }

    /// Whether the provider reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            Self::Configuration(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        let kind = match &err {
            ProviderError::NotFound(_) => ErrorKind::NotFound,
            ProviderError::InvalidResponse(_) => ErrorKind::ResponseFormat,
            ProviderError::Configuration(_) => ErrorKind::Configuration,
            ProviderError::Transport(_) | ProviderError::Timeout(_) | ProviderError::Status { .. } => {
                ErrorKind::ExternalService
            }
        };
        AppError::with_source(kind, format!("Provider error: {err}"), err)
    }
}

/// Failure of a single poll attempt.
#[derive(Debug, Error)]
pub enum PollError {
    /// Every retrieval strategy failed. Carries the primary strategy's
    /// error and, when one ran, the last fallback error.
    #[error("operation retrieval failed: {primary}")]
    Transport {
        /// Error of the first strategy.
        #[source]
        primary: ProviderError,
        /// Error of the last fallback strategy.
        fallback: Option<ProviderError>,
    },

    /// No strategy could find the operation; it must be submitted again.
    #[error("operation {name} is no longer known to the provider")]
    HandleExpired {
        /// Operation name.
        name: String,
    },

    /// The caller stopped waiting.
    #[error("polling cancelled")]
    Cancelled,
}

impl PollError {
    /// Check if the next attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { primary, .. } => !matches!(primary, ProviderError::Configuration(_)),
            Self::HandleExpired { .. } | Self::Cancelled => false,
        }
    }
}

impl From<PollError> for AppError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::HandleExpired { ref name } => AppError::handle_expired(format!(
                "Operation {name} expired at the provider; submit the generation again"
            )),
            PollError::Cancelled => AppError::service_unavailable("Polling was cancelled"),
            PollError::Transport { .. } => AppError::with_source(
                ErrorKind::ExternalService,
                format!("Polling failed: {err}"),
                err,
            ),
        }
    }
}
