//! Unified application error types for Docgen.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (concurrent modification, stale state, etc.).
    Conflict,
    /// A generation for the same thesis is already pending or processing.
    AlreadyInProgress,
    /// An internal server error occurred.
    Internal,
    /// A database query failed.
    Database,
    /// The message broker rejected or failed an operation.
    Broker,
    /// The persistence layer could not be reached.
    StoreUnavailable,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// The external provider failed or could not be reached.
    ExternalService,
    /// A bounded wait elapsed before the awaited work finished.
    Timeout,
    /// The provider returned output that could not be parsed.
    ResponseFormat,
    /// The provider no longer knows the referenced operation.
    HandleExpired,
    /// The service is temporarily unavailable.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Whether a job failing with this kind should be retried by the queue.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Database
                | Self::Broker
                | Self::StoreUnavailable
                | Self::ExternalService
                | Self::Timeout
                | Self::ResponseFormat
                | Self::ServiceUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::AlreadyInProgress => write!(f, "ALREADY_IN_PROGRESS"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Database => write!(f, "DATABASE"),
            Self::Broker => write!(f, "BROKER"),
            Self::StoreUnavailable => write!(f, "STORE_UNAVAILABLE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::ResponseFormat => write!(f, "RESPONSE_FORMAT"),
            Self::HandleExpired => write!(f, "HANDLE_EXPIRED"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
        }
    }
}

/// The unified application error used throughout Docgen.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an already-in-progress error.
    pub fn already_in_progress(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyInProgress, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a broker error.
    pub fn broker(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Broker, message)
    }

    /// Create a store-unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreUnavailable, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an external-service error.
    pub fn external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create a response-format error.
    pub fn response_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResponseFormat, message)
    }

    /// Create a handle-expired error.
    pub fn handle_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandleExpired, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(feature = "axum")]
pub use self::http::{ApiErrorResponse, status_for};

/// Maps domain `AppError` to HTTP responses.
#[cfg(feature = "axum")]
mod http {
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use serde::{Deserialize, Serialize};

    use super::{AppError, ErrorKind};

    /// Standard API error response body.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ApiErrorResponse {
        /// Machine-readable error code.
        pub error: String,
        /// Human-readable message.
        pub message: String,
        /// Optional details.
        pub details: Option<serde_json::Value>,
    }

    /// HTTP status for an error kind.
    pub fn status_for(kind: ErrorKind) -> StatusCode {
        match kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::AlreadyInProgress => StatusCode::CONFLICT,
            ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::HandleExpired => StatusCode::GONE,
            ErrorKind::ResponseFormat | ErrorKind::ExternalService => StatusCode::BAD_GATEWAY,
            ErrorKind::StoreUnavailable | ErrorKind::Broker | ErrorKind::ServiceUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorKind::Internal
            | ErrorKind::Database
            | ErrorKind::Configuration
            | ErrorKind::Serialization => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = status_for(self.kind);
            if status.is_server_error() {
                tracing::error!(kind = %self.kind, error = %self, "Request failed");
            }

            let body = ApiErrorResponse {
                error: self.kind.to_string(),
                message: self.message.clone(),
                details: None,
            };

            (status, Json(body)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = AppError::validation("domain id is required");
        assert_eq!(err.to_string(), "VALIDATION: domain id is required");
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::StoreUnavailable.is_retryable());
        assert!(ErrorKind::ResponseFormat.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::HandleExpired.is_retryable());
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::other("boom");
        let err = AppError::with_source(ErrorKind::Database, "query failed", io);
        assert!(std::error::Error::source(&err).is_some());
        let cloned = err.clone();
        assert_eq!(cloned.kind, ErrorKind::Database);
        assert!(cloned.source.is_none());
    }
}
