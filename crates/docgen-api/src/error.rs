//! Maps domain `AppError` to HTTP responses.
//!
//! The `IntoResponse` impl lives in `docgen-core` (feature `axum`) because the
//! orphan rule forbids implementing a foreign trait for a foreign type here.

pub use docgen_core::error::{ApiErrorResponse, status_for};

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use docgen_core::error::ErrorKind;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::HandleExpired), StatusCode::GONE);
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            status_for(ErrorKind::StoreUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_for(ErrorKind::ResponseFormat), StatusCode::BAD_GATEWAY);
    }
}
