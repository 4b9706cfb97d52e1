//! sqlx error classification.

use docgen_core::error::{AppError, ErrorKind};

/// Map a sqlx error into an [`AppError`].
///
/// Connectivity failures become `StoreUnavailable` so the queue retries the
/// attempt; everything else is a `Database` error.
pub(crate) fn map_sqlx(context: &str, err: sqlx::Error) -> AppError {
    let kind = match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => ErrorKind::StoreUnavailable,
        _ => ErrorKind::Database,
    };
    AppError::with_source(kind, format!("{context}: {err}"), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err = map_sqlx("Failed to load status", sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, ErrorKind::StoreUnavailable);
    }

    #[test]
    fn test_row_not_found_is_database() {
        let err = map_sqlx("Failed to load status", sqlx::Error::RowNotFound);
        assert_eq!(err.kind, ErrorKind::Database);
    }
}
