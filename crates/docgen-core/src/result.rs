//! Convenience result type alias for Docgen.

use crate::error::AppError;

/// A specialized `Result` type for Docgen operations.
pub type AppResult<T> = Result<T, AppError>;
