//! Convenience result type alias for Lockbox.

use crate::error::AppError;

/// A specialized `Result` type for Lockbox operations.
pub type AppResult<T> = Result<T, AppError>;
