//! Convenience result type alias for the pulse node.

use crate::error::AppError;

/// A specialized `Result` type for node operations.
pub type AppResult<T> = Result<T, AppError>;
