//! Convenience result type alias for TreeVault.

use crate::error::AppError;

/// A specialized `Result` type for TreeVault operations.
pub type AppResult<T> = Result<T, AppError>;
