//! Convenience result type alias for SimGuardian.

use crate::error::AppError;

/// A specialized `Result` type for SimGuardian operations.
pub type AppResult<T> = Result<T, AppError>;
