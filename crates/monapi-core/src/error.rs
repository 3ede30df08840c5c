//! Core error types.

use monapi_proto::ErrorKind;
use thiserror::Error;

/// Errors raised by the API core.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unsupported input.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Caller may not perform the operation, or the target does not exist.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Uniqueness or reference conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An internal invariant failed.
    #[error("internal error: {0}")]
    Internal(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// JSON error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] monapi_proto::Error),
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidParameter(message.into())
    }

    /// Create a permission denied error.
    pub fn denied(message: impl Into<String>) -> Self {
        Error::PermissionDenied(message.into())
    }

    /// Permission denied for a mutation target that is invisible or missing.
    pub fn no_such_object() -> Self {
        Error::PermissionDenied("No permissions to referred object or it does not exist!".into())
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParameter(_) | Error::Protocol(_) => ErrorKind::InvalidParameter,
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Internal(_) | Error::Storage(_) | Error::Json(_) => ErrorKind::Internal,
        }
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
