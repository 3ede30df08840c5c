//! Protocol error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol-level errors raised while decoding requests.
#[derive(Debug, Error)]
pub enum Error {
    /// A request parameter has the wrong shape or an unsupported value.
    #[error("invalid parameter \"{path}\": {message}")]
    InvalidParameter {
        /// Slash-separated location of the offending value (e.g. `/sortorder`).
        path: String,
        /// What is wrong with it.
        message: String,
    },

    /// JSON could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Machine-readable error category carried by every API failure.
///
/// Callers branch on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or unsupported input.
    InvalidParameter,
    /// Caller may not perform the operation, or the target does not exist.
    PermissionDenied,
    /// Uniqueness or referential conflict.
    Conflict,
    /// Broken internal invariant or storage failure.
    Internal,
}

impl ErrorKind {
    /// Stable numeric code for this kind.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::InvalidParameter => error_codes::INVALID_PARAMETER,
            ErrorKind::PermissionDenied => error_codes::PERMISSION_DENIED,
            ErrorKind::Conflict => error_codes::CONFLICT,
            ErrorKind::Internal => error_codes::INTERNAL,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidParameter => write!(f, "invalid_parameter"),
            ErrorKind::PermissionDenied => write!(f, "permission_denied"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Error codes.
pub mod error_codes {
    /// Invalid request parameters.
    pub const INVALID_PARAMETER: u32 = 100;
    /// Unknown/internal error.
    pub const INTERNAL: u32 = 111;
    /// Permission denied or target not found.
    pub const PERMISSION_DENIED: u32 = 120;
    /// Uniqueness or reference conflict.
    pub const CONFLICT: u32 = 130;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid("/limit", "a positive integer is expected");
        assert_eq!(
            err.to_string(),
            "invalid parameter \"/limit\": a positive integer is expected"
        );
    }

    #[test]
    fn test_kind_codes_are_distinct() {
        let codes = [
            ErrorKind::InvalidParameter.code(),
            ErrorKind::PermissionDenied.code(),
            ErrorKind::Conflict.code(),
            ErrorKind::Internal.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
