//! Error types for the operator model

use thiserror::Error;

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while building or decoding operator model types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Normalized role set does not match any allowed combination
    #[error("Invalid role combination for operator key. Must be one of: {allowed}")]
    InvalidRoleCombination { allowed: String },

    /// Role name is not part of the role enumeration
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Operator type is not part of the enumeration
    #[error("Unknown operator type: {0}")]
    UnknownOperatorType(String),

    /// Key material could not be decoded
    #[error("Key decode error: {0}")]
    KeyDecode(String),

    /// Timestamp out of range
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for CoreError {
    fn from(err: base64::DecodeError) -> Self {
        CoreError::KeyDecode(format!("Invalid base64 encoding: {}", err))
    }
}
