//! Error types for the validator bridge

use thiserror::Error;

/// Result type for validator operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors reported by attestation-token and JWT validators
///
/// These never reach an HTTP client directly; the attestation pipeline turns
/// every one of them into a denial.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Validation could not be completed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Token is structurally malformed
    #[error("Invalid token format: {0}")]
    InvalidFormat(String),

    /// JWKS fetch error
    #[error("Failed to fetch JWKS: {0}")]
    JwksFetchError(String),

    /// Key not found in JWKS
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Unsupported key type or algorithm
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Attestation service could not be reached or answered garbage
    #[error("Attestation service error: {0}")]
    AttestationService(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        BridgeError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::InvalidFormat(err.to_string())
    }
}
