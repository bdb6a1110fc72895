//! Validator seams consumed by the attestation pipeline

use async_trait::async_trait;

use crate::error::Result;
use crate::types::JwtValidationResponse;

/// Validates the opaque attestation token an operator enclave presents
///
/// The token format belongs to the attestation service; callers only learn
/// whether it vouches for the given user token.
#[async_trait]
pub trait AttestationTokenValidator: Send + Sync {
    /// Returns `Ok(true)` when `attestation_token` attests `user_token`
    async fn validate(&self, user_token: &str, attestation_token: &str) -> Result<bool>;

    /// Get a description of this validator (for logging)
    fn description(&self) -> &str {
        "attestation token validator"
    }
}

/// Validates attestation JWTs and extracts the roles they assert
#[async_trait]
pub trait JwtValidator: Send + Sync {
    /// Validate `jwt` for the given audience and issuer
    ///
    /// # Returns
    /// * `Ok(response)` - the token was processed; check `is_valid`
    /// * `Err(BridgeError)` - the token could not be processed
    async fn validate_jwt(
        &self,
        jwt: &str,
        audience: &str,
        issuer: &str,
    ) -> Result<JwtValidationResponse>;

    /// Get a description of this validator (for logging)
    fn description(&self) -> &str {
        "JWT validator"
    }
}
