//! Validator that vouches for nothing
//!
//! Stands in where no attestation service or JWKS endpoint is configured:
//! only `trusted` operators without an attestation JWT get through.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::JwtValidationResponse;
use crate::validator::{AttestationTokenValidator, JwtValidator};

#[derive(Debug, Default, Clone, Copy)]
pub struct RejectingValidator;

impl RejectingValidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AttestationTokenValidator for RejectingValidator {
    async fn validate(&self, _user_token: &str, _attestation_token: &str) -> Result<bool> {
        Ok(false)
    }

    fn description(&self) -> &str {
        "rejecting validator"
    }
}

#[async_trait]
impl JwtValidator for RejectingValidator {
    async fn validate_jwt(
        &self,
        _jwt: &str,
        _audience: &str,
        _issuer: &str,
    ) -> Result<JwtValidationResponse> {
        Ok(JwtValidationResponse::invalid("no JWT validator configured"))
    }

    fn description(&self) -> &str {
        "rejecting validator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_everything() {
        let validator = RejectingValidator::new();
        assert!(!validator.validate("alice", "attested:alice").await.unwrap());

        let response = validator
            .validate_jwt("roles:OPERATOR", "aud", "iss")
            .await
            .unwrap();
        assert!(!response.is_valid);
        assert!(response.reason.is_some());
    }
}
