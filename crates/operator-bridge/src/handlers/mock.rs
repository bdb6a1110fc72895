//! Mock validators
//!
//! For local development and testing - accept tokens in a fixed textual
//! format instead of talking to an attestation service.

use async_trait::async_trait;
use operator_core::Role;

use crate::error::{BridgeError, Result};
use crate::types::JwtValidationResponse;
use crate::validator::{AttestationTokenValidator, JwtValidator};

/// Mock attestation-token validator
///
/// Accepts attestation tokens in the format:
/// - "attested:<user token>" - valid for exactly that user token
/// - "FAIL:message" - returns an error with the given message
///
/// Anything else is reported as not attested.
pub struct MockAttestationValidator;

impl MockAttestationValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockAttestationValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttestationTokenValidator for MockAttestationValidator {
    async fn validate(&self, user_token: &str, attestation_token: &str) -> Result<bool> {
        if let Some(message) = attestation_token.strip_prefix("FAIL:") {
            return Err(BridgeError::AttestationService(message.to_string()));
        }

        Ok(attestation_token
            .strip_prefix("attested:")
            .is_some_and(|attested| attested == user_token))
    }

    fn description(&self) -> &str {
        "mock attestation validator"
    }
}

/// Mock JWT validator
///
/// Accepts JWTs in the format:
/// - "roles:OPERATOR,OPTOUT" - valid, asserting the listed roles
/// - "INVALID" - processed but not valid
/// - "FAIL:message" - returns an error with the given message
///
/// Audience and issuer are ignored.
pub struct MockJwtValidator;

impl MockJwtValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockJwtValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JwtValidator for MockJwtValidator {
    async fn validate_jwt(
        &self,
        jwt: &str,
        _audience: &str,
        _issuer: &str,
    ) -> Result<JwtValidationResponse> {
        if let Some(message) = jwt.strip_prefix("FAIL:") {
            return Err(BridgeError::ValidationFailed(message.to_string()));
        }
        if jwt == "INVALID" {
            return Ok(JwtValidationResponse::invalid("mock invalid token"));
        }

        let roles = jwt.strip_prefix("roles:").ok_or_else(|| {
            BridgeError::InvalidFormat("Mock JWT must start with 'roles:'".into())
        })?;

        let roles = roles
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .map(|name| name.parse::<Role>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::InvalidFormat(e.to_string()))?;

        Ok(JwtValidationResponse::valid()
            .with_roles(roles)
            .with_subject("mock"))
    }

    fn description(&self) -> &str {
        "mock JWT validator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attestation_matches_user_token() {
        let validator = MockAttestationValidator::new();
        assert!(validator.validate("alice", "attested:alice").await.unwrap());
        assert!(!validator.validate("bob", "attested:alice").await.unwrap());
        assert!(!validator.validate("alice", "garbage").await.unwrap());
    }

    #[tokio::test]
    async fn test_attestation_explicit_failure() {
        let validator = MockAttestationValidator::new();
        match validator.validate("alice", "FAIL:down").await {
            Err(BridgeError::AttestationService(msg)) => assert_eq!(msg, "down"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_jwt_roles() {
        let validator = MockJwtValidator::new();
        let response = validator
            .validate_jwt("roles:OPERATOR,OPTOUT", "aud", "iss")
            .await
            .unwrap();
        assert!(response.is_valid);
        assert!(response.roles.contains(&Role::Operator));
        assert!(response.roles.contains(&Role::Optout));

        let empty = validator.validate_jwt("roles:", "aud", "iss").await.unwrap();
        assert!(empty.is_valid);
        assert!(empty.roles.is_empty());
    }

    #[tokio::test]
    async fn test_jwt_invalid_and_failure() {
        let validator = MockJwtValidator::new();
        assert!(!validator.validate_jwt("INVALID", "a", "i").await.unwrap().is_valid);
        assert!(validator.validate_jwt("FAIL:boom", "a", "i").await.is_err());
        assert!(validator.validate_jwt("roles:WIZARD", "a", "i").await.is_err());
        assert!(validator.validate_jwt("eyJhbGciOi", "a", "i").await.is_err());
    }
}
