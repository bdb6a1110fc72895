//! Per-request attestation decision
//!
//! The pipeline walks an operator request through:
//!
//! ```text
//! NoIdentity                                      (deny)
//! TrustBypassed ─────────────┐
//! AttestationPending ─┬──────┴─> JwtPending ─┬──> Authorized
//!                     └─> AttestationFailed  └──> JwtFailed
//! ```
//!
//! Validator errors become denials here; nothing is retried or cached
//! across requests.

use operator_bridge::{AttestationTokenValidator, JwtValidator, RoleBasedJwtClaimValidator};
use operator_core::{role::display_roles, OperatorKey, Role};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationState {
    NoIdentity,
    TrustBypassed,
    AttestationPending,
    AttestationFailed,
    JwtPending,
    JwtFailed,
    Authorized,
}

/// Why a request was denied
///
/// Messages are for logs; clients only ever see a uniform 401.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenialReason {
    #[error("no operator identity on the request")]
    NoIdentity,

    #[error("attestation token or user token missing")]
    MissingAttestation,

    #[error("attestation token rejected")]
    AttestationRejected,

    #[error("attestation validator error: {0}")]
    AttestationError(String),

    #[error("attestation JWT required but not presented")]
    JwtMissing,

    #[error("attestation JWT invalid: {0}")]
    JwtInvalid(String),

    #[error("JWT validator error: {0}")]
    JwtError(String),

    #[error("attestation JWT lacks required roles")]
    MissingRoles {
        required: BTreeSet<Role>,
        presented: BTreeSet<Role>,
    },
}

/// Final state of one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationOutcome {
    pub state: AttestationState,
    pub denial: Option<DenialReason>,
}

impl AttestationOutcome {
    fn authorized() -> Self {
        Self {
            state: AttestationState::Authorized,
            denial: None,
        }
    }

    fn denied(state: AttestationState, reason: DenialReason) -> Self {
        Self {
            state,
            denial: Some(reason),
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.state == AttestationState::Authorized
    }
}

/// Everything the pipeline reads from one request
#[derive(Debug, Clone, Copy, Default)]
pub struct AttestationRequest<'a> {
    pub operator: Option<&'a OperatorKey>,
    pub user_token: Option<&'a str>,
    pub attestation_token: Option<&'a str>,
    pub jwt: Option<&'a str>,
}

/// Settings shared by every evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestationSettings {
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub enforce_jwt: bool,
}

pub struct AttestationPipeline {
    attestor: Arc<dyn AttestationTokenValidator>,
    jwt_validator: Arc<dyn JwtValidator>,
    settings: AttestationSettings,
}

impl AttestationPipeline {
    pub fn new(
        attestor: Arc<dyn AttestationTokenValidator>,
        jwt_validator: Arc<dyn JwtValidator>,
        settings: AttestationSettings,
    ) -> Self {
        Self {
            attestor,
            jwt_validator,
            settings,
        }
    }

    pub fn settings(&self) -> &AttestationSettings {
        &self.settings
    }

    /// Decide whether `request` may reach a handler guarded by `claims`
    pub async fn evaluate(
        &self,
        request: &AttestationRequest<'_>,
        claims: &RoleBasedJwtClaimValidator,
    ) -> AttestationOutcome {
        let Some(operator) = request.operator else {
            warn!("Attestation denied: no operator identity on request");
            return AttestationOutcome::denied(AttestationState::NoIdentity, DenialReason::NoIdentity);
        };

        let state = if operator.is_trusted() {
            AttestationState::TrustBypassed
        } else {
            AttestationState::AttestationPending
        };
        debug!(name = %operator.name(), state = ?state, "Attestation started");

        if state == AttestationState::AttestationPending {
            if let Err(reason) = self.check_attestation_token(request).await {
                return deny(operator, AttestationState::AttestationFailed, reason);
            }
        }

        debug!(name = %operator.name(), state = ?AttestationState::JwtPending, "Attestation stage passed");
        match self.check_jwt(request.jwt, claims).await {
            Ok(()) => AttestationOutcome::authorized(),
            Err(reason) => deny(operator, AttestationState::JwtFailed, reason),
        }
    }

    async fn check_attestation_token(
        &self,
        request: &AttestationRequest<'_>,
    ) -> Result<(), DenialReason> {
        let (Some(user_token), Some(attestation_token)) =
            (request.user_token, request.attestation_token)
        else {
            return Err(DenialReason::MissingAttestation);
        };

        match self.attestor.validate(user_token, attestation_token).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DenialReason::AttestationRejected),
            Err(e) => Err(DenialReason::AttestationError(e.to_string())),
        }
    }

    async fn check_jwt(
        &self,
        jwt: Option<&str>,
        claims: &RoleBasedJwtClaimValidator,
    ) -> Result<(), DenialReason> {
        let Some(jwt) = jwt.filter(|jwt| !jwt.trim().is_empty()) else {
            return if self.settings.enforce_jwt {
                Err(DenialReason::JwtMissing)
            } else {
                Ok(())
            };
        };

        let response = self
            .jwt_validator
            .validate_jwt(jwt, &self.settings.jwt_audience, &self.settings.jwt_issuer)
            .await
            .map_err(|e| DenialReason::JwtError(e.to_string()))?;

        if !response.is_valid {
            return Err(DenialReason::JwtInvalid(
                response.reason.unwrap_or_else(|| "rejected".into()),
            ));
        }
        if !claims.has_required_roles(&response) {
            return Err(DenialReason::MissingRoles {
                required: claims.required_roles().clone(),
                presented: response.roles,
            });
        }
        Ok(())
    }
}

fn deny(operator: &OperatorKey, state: AttestationState, reason: DenialReason) -> AttestationOutcome {
    match &reason {
        DenialReason::MissingRoles { required, presented } => warn!(
            site_id = ?operator.site_id(),
            name = %operator.name(),
            contact = %operator.contact(),
            required = %display_roles(required),
            presented = %display_roles(presented),
            "Attestation JWT roles do not cover the endpoint"
        ),
        _ => warn!(
            site_id = ?operator.site_id(),
            name = %operator.name(),
            contact = %operator.contact(),
            state = ?state,
            reason = %reason,
            "Attestation denied"
        ),
    }
    AttestationOutcome::denied(state, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use operator_bridge::handlers::{MockAttestationValidator, MockJwtValidator};
    use operator_core::TRUSTED_PROTOCOL;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls, then delegates to the mock
    #[derive(Default)]
    struct CountingAttestor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AttestationTokenValidator for CountingAttestor {
        async fn validate(&self, user: &str, token: &str) -> operator_bridge::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            MockAttestationValidator::new().validate(user, token).await
        }
    }

    fn operator(protocol: &str) -> OperatorKey {
        OperatorKey::builder("op-key", "op-name", "op@example.com", protocol)
            .site_id(Some(42))
            .build([Role::Operator])
            .unwrap()
    }

    fn pipeline(enforce_jwt: bool) -> (AttestationPipeline, Arc<CountingAttestor>) {
        let attestor = Arc::new(CountingAttestor::default());
        let pipeline = AttestationPipeline::new(
            attestor.clone(),
            Arc::new(MockJwtValidator::new()),
            AttestationSettings {
                enforce_jwt,
                ..Default::default()
            },
        );
        (pipeline, attestor)
    }

    fn operator_claims() -> RoleBasedJwtClaimValidator {
        RoleBasedJwtClaimValidator::new([Role::Operator])
    }

    #[tokio::test]
    async fn test_no_identity() {
        let (pipeline, attestor) = pipeline(false);
        let outcome = pipeline
            .evaluate(&AttestationRequest::default(), &operator_claims())
            .await;

        assert_eq!(outcome.state, AttestationState::NoIdentity);
        assert_eq!(outcome.denial, Some(DenialReason::NoIdentity));
        assert_eq!(attestor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_trusted_skips_attestor() {
        let (pipeline, attestor) = pipeline(false);
        let op = operator(TRUSTED_PROTOCOL);
        let request = AttestationRequest {
            operator: Some(&op),
            ..Default::default()
        };

        let outcome = pipeline.evaluate(&request, &operator_claims()).await;
        assert!(outcome.is_authorized());
        assert_eq!(attestor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_trusted_still_needs_jwt_when_enforced() {
        let (pipeline, attestor) = pipeline(true);
        assert!(pipeline.settings().enforce_jwt);
        let op = operator(TRUSTED_PROTOCOL);
        let request = AttestationRequest {
            operator: Some(&op),
            jwt: Some("   "),
            ..Default::default()
        };

        let outcome = pipeline.evaluate(&request, &operator_claims()).await;
        assert_eq!(outcome.state, AttestationState::JwtFailed);
        assert_eq!(outcome.denial, Some(DenialReason::JwtMissing));
        assert_eq!(attestor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_untrusted_attestation() {
        let (pipeline, attestor) = pipeline(false);
        let op = operator("aws-nitro");

        let missing = AttestationRequest {
            operator: Some(&op),
            user_token: Some("op-key"),
            ..Default::default()
        };
        let outcome = pipeline.evaluate(&missing, &operator_claims()).await;
        assert_eq!(outcome.state, AttestationState::AttestationFailed);
        assert_eq!(outcome.denial, Some(DenialReason::MissingAttestation));
        assert_eq!(attestor.calls.load(Ordering::SeqCst), 0);

        let rejected = AttestationRequest {
            attestation_token: Some("attested:someone-else"),
            ..missing
        };
        let outcome = pipeline.evaluate(&rejected, &operator_claims()).await;
        assert_eq!(outcome.denial, Some(DenialReason::AttestationRejected));

        let accepted = AttestationRequest {
            attestation_token: Some("attested:op-key"),
            ..missing
        };
        assert!(pipeline.evaluate(&accepted, &operator_claims()).await.is_authorized());
        assert_eq!(attestor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_attestor_error_denies() {
        let (pipeline, _) = pipeline(false);
        let op = operator("aws-nitro");
        let request = AttestationRequest {
            operator: Some(&op),
            user_token: Some("op-key"),
            attestation_token: Some("FAIL:service unavailable"),
            jwt: None,
        };

        let outcome = pipeline.evaluate(&request, &operator_claims()).await;
        assert_eq!(outcome.state, AttestationState::AttestationFailed);
        assert!(matches!(outcome.denial, Some(DenialReason::AttestationError(_))));
    }

    #[tokio::test]
    async fn test_jwt_roles() {
        let (pipeline, _) = pipeline(true);
        let op = operator(TRUSTED_PROTOCOL);
        let with_jwt = |jwt: &'static str| AttestationRequest {
            operator: Some(&op),
            jwt: Some(jwt),
            ..Default::default()
        };

        let superset = pipeline
            .evaluate(&with_jwt("roles:OPERATOR,ADMINISTRATOR"), &operator_claims())
            .await;
        assert!(superset.is_authorized());

        let missing = pipeline
            .evaluate(&with_jwt("roles:OPTOUT"), &operator_claims())
            .await;
        assert_eq!(missing.state, AttestationState::JwtFailed);
        assert_eq!(
            missing.denial,
            Some(DenialReason::MissingRoles {
                required: [Role::Operator].into(),
                presented: [Role::Optout].into(),
            })
        );

        let invalid = pipeline.evaluate(&with_jwt("INVALID"), &operator_claims()).await;
        assert!(matches!(invalid.denial, Some(DenialReason::JwtInvalid(_))));

        let error = pipeline.evaluate(&with_jwt("FAIL:jwks down"), &operator_claims()).await;
        assert!(matches!(error.denial, Some(DenialReason::JwtError(_))));
    }
}
