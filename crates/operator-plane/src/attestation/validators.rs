//! Validator selection for the server binary

use operator_bridge::handlers::{
    JwksJwtValidator, MockAttestationValidator, MockJwtValidator, RejectingValidator,
};
use operator_bridge::{AttestationTokenValidator, JwtValidator};
use std::sync::Arc;
use tracing::warn;

use super::pipeline::AttestationSettings;
use crate::config::PlaneConfig;

pub struct Validators {
    pub attestor: Arc<dyn AttestationTokenValidator>,
    pub jwt: Arc<dyn JwtValidator>,
}

/// Pick validators for `config`
///
/// Mock validators are used only when explicitly enabled. Otherwise no
/// attestation token is accepted, and JWTs are checked against the JWKS
/// endpoint when one is configured and rejected when not.
pub fn select_validators(config: &PlaneConfig) -> Validators {
    let attestor: Arc<dyn AttestationTokenValidator> = if config.mock_validators {
        warn!("Mock validators enabled, attestation tokens are not verified");
        Arc::new(MockAttestationValidator::new())
    } else {
        warn!("No attestation service configured, only trusted operators can attest");
        Arc::new(RejectingValidator::new())
    };

    let jwt: Arc<dyn JwtValidator> = match (&config.jwks_url, config.mock_validators) {
        (Some(url), _) => Arc::new(JwksJwtValidator::new(url.clone())),
        (None, true) => Arc::new(MockJwtValidator::new()),
        (None, false) => {
            warn!("OPERATOR_PLANE_JWKS_URL not set, every attestation JWT will be rejected");
            Arc::new(RejectingValidator::new())
        }
    };

    Validators { attestor, jwt }
}

impl From<&PlaneConfig> for AttestationSettings {
    fn from(config: &PlaneConfig) -> Self {
        Self {
            jwt_audience: config.jwt_audience.clone(),
            jwt_issuer: config.jwt_issuer.clone(),
            enforce_jwt: config.enforce_jwt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reject() {
        let validators = select_validators(&PlaneConfig::default());
        assert_eq!(validators.attestor.description(), "rejecting validator");
        assert_eq!(validators.jwt.description(), "rejecting validator");
    }

    #[test]
    fn test_mock_is_opt_in() {
        let config = PlaneConfig {
            mock_validators: true,
            ..Default::default()
        };
        let validators = select_validators(&config);
        assert_eq!(validators.attestor.description(), "mock attestation validator");
        assert_eq!(validators.jwt.description(), "mock JWT validator");
    }

    #[test]
    fn test_jwks_wins_over_mock_jwt() {
        let config = PlaneConfig {
            mock_validators: true,
            jwks_url: Some("https://attest.example.com/jwks".into()),
            ..Default::default()
        };
        assert_eq!(select_validators(&config).jwt.description(), "JWKS JWT validator");
    }

    #[test]
    fn test_settings_from_config() {
        let config = PlaneConfig {
            jwt_audience: "operator-plane".into(),
            enforce_jwt: true,
            ..Default::default()
        };
        let settings = AttestationSettings::from(&config);
        assert_eq!(settings.jwt_audience, "operator-plane");
        assert!(settings.jwt_issuer.is_empty());
        assert!(settings.enforce_jwt);
    }
}
