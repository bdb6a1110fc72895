//! Server configuration from `OPERATOR_PLANE_*` environment variables

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

pub const ENV_PORT: &str = "OPERATOR_PLANE_PORT";
pub const ENV_LOG_LEVEL: &str = "OPERATOR_PLANE_LOG_LEVEL";
pub const ENV_JWT_AUDIENCE: &str = "OPERATOR_PLANE_JWT_AUDIENCE";
pub const ENV_JWT_ISSUER: &str = "OPERATOR_PLANE_JWT_ISSUER";
pub const ENV_ENFORCE_JWT: &str = "OPERATOR_PLANE_ENFORCE_JWT";
pub const ENV_JWKS_URL: &str = "OPERATOR_PLANE_JWKS_URL";
pub const ENV_CONTENT_ROOT: &str = "OPERATOR_PLANE_CONTENT_ROOT";
pub const ENV_METADATA_PATH: &str = "OPERATOR_PLANE_METADATA_PATH";
pub const ENV_OPERATORS_PATH: &str = "OPERATOR_PLANE_OPERATORS_PATH";
pub const ENV_REFRESH_SECS: &str = "OPERATOR_PLANE_REFRESH_SECS";
pub const ENV_MOCK_VALIDATORS: &str = "OPERATOR_PLANE_MOCK_VALIDATORS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneConfig {
    pub port: u16,
    pub log_level: Level,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    /// Deny requests that carry no attestation JWT
    pub enforce_jwt: bool,
    /// JWKS endpoint; without it every presented JWT is rejected
    pub jwks_url: Option<String>,
    /// Accept the textual mock tokens; development only
    pub mock_validators: bool,
    pub content_root: PathBuf,
    pub metadata_path: String,
    pub operators_path: Option<PathBuf>,
    pub refresh_interval: Duration,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: Level::INFO,
            jwt_audience: String::new(),
            jwt_issuer: String::new(),
            enforce_jwt: false,
            jwks_url: None,
            mock_validators: false,
            content_root: PathBuf::from("./data"),
            metadata_path: "metadata.json".into(),
            operators_path: None,
            refresh_interval: Duration::from_secs(60),
        }
    }
}

impl PlaneConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ENV_PORT) {
            config.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_PORT, &value, "expected a port number"))?;
        }
        if let Some(value) = get(ENV_LOG_LEVEL) {
            config.log_level = value.trim().parse().map_err(|_| {
                ConfigError::invalid(ENV_LOG_LEVEL, &value, "expected trace, debug, info, warn or error")
            })?;
        }
        if let Some(value) = get(ENV_JWT_AUDIENCE) {
            config.jwt_audience = value;
        }
        if let Some(value) = get(ENV_JWT_ISSUER) {
            config.jwt_issuer = value;
        }
        if let Some(value) = get(ENV_ENFORCE_JWT) {
            config.enforce_jwt = parse_bool(&value)
                .ok_or_else(|| ConfigError::invalid(ENV_ENFORCE_JWT, &value, "expected true or false"))?;
        }
        config.jwks_url = get(ENV_JWKS_URL);
        if let Some(value) = get(ENV_MOCK_VALIDATORS) {
            config.mock_validators = parse_bool(&value).ok_or_else(|| {
                ConfigError::invalid(ENV_MOCK_VALIDATORS, &value, "expected true or false")
            })?;
        }
        if let Some(value) = get(ENV_CONTENT_ROOT) {
            config.content_root = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_METADATA_PATH) {
            config.metadata_path = value;
        }
        config.operators_path = get(ENV_OPERATORS_PATH).map(PathBuf::from);
        if let Some(value) = get(ENV_REFRESH_SECS) {
            let secs: u64 = value.trim().parse().map_err(|_| {
                ConfigError::invalid(ENV_REFRESH_SECS, &value, "expected a number of seconds")
            })?;
            if secs == 0 {
                return Err(ConfigError::invalid(ENV_REFRESH_SECS, &value, "must be positive"));
            }
            config.refresh_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<PlaneConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PlaneConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, PlaneConfig::default());
        assert_eq!(config.port, 8080);
        assert!(!config.enforce_jwt);
        assert!(config.jwks_url.is_none());
        assert!(!config.mock_validators);
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (ENV_PORT, "9090"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_JWT_AUDIENCE, "operator-plane"),
            (ENV_JWT_ISSUER, "attest.example.com"),
            (ENV_ENFORCE_JWT, "TRUE"),
            (ENV_JWKS_URL, "https://attest.example.com/jwks"),
            (ENV_CONTENT_ROOT, "/srv/content"),
            (ENV_OPERATORS_PATH, "/srv/operators.json"),
            (ENV_REFRESH_SECS, "15"),
            (ENV_MOCK_VALIDATORS, "yes"),
        ])
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.log_level, Level::DEBUG);
        assert!(config.enforce_jwt);
        assert_eq!(config.jwks_url.as_deref(), Some("https://attest.example.com/jwks"));
        assert_eq!(config.content_root, PathBuf::from("/srv/content"));
        assert_eq!(config.metadata_path, "metadata.json");
        assert_eq!(config.operators_path, Some(PathBuf::from("/srv/operators.json")));
        assert_eq!(config.refresh_interval, Duration::from_secs(15));
        assert!(config.mock_validators);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config_from(&[(ENV_PORT, "eighty")]),
            Err(ConfigError::InvalidValue { name: ENV_PORT, .. })
        ));
        assert!(config_from(&[(ENV_ENFORCE_JWT, "maybe")]).is_err());
        assert!(config_from(&[(ENV_MOCK_VALIDATORS, "sometimes")]).is_err());
        assert!(config_from(&[(ENV_REFRESH_SECS, "0")]).is_err());
        assert!(config_from(&[(ENV_LOG_LEVEL, "loud")]).is_err());
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = config_from(&[(ENV_PORT, "  "), (ENV_JWKS_URL, "")]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.jwks_url.is_none());
    }
}
