//! Attestation JWT validators
//!
//! Verifies attestation JWTs either against a JWKS endpoint or against a
//! fixed key, and extracts the `roles` claim.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use operator_core::Role;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::types::JwtValidationResponse;
use crate::validator::JwtValidator;

/// JWKS (JSON Web Key Set) document
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// Individual JWK (JSON Web Key)
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key ID
    pub kid: Option<String>,
    /// Key type
    pub kty: String,
    /// Use (sig for signing)
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus
    pub n: Option<String>,
    /// RSA exponent
    pub e: Option<String>,
    /// EC x coordinate
    pub x: Option<String>,
    /// EC y coordinate
    pub y: Option<String>,
}

/// Claims read from an attestation JWT
#[derive(Debug, Deserialize)]
struct AttestationClaims {
    sub: Option<String>,
    exp: Option<i64>,
    /// Array of role names or a comma separated string
    roles: Option<serde_json::Value>,
}

/// Decode and verify `jwt`, mapping trust failures to an invalid response
///
/// An empty `audience` or `issuer` disables that check.
fn verify_claims(
    jwt: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
    audience: &str,
    issuer: &str,
) -> Result<JwtValidationResponse> {
    let mut validation = Validation::new(algorithm);
    if audience.is_empty() {
        validation.validate_aud = false;
    } else {
        validation.set_audience(&[audience]);
    }
    if !issuer.is_empty() {
        validation.set_issuer(&[issuer]);
    }

    let claims = match decode::<AttestationClaims>(jwt, key, &validation) {
        Ok(data) => data.claims,
        Err(err) => {
            return match err.kind() {
                ErrorKind::ExpiredSignature
                | ErrorKind::ImmatureSignature
                | ErrorKind::InvalidSignature
                | ErrorKind::InvalidAudience
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::MissingRequiredClaim(_) => {
                    Ok(JwtValidationResponse::invalid(err.to_string()))
                }
                _ => Err(BridgeError::InvalidFormat(err.to_string())),
            };
        }
    };

    let mut response = JwtValidationResponse::valid().with_roles(parse_roles(claims.roles.as_ref()));
    if let Some(sub) = claims.sub {
        response = response.with_subject(sub);
    }
    if let Some(exp_time) = claims.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single()) {
        response = response.with_expires_at(exp_time);
    }
    Ok(response)
}

/// Read the `roles` claim, ignoring names that are not roles
fn parse_roles(value: Option<&serde_json::Value>) -> BTreeSet<Role> {
    let names: Vec<&str> = match value {
        Some(serde_json::Value::Array(items)) => items.iter().filter_map(|v| v.as_str()).collect(),
        Some(serde_json::Value::String(s)) => s.split(',').collect(),
        _ => Vec::new(),
    };

    names
        .into_iter()
        .filter(|name| !name.trim().is_empty())
        .filter_map(|name| match name.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                debug!(role = %name, "Ignoring unknown role in JWT");
                None
            }
        })
        .collect()
}

/// Validates JWTs against keys published at a JWKS URL
pub struct JwksJwtValidator {
    jwks_url: String,
    algorithms: Vec<Algorithm>,
    /// JWKS cache (url -> JWKS)
    jwks_cache: Cache<String, Arc<Jwks>>,
    http_client: reqwest::Client,
}

impl JwksJwtValidator {
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            algorithms: vec![Algorithm::RS256, Algorithm::ES256],
            jwks_cache: Cache::builder()
                .time_to_live(Duration::from_secs(3600))
                .max_capacity(8)
                .build(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Restrict the accepted signing algorithms
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Set the JWKS cache lifetime
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache = Cache::builder().time_to_live(ttl).max_capacity(8).build();
        self
    }

    /// Fetch the JWKS (with caching)
    async fn fetch_jwks(&self) -> Result<Arc<Jwks>> {
        if let Some(cached) = self.jwks_cache.get(&self.jwks_url).await {
            debug!(url = %self.jwks_url, "Using cached JWKS");
            return Ok(cached);
        }

        debug!(url = %self.jwks_url, "Fetching JWKS");
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| BridgeError::JwksFetchError(e.to_string()))?;

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| BridgeError::JwksFetchError(e.to_string()))?;

        let jwks = Arc::new(jwks);
        self.jwks_cache.insert(self.jwks_url.clone(), jwks.clone()).await;
        Ok(jwks)
    }

    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey> {
        let jwks = self.fetch_jwks().await?;
        match find_key(&jwks, kid) {
            Ok(jwk) => decoding_key_from_jwk(jwk),
            Err(BridgeError::KeyNotFound(_)) => {
                // Signing key may have rotated since the JWKS was cached
                self.jwks_cache.invalidate(&self.jwks_url).await;
                let jwks = self.fetch_jwks().await?;
                decoding_key_from_jwk(find_key(&jwks, kid)?)
            }
            Err(e) => Err(e),
        }
    }
}

/// Find a key in a JWKS by key ID
pub fn find_key<'a>(jwks: &'a Jwks, kid: Option<&str>) -> Result<&'a Jwk> {
    match kid {
        Some(kid) => jwks
            .keys
            .iter()
            .find(|k| k.kid.as_deref() == Some(kid))
            .ok_or_else(|| BridgeError::KeyNotFound(kid.to_string())),
        None => jwks
            .keys
            .iter()
            .find(|k| k.key_use.as_deref() == Some("sig") || k.key_use.is_none())
            .ok_or_else(|| BridgeError::KeyNotFound("no signing key found".to_string())),
    }
}

/// Create a decoding key from a JWK
pub fn decoding_key_from_jwk(jwk: &Jwk) -> Result<DecodingKey> {
    match jwk.kty.as_str() {
        "RSA" => {
            let n = jwk
                .n
                .as_ref()
                .ok_or_else(|| BridgeError::InvalidFormat("Missing RSA modulus".into()))?;
            let e = jwk
                .e
                .as_ref()
                .ok_or_else(|| BridgeError::InvalidFormat("Missing RSA exponent".into()))?;
            DecodingKey::from_rsa_components(n, e)
                .map_err(|e| BridgeError::InvalidFormat(e.to_string()))
        }
        "EC" => {
            let x = jwk
                .x
                .as_ref()
                .ok_or_else(|| BridgeError::InvalidFormat("Missing EC x coordinate".into()))?;
            let y = jwk
                .y
                .as_ref()
                .ok_or_else(|| BridgeError::InvalidFormat("Missing EC y coordinate".into()))?;
            DecodingKey::from_ec_components(x, y)
                .map_err(|e| BridgeError::InvalidFormat(e.to_string()))
        }
        kty => Err(BridgeError::UnsupportedAlgorithm(format!("Key type: {}", kty))),
    }
}

#[async_trait]
impl JwtValidator for JwksJwtValidator {
    async fn validate_jwt(
        &self,
        jwt: &str,
        audience: &str,
        issuer: &str,
    ) -> Result<JwtValidationResponse> {
        let header = decode_header(jwt).map_err(|e| BridgeError::InvalidFormat(e.to_string()))?;

        if !self.algorithms.contains(&header.alg) {
            return Ok(JwtValidationResponse::invalid(format!(
                "algorithm {:?} not accepted",
                header.alg
            )));
        }

        let key = self.decoding_key(header.kid.as_deref()).await?;
        verify_claims(jwt, &key, header.alg, audience, issuer)
    }

    fn description(&self) -> &str {
        "JWKS JWT validator"
    }
}

/// Validates JWTs against a single fixed key
pub struct StaticKeyJwtValidator {
    key: DecodingKey,
    algorithm: Algorithm,
}

impl StaticKeyJwtValidator {
    pub fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
        Self { key, algorithm }
    }

    /// HS256 shared secret
    pub fn from_secret(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    /// RS256 public key in PEM form
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|e| BridgeError::InvalidFormat(e.to_string()))?;
        Ok(Self::new(key, Algorithm::RS256))
    }
}

#[async_trait]
impl JwtValidator for StaticKeyJwtValidator {
    async fn validate_jwt(
        &self,
        jwt: &str,
        audience: &str,
        issuer: &str,
    ) -> Result<JwtValidationResponse> {
        let header = decode_header(jwt).map_err(|e| BridgeError::InvalidFormat(e.to_string()))?;
        if header.alg != self.algorithm {
            return Ok(JwtValidationResponse::invalid(format!(
                "algorithm {:?} not accepted",
                header.alg
            )));
        }
        verify_claims(jwt, &self.key, self.algorithm, audience, issuer)
    }

    fn description(&self) -> &str {
        "static key JWT validator"
    }
}
