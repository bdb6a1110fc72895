//! Core types for the validator bridge

use chrono::{DateTime, Utc};
use operator_core::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of validating an attestation JWT
///
/// `is_valid == false` means the token was well formed but must not be
/// trusted (bad signature, expired, wrong audience or issuer). Tokens that
/// cannot be processed at all are reported as errors instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtValidationResponse {
    pub is_valid: bool,

    /// Roles asserted by the token
    #[serde(default)]
    pub roles: BTreeSet<Role>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Why the token was rejected, for logs only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl JwtValidationResponse {
    pub fn new(is_valid: bool) -> Self {
        Self {
            is_valid,
            roles: BTreeSet::new(),
            subject: None,
            expires_at: None,
            reason: None,
        }
    }

    pub fn valid() -> Self {
        Self::new(true)
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::new(false).with_reason(reason)
    }

    pub fn with_roles<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
