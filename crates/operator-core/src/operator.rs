//! Operator identity
//!
//! An [`OperatorKey`] is the authenticated principal attached to a request
//! made by an operator enclave. It is loaded once from persisted
//! configuration; only `disabled`, `site_id`, `roles` and `operator_type` can
//! change afterwards, and role changes always re-run role normalization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::role::{Role, RoleSet};

/// Protocol tag of pre-vetted operators that skip attestation-token checks
pub const TRUSTED_PROTOCOL: &str = "trusted";

/// Deployment class of an operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperatorType {
    #[default]
    Private,
    Public,
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorType::Private => write!(f, "PRIVATE"),
            OperatorType::Public => write!(f, "PUBLIC"),
        }
    }
}

impl FromStr for OperatorType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PRIVATE" => Ok(OperatorType::Private),
            "PUBLIC" => Ok(OperatorType::Public),
            _ => Err(CoreError::UnknownOperatorType(s.to_string())),
        }
    }
}

/// An operator identity
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "OperatorKeyRecord")]
pub struct OperatorKey {
    key: String,
    name: String,
    contact: String,
    protocol: String,
    /// Epoch seconds
    created: i64,
    disabled: bool,
    site_id: Option<i32>,
    roles: RoleSet,
    operator_type: OperatorType,
}

/// Persisted form of an operator key, as found in operator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorKeyRecord {
    pub key: String,
    pub name: String,
    pub contact: String,
    pub protocol: String,
    pub created: i64,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub site_id: Option<i32>,
    #[serde(default)]
    pub roles: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub operator_type: OperatorType,
}

impl TryFrom<OperatorKeyRecord> for OperatorKey {
    type Error = CoreError;

    fn try_from(record: OperatorKeyRecord) -> Result<Self> {
        let roles = RoleSet::try_from(record.roles)?;
        Ok(OperatorKey::builder(record.key, record.name, record.contact, record.protocol)
            .created(record.created)
            .disabled(record.disabled)
            .site_id(record.site_id)
            .operator_type(record.operator_type)
            .build_with_roles(roles))
    }
}

impl fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorKey")
            .field("key", &"[redacted]")
            .field("name", &self.name)
            .field("contact", &self.contact)
            .field("protocol", &self.protocol)
            .field("created", &self.created)
            .field("disabled", &self.disabled)
            .field("site_id", &self.site_id)
            .field("roles", &self.roles)
            .field("operator_type", &self.operator_type)
            .finish()
    }
}

impl OperatorKey {
    /// Start building an operator key
    pub fn builder(
        key: impl Into<String>,
        name: impl Into<String>,
        contact: impl Into<String>,
        protocol: impl Into<String>,
    ) -> OperatorKeyBuilder {
        OperatorKeyBuilder {
            key: key.into(),
            name: name.into(),
            contact: contact.into(),
            protocol: protocol.into(),
            created: 0,
            disabled: false,
            site_id: None,
            operator_type: OperatorType::default(),
        }
    }

    /// Parse a single operator key from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Creation time in epoch seconds
    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn site_id(&self) -> Option<i32> {
        self.site_id
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn operator_type(&self) -> OperatorType {
        self.operator_type
    }

    /// Whether this operator belongs to the pre-vetted class
    pub fn is_trusted(&self) -> bool {
        self.protocol == TRUSTED_PROTOCOL
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn set_site_id(&mut self, site_id: Option<i32>) {
        self.site_id = site_id;
    }

    pub fn set_operator_type(&mut self, operator_type: OperatorType) {
        self.operator_type = operator_type;
    }

    /// Replace the role set
    ///
    /// The roles are normalized and validated first; on failure the current
    /// set is left untouched.
    pub fn set_roles<I>(&mut self, roles: I) -> Result<()>
    where
        I: IntoIterator<Item = Role>,
    {
        self.roles = RoleSet::new(roles)?;
        Ok(())
    }

    /// Consuming variant of [`OperatorKey::set_roles`]
    pub fn with_roles<I>(mut self, roles: I) -> Result<Self>
    where
        I: IntoIterator<Item = Role>,
    {
        self.set_roles(roles)?;
        Ok(self)
    }
}

/// Builder for [`OperatorKey`]
#[derive(Debug, Clone)]
pub struct OperatorKeyBuilder {
    key: String,
    name: String,
    contact: String,
    protocol: String,
    created: i64,
    disabled: bool,
    site_id: Option<i32>,
    operator_type: OperatorType,
}

impl OperatorKeyBuilder {
    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn site_id(mut self, site_id: Option<i32>) -> Self {
        self.site_id = site_id;
        self
    }

    pub fn operator_type(mut self, operator_type: OperatorType) -> Self {
        self.operator_type = operator_type;
        self
    }

    /// Build with the given roles, normalizing and validating them
    pub fn build<I>(self, roles: I) -> Result<OperatorKey>
    where
        I: IntoIterator<Item = Role>,
    {
        let roles = RoleSet::new(roles)?;
        Ok(self.build_with_roles(roles))
    }

    /// Build with an already validated role set
    pub fn build_with_roles(self, roles: RoleSet) -> OperatorKey {
        OperatorKey {
            key: self.key,
            name: self.name,
            contact: self.contact,
            protocol: self.protocol,
            created: self.created,
            disabled: self.disabled,
            site_id: self.site_id,
            roles,
            operator_type: self.operator_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RoleProfile;

    fn operator(protocol: &str) -> OperatorKey {
        OperatorKey::builder("key", "name", "contact", protocol)
            .created(1000)
            .site_id(Some(999))
            .operator_type(OperatorType::Public)
            .build([Role::Operator])
            .unwrap()
    }

    #[test]
    fn test_trusted_protocol() {
        assert!(operator("trusted").is_trusted());
        assert!(!operator("not-trusted").is_trusted());
        assert!(!operator("Trusted").is_trusted());
    }

    #[test]
    fn test_has_role() {
        let key = operator("trusted").with_roles([Role::Optout]).unwrap();
        assert!(key.has_role(Role::Operator));
        assert!(key.has_role(Role::Optout));
        assert!(!key.has_role(Role::OptoutService));
        assert!(!key.has_role(Role::Administrator));
    }

    #[test]
    fn test_failed_role_update_keeps_previous_roles() {
        let mut key = operator("trusted");
        let before = key.roles().clone();

        let result = key.set_roles([Role::Administrator]);
        assert!(matches!(result, Err(CoreError::InvalidRoleCombination { .. })));
        assert_eq!(key.roles(), &before);
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(operator("trusted"), operator("trusted"));

        let mut disabled = operator("trusted");
        disabled.set_disabled(true);
        assert_ne!(operator("trusted"), disabled);

        let mut other_site = operator("trusted");
        other_site.set_site_id(Some(1));
        assert_ne!(operator("trusted"), other_site);
    }

    #[test]
    fn test_from_json_defaults() {
        let key = OperatorKey::from_json(
            r#"{"key":"secret","name":"op","contact":"ops@example.com","protocol":"aws-nitro","created":1700000000}"#,
        )
        .unwrap();

        assert_eq!(key.name(), "op");
        assert!(!key.is_disabled());
        assert_eq!(key.site_id(), None);
        assert_eq!(key.operator_type(), OperatorType::Private);
        assert_eq!(key.roles().profile(), RoleProfile::Operator);
    }

    #[test]
    fn test_from_json_roles() {
        let key = OperatorKey::from_json(
            r#"{"key":"k","name":"n","contact":"c","protocol":"trusted","created":1,
                "disabled":true,"site_id":7,"roles":["OPTOUT_SERVICE"],"operator_type":"PUBLIC"}"#,
        )
        .unwrap();

        assert!(key.is_disabled());
        assert_eq!(key.site_id(), Some(7));
        assert_eq!(key.operator_type(), OperatorType::Public);
        assert_eq!(key.roles().profile(), RoleProfile::OptoutService);
    }

    #[test]
    fn test_from_json_invalid_roles() {
        let result = OperatorKey::from_json(
            r#"{"key":"k","name":"n","contact":"c","protocol":"trusted","created":1,"roles":["ADMINISTRATOR"]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", operator("trusted"));
        assert!(debug.contains("[redacted]"));
        assert!(!debug.contains("\"key\""));
    }
}
