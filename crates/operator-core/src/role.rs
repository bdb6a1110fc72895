//! Roles and the closed algebra of operator role combinations
//!
//! Every operator key carries a normalized [`RoleSet`]. Normalization drops
//! unusable entries, injects the default `OPERATOR` role unless the key is an
//! opt-out service account, and then requires the result to match one of the
//! [`RoleProfile`] combinations exactly. Anything else is rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{CoreError, Result};

/// A capability tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Generator,
    Mapper,
    IdReader,
    Sharer,
    Operator,
    Optout,
    OptoutService,
    Administrator,
}

impl Role {
    /// Every role, in declaration order
    pub const ALL: [Role; 8] = [
        Role::Generator,
        Role::Mapper,
        Role::IdReader,
        Role::Sharer,
        Role::Operator,
        Role::Optout,
        Role::OptoutService,
        Role::Administrator,
    ];

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Generator => "GENERATOR",
            Role::Mapper => "MAPPER",
            Role::IdReader => "ID_READER",
            Role::Sharer => "SHARER",
            Role::Operator => "OPERATOR",
            Role::Optout => "OPTOUT",
            Role::OptoutService => "OPTOUT_SERVICE",
            Role::Administrator => "ADMINISTRATOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownRole(s.to_string()))
    }
}

/// Role every ordinary operator carries
pub const DEFAULT_ROLE: Role = Role::Operator;

/// Role designating a non-operator service account; suppresses default injection
pub const SERVICE_ACCOUNT_ROLE: Role = Role::OptoutService;

/// The allowed role combinations for an operator key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleProfile {
    /// `{OPERATOR}`
    Operator,
    /// `{OPTOUT_SERVICE}`
    OptoutService,
    /// `{OPERATOR, OPTOUT}`
    OperatorWithOptout,
    /// `{OPERATOR, OPTOUT_SERVICE}`
    ///
    /// Transitional combination slated for removal. Kept accepted until the
    /// remaining keys that carry it are migrated to `OptoutService`.
    OperatorWithOptoutService,
}

impl RoleProfile {
    pub const ALL: [RoleProfile; 4] = [
        RoleProfile::Operator,
        RoleProfile::OptoutService,
        RoleProfile::OperatorWithOptout,
        RoleProfile::OperatorWithOptoutService,
    ];

    /// Roles making up this profile
    pub fn roles(&self) -> &'static [Role] {
        match self {
            RoleProfile::Operator => &[Role::Operator],
            RoleProfile::OptoutService => &[Role::OptoutService],
            RoleProfile::OperatorWithOptout => &[Role::Operator, Role::Optout],
            RoleProfile::OperatorWithOptoutService => &[Role::Operator, Role::OptoutService],
        }
    }

    /// Find the profile that exactly matches a set of roles
    pub fn matching(roles: &BTreeSet<Role>) -> Option<RoleProfile> {
        RoleProfile::ALL.into_iter().find(|profile| {
            let expected = profile.roles();
            roles.len() == expected.len() && expected.iter().all(|r| roles.contains(r))
        })
    }

    /// Human readable list of all allowed combinations
    pub fn describe_all() -> String {
        let combos: Vec<String> = RoleProfile::ALL
            .iter()
            .map(|profile| {
                let names: Vec<&str> = profile.roles().iter().map(Role::as_str).collect();
                format!("[{}]", names.join(", "))
            })
            .collect();
        format!("[{}]", combos.join(", "))
    }
}

/// A validated, normalized operator role set
///
/// Construction always goes through [`RoleSet::normalize`], so a value of
/// this type is guaranteed to match a [`RoleProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Option<Vec<Option<String>>>", into = "Vec<Role>")]
pub struct RoleSet {
    roles: BTreeSet<Role>,
    profile: RoleProfile,
}

impl RoleSet {
    /// Normalize and validate a caller supplied collection of roles
    ///
    /// `None` entries are dropped. `OPERATOR` is added unless
    /// `OPTOUT_SERVICE` is present. The result must match a profile exactly.
    pub fn normalize<I>(roles: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<Role>>,
    {
        let mut normalized: BTreeSet<Role> = roles.into_iter().flatten().collect();
        if !normalized.contains(&SERVICE_ACCOUNT_ROLE) {
            normalized.insert(DEFAULT_ROLE);
        }

        let profile = RoleProfile::matching(&normalized).ok_or_else(|| {
            CoreError::InvalidRoleCombination {
                allowed: RoleProfile::describe_all(),
            }
        })?;

        Ok(Self {
            roles: normalized,
            profile,
        })
    }

    /// Build from concrete roles
    pub fn new<I>(roles: I) -> Result<Self>
    where
        I: IntoIterator<Item = Role>,
    {
        Self::normalize(roles.into_iter().map(Some))
    }

    /// Build from role names, dropping names that are not roles
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        Self::normalize(names.into_iter().map(|name| {
            let name = name?;
            match name.as_ref().parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    debug!(role = %name.as_ref(), "Dropping unknown role name");
                    None
                }
            }
        }))
    }

    /// Build from a profile
    pub fn from_profile(profile: RoleProfile) -> Self {
        Self {
            roles: profile.roles().iter().copied().collect(),
            profile,
        }
    }

    /// The profile this set matches
    pub fn profile(&self) -> RoleProfile {
        self.profile
    }

    /// Membership test
    pub fn contains(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Iterate roles in sorted order
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    /// Borrow the underlying set
    pub fn as_set(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl Default for RoleSet {
    fn default() -> Self {
        Self::from_profile(RoleProfile::Operator)
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.roles.iter().map(Role::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

impl TryFrom<Option<Vec<Option<String>>>> for RoleSet {
    type Error = CoreError;

    fn try_from(raw: Option<Vec<Option<String>>>) -> Result<Self> {
        Self::from_names(raw.unwrap_or_default())
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.roles.into_iter().collect()
    }
}

/// Format a plain role set for logs
pub fn display_roles(roles: &BTreeSet<Role>) -> String {
    let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
    format!("[{}]", names.join(", "))
}
