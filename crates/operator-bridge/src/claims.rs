//! Role-based JWT claim checks

use operator_core::Role;
use std::collections::BTreeSet;

use crate::types::JwtValidationResponse;

/// Checks that a validated JWT asserts every role an endpoint requires
///
/// Containment, not equality: a token may carry extra roles such as
/// `ADMINISTRATOR` next to the ones required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleBasedJwtClaimValidator {
    required_roles: BTreeSet<Role>,
}

impl RoleBasedJwtClaimValidator {
    pub fn new<I>(required_roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        Self {
            required_roles: required_roles.into_iter().collect(),
        }
    }

    pub fn required_roles(&self) -> &BTreeSet<Role> {
        &self.required_roles
    }

    pub fn has_required_roles(&self, response: &JwtValidationResponse) -> bool {
        self.required_roles.is_subset(&response.roles)
    }
}
