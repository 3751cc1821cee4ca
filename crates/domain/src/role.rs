use serde::{Deserialize, Serialize};
use tieline_core::{AppResult, NonEmptyString};

use crate::RoleId;

/// A grantable capacity one party can hold over another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    code: NonEmptyString,
    name: NonEmptyString,
    is_key_role: bool,
}

impl Role {
    /// Creates a validated role.
    pub fn new(
        id: RoleId,
        code: impl Into<String>,
        name: impl Into<String>,
        is_key_role: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            code: NonEmptyString::new(code)?,
            name: NonEmptyString::new(name)?,
            is_key_role,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the stable registry code.
    #[must_use]
    pub fn code(&self) -> &NonEmptyString {
        &self.code
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns whether holders of this role inherit the rights of the party
    /// they hold it over.
    #[must_use]
    pub fn is_key_role(&self) -> bool {
        self.is_key_role
    }
}

/// Static alias edge: holding `has_role_id` implies also holding `get_role_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMap {
    /// Role the holder already has.
    pub has_role_id: RoleId,
    /// Role the holder is granted by the alias.
    pub get_role_id: RoleId,
}

impl RoleMap {
    /// Creates an alias edge between two roles.
    #[must_use]
    pub fn new(has_role_id: RoleId, get_role_id: RoleId) -> Self {
        Self {
            has_role_id,
            get_role_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::RoleId;

    use super::Role;

    #[test]
    fn role_rejects_blank_code() {
        let result = Role::new(RoleId::new(), "", "Accountant", false);
        assert!(result.is_err());
    }

    #[test]
    fn role_carries_key_role_flag() {
        let role = Role::new(RoleId::new(), "DAGL", "Managing director", true);
        assert_eq!(role.ok().map(|value| value.is_key_role()), Some(true));
    }
}
