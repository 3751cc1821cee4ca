use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tieline_core::AppError;

use crate::{
    Assignment, AssignmentId, Delegation, DelegationId, Package, Party, PartyId, Resource, Role,
    RoleId,
};

/// Rule that produced a derived connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionReason {
    /// The connection is an assignment row itself.
    Assignment,
    /// The connection was inherited through a key role.
    KeyRole,
    /// The connection was propagated one hop down the party hierarchy.
    Hierarchy,
    /// The connection was produced by a role alias.
    RoleMap,
    /// The connection was forwarded by a delegation.
    Delegation,
}

impl ConnectionReason {
    /// Returns a stable storage value for this reason.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::KeyRole => "key_role",
            Self::Hierarchy => "hierarchy",
            Self::RoleMap => "role_map",
            Self::Delegation => "delegation",
        }
    }
}

impl FromStr for ConnectionReason {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "assignment" => Ok(Self::Assignment),
            "key_role" => Ok(Self::KeyRole),
            "hierarchy" => Ok(Self::Hierarchy),
            "role_map" => Ok(Self::RoleMap),
            "delegation" => Ok(Self::Delegation),
            _ => Err(AppError::Validation(format!(
                "unknown connection reason '{value}'"
            ))),
        }
    }
}

/// Composite key identifying a connection within one result set.
///
/// Capability lookups re-attach to connections through this key instead of
/// re-deriving the base graph; several tuples may share one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    /// Party the access is held over.
    pub from_id: PartyId,
    /// Party holding the access.
    pub to_id: PartyId,
    /// Role carried by the connection, unset for delegation rows.
    pub role_id: Option<RoleId>,
    /// Assignment the connection was derived from, when rule-based.
    pub assignment_id: Option<AssignmentId>,
    /// Delegation the connection was forwarded by, when delegation-based.
    pub delegation_id: Option<DelegationId>,
    /// Intermediate party the access passed through.
    pub via_id: Option<PartyId>,
    /// Role held over the intermediate party.
    pub via_role_id: Option<RoleId>,
}

/// One derived authorization relationship, tagged with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionTuple {
    /// Assignment the tuple was derived from, when rule-based.
    pub assignment_id: Option<AssignmentId>,
    /// Delegation the tuple was forwarded by, when delegation-based.
    pub delegation_id: Option<DelegationId>,
    /// Party the access is held over.
    pub from_id: PartyId,
    /// Party holding the access.
    pub to_id: PartyId,
    /// Role carried by the tuple, unset for delegation rows.
    pub role_id: Option<RoleId>,
    /// Intermediate party the access passed through.
    pub via_id: Option<PartyId>,
    /// Role held over the intermediate party.
    pub via_role_id: Option<RoleId>,
    /// Rule that produced the tuple.
    pub reason: ConnectionReason,
    /// Whether key-role inheritance contributed to the tuple.
    pub is_key_role_access: bool,
    /// Whether a role alias contributed to the tuple.
    pub is_role_map: bool,
}

impl ConnectionTuple {
    /// Tuple for an assignment row itself.
    #[must_use]
    pub fn direct(assignment: &Assignment) -> Self {
        Self {
            assignment_id: Some(assignment.id),
            delegation_id: None,
            from_id: assignment.from_id,
            to_id: assignment.to_id,
            role_id: Some(assignment.role_id),
            via_id: None,
            via_role_id: None,
            reason: ConnectionReason::Assignment,
            is_key_role_access: false,
            is_role_map: false,
        }
    }

    /// Tuple inherited by the holder of a key role.
    ///
    /// `granting` lands on the party `key_assignment` is held over; the key
    /// role holder inherits it with the intermediate party recorded as via.
    #[must_use]
    pub fn key_role(granting: &Assignment, key_assignment: &Assignment) -> Self {
        Self {
            assignment_id: Some(granting.id),
            delegation_id: None,
            from_id: granting.from_id,
            to_id: key_assignment.to_id,
            role_id: Some(granting.role_id),
            via_id: Some(key_assignment.from_id),
            via_role_id: Some(key_assignment.role_id),
            reason: ConnectionReason::KeyRole,
            is_key_role_access: true,
            is_role_map: false,
        }
    }

    /// Tuple propagated one hierarchy hop to a child of this tuple's `from`.
    #[must_use]
    pub fn hierarchy_hop(&self, child_id: PartyId, reason: ConnectionReason) -> Self {
        Self {
            from_id: child_id,
            via_id: Some(self.from_id),
            reason,
            ..*self
        }
    }

    /// Tuple re-emitted under an aliased role.
    #[must_use]
    pub fn role_alias(&self, get_role_id: RoleId, reason: ConnectionReason) -> Self {
        Self {
            role_id: Some(get_role_id),
            reason,
            is_role_map: true,
            ..*self
        }
    }

    /// Tuple forwarded by a delegation from the granting party to the
    /// receiving assignment's holder.
    ///
    /// The role is left unset: delegated access is carried entirely by the
    /// capabilities attached to the delegation.
    #[must_use]
    pub fn delegation(
        delegation: &Delegation,
        from_assignment: &Assignment,
        to_assignment: &Assignment,
    ) -> Self {
        Self {
            assignment_id: None,
            delegation_id: Some(delegation.id),
            from_id: from_assignment.from_id,
            to_id: to_assignment.to_id,
            role_id: None,
            via_id: Some(from_assignment.to_id),
            via_role_id: None,
            reason: ConnectionReason::Delegation,
            is_key_role_access: false,
            is_role_map: false,
        }
    }

    /// Delegation tuple whose receiving assignment carries a key role.
    #[must_use]
    pub fn delegation_key_role(
        delegation: &Delegation,
        from_assignment: &Assignment,
        to_assignment: &Assignment,
    ) -> Self {
        Self {
            via_role_id: Some(to_assignment.role_id),
            reason: ConnectionReason::KeyRole,
            is_key_role_access: true,
            ..Self::delegation(delegation, from_assignment, to_assignment)
        }
    }

    /// Tuple forwarded to this tuple's holder by a delegation targeting the
    /// tuple's underlying assignment.
    #[must_use]
    pub fn delegated(&self, delegation: &Delegation, from_assignment: &Assignment) -> Self {
        Self {
            assignment_id: None,
            delegation_id: Some(delegation.id),
            from_id: from_assignment.from_id,
            to_id: self.to_id,
            role_id: None,
            via_id: Some(from_assignment.to_id),
            via_role_id: None,
            reason: ConnectionReason::Delegation,
            is_key_role_access: self.is_key_role_access,
            is_role_map: self.is_role_map,
        }
    }

    /// Returns the composite key used to re-attach capability data.
    #[must_use]
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            from_id: self.from_id,
            to_id: self.to_id,
            role_id: self.role_id,
            assignment_id: self.assignment_id,
            delegation_id: self.delegation_id,
            via_id: self.via_id,
            via_role_id: self.via_role_id,
        }
    }
}

/// Package attached to a connection, optionally expanded into its resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionPackage {
    /// The attached package.
    pub package: Package,
    /// Resources contained in the package, when expansion was requested.
    pub resources: Vec<Resource>,
}

/// Final projection of one effective authorization relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionRecord {
    /// Assignment the connection was derived from, when rule-based.
    pub assignment_id: Option<AssignmentId>,
    /// Delegation the connection was forwarded by, when delegation-based.
    pub delegation_id: Option<DelegationId>,
    /// Party the access is held over.
    pub from_id: PartyId,
    /// Party holding the access.
    pub to_id: PartyId,
    /// Role carried by the connection, unset for delegation rows.
    pub role_id: Option<RoleId>,
    /// Intermediate party the access passed through.
    pub via_id: Option<PartyId>,
    /// Role held over the intermediate party.
    pub via_role_id: Option<RoleId>,
    /// Rule that produced the connection.
    pub reason: ConnectionReason,
    /// Enriched `from` party, present when enrichment was requested.
    pub from_party: Option<Party>,
    /// Enriched `to` party, present when enrichment was requested.
    pub to_party: Option<Party>,
    /// Enriched via party, present when enrichment was requested.
    pub via_party: Option<Party>,
    /// Enriched role, present when enrichment was requested.
    pub role: Option<Role>,
    /// Enriched via role, present when enrichment was requested.
    pub via_role: Option<Role>,
    /// Attached packages, empty unless requested.
    pub packages: Vec<ConnectionPackage>,
    /// Attached resources, empty unless requested.
    pub resources: Vec<Resource>,
}

impl ConnectionRecord {
    /// Projects a bare tuple into a record with no enrichment attached.
    #[must_use]
    pub fn from_tuple(tuple: &ConnectionTuple) -> Self {
        Self {
            assignment_id: tuple.assignment_id,
            delegation_id: tuple.delegation_id,
            from_id: tuple.from_id,
            to_id: tuple.to_id,
            role_id: tuple.role_id,
            via_id: tuple.via_id,
            via_role_id: tuple.via_role_id,
            reason: tuple.reason,
            from_party: None,
            to_party: None,
            via_party: None,
            role: None,
            via_role: None,
            packages: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Returns the composite key of the underlying connection.
    #[must_use]
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            from_id: self.from_id,
            to_id: self.to_id,
            role_id: self.role_id,
            assignment_id: self.assignment_id,
            delegation_id: self.delegation_id,
            via_id: self.via_id,
            via_role_id: self.via_role_id,
        }
    }
}
