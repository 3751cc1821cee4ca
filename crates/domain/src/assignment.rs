use serde::{Deserialize, Serialize};

use crate::{AssignmentId, DelegationId, PartyId, RoleId};

/// A grant: party `to_id` holds `role_id` over party `from_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Stable assignment identifier.
    pub id: AssignmentId,
    /// Party the role is held over.
    pub from_id: PartyId,
    /// Party holding the role.
    pub to_id: PartyId,
    /// Role being held.
    pub role_id: RoleId,
}

impl Assignment {
    /// Creates an assignment row.
    #[must_use]
    pub fn new(id: AssignmentId, from_id: PartyId, to_id: PartyId, role_id: RoleId) -> Self {
        Self {
            id,
            from_id,
            to_id,
            role_id,
        }
    }
}

/// Forwarding of one assignment's rights onward to another assignment's holder.
///
/// The facilitator is the party shared by both ends: `from_assignment.to_id`
/// and `to_assignment.from_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Stable delegation identifier.
    pub id: DelegationId,
    /// Assignment whose rights are forwarded.
    pub from_assignment_id: AssignmentId,
    /// Assignment whose holder receives the forwarded rights.
    pub to_assignment_id: AssignmentId,
}

impl Delegation {
    /// Creates a delegation row.
    #[must_use]
    pub fn new(
        id: DelegationId,
        from_assignment_id: AssignmentId,
        to_assignment_id: AssignmentId,
    ) -> Self {
        Self {
            id,
            from_assignment_id,
            to_assignment_id,
        }
    }
}
