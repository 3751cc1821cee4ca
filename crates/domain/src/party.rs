use serde::{Deserialize, Serialize};
use tieline_core::{AppResult, NonEmptyString};

use crate::PartyId;

/// A person, organization, sub-unit, or system actor in the authorization graph.
///
/// `parent_id` is a single-level tree edge: the engine propagates it exactly
/// one hop per derivation pass and never chases it recursively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    id: PartyId,
    parent_id: Option<PartyId>,
    name: NonEmptyString,
    is_deleted: bool,
}

impl Party {
    /// Creates a validated party.
    pub fn new(
        id: PartyId,
        parent_id: Option<PartyId>,
        name: impl Into<String>,
        is_deleted: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            parent_id,
            name: NonEmptyString::new(name)?,
            is_deleted,
        })
    }

    /// Returns the party identifier.
    #[must_use]
    pub fn id(&self) -> PartyId {
        self.id
    }

    /// Returns the parent party, if this party is a sub-unit.
    #[must_use]
    pub fn parent_id(&self) -> Option<PartyId> {
        self.parent_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns whether the party is soft-deleted in the registry.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

#[cfg(test)]
mod tests {
    use crate::PartyId;

    use super::Party;

    #[test]
    fn party_rejects_blank_name() {
        let result = Party::new(PartyId::new(), None, "  ", false);
        assert!(result.is_err());
    }

    #[test]
    fn party_keeps_parent_edge() {
        let parent_id = PartyId::new();
        let party = Party::new(PartyId::new(), Some(parent_id), "Suborg", false);
        assert_eq!(party.ok().and_then(|value| value.parent_id()), Some(parent_id));
    }
}
