use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a party in the authorization graph.
    PartyId
);
uuid_id!(
    /// Identifier of a grantable role.
    RoleId
);
uuid_id!(
    /// Identifier of a role assignment between two parties.
    AssignmentId
);
uuid_id!(
    /// Identifier of a delegation between two assignments.
    DelegationId
);
uuid_id!(
    /// Identifier of an access package.
    PackageId
);
uuid_id!(
    /// Identifier of a grantable resource.
    ResourceId
);

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::PartyId;

    #[test]
    fn party_id_formats_as_uuid() {
        let party_id = PartyId::new();
        assert_eq!(party_id.to_string().len(), 36);
    }

    #[test]
    fn party_id_roundtrips_through_uuid() {
        let raw = Uuid::from_u128(7);
        assert_eq!(PartyId::from_uuid(raw).as_uuid(), raw);
    }
}
