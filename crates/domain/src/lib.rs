//! Domain model for the Tieline authorization graph.

#![forbid(unsafe_code)]

mod assignment;
mod capability;
mod connection;
mod ids;
mod party;
mod role;

pub use assignment::{Assignment, Delegation};
pub use capability::{
    AssignmentPackage, AssignmentResource, DelegationPackage, DelegationResource, Package,
    PackageResource, Resource, RolePackage, RoleResource,
};
pub use connection::{
    ConnectionKey, ConnectionPackage, ConnectionReason, ConnectionRecord, ConnectionTuple,
};
pub use ids::{AssignmentId, DelegationId, PackageId, PartyId, ResourceId, RoleId};
pub use party::Party;
pub use role::{Role, RoleMap};
