use serde::{Deserialize, Serialize};
use tieline_core::{AppResult, NonEmptyString};

use crate::{AssignmentId, DelegationId, PackageId, ResourceId, RoleId};

/// A grantable bundle of access rights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    id: PackageId,
    urn: NonEmptyString,
}

impl Package {
    /// Creates a validated package.
    pub fn new(id: PackageId, urn: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            urn: NonEmptyString::new(urn)?,
        })
    }

    /// Returns the package identifier.
    #[must_use]
    pub fn id(&self) -> PackageId {
        self.id
    }

    /// Returns the stable package URN.
    #[must_use]
    pub fn urn(&self) -> &NonEmptyString {
        &self.urn
    }
}

/// A single grantable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    id: ResourceId,
    ref_id: NonEmptyString,
}

impl Resource {
    /// Creates a validated resource.
    pub fn new(id: ResourceId, ref_id: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            ref_id: NonEmptyString::new(ref_id)?,
        })
    }

    /// Returns the resource identifier.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Returns the external registry reference.
    #[must_use]
    pub fn ref_id(&self) -> &NonEmptyString {
        &self.ref_id
    }
}

/// Package granted at the assignment level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPackage {
    /// Owning assignment.
    pub assignment_id: AssignmentId,
    /// Granted package.
    pub package_id: PackageId,
}

/// Package granted at the role level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePackage {
    /// Owning role.
    pub role_id: RoleId,
    /// Granted package.
    pub package_id: PackageId,
}

/// Package granted at the delegation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationPackage {
    /// Owning delegation.
    pub delegation_id: DelegationId,
    /// Granted package.
    pub package_id: PackageId,
}

/// Resource granted at the assignment level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentResource {
    /// Owning assignment.
    pub assignment_id: AssignmentId,
    /// Granted resource.
    pub resource_id: ResourceId,
}

/// Resource granted at the role level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResource {
    /// Owning role.
    pub role_id: RoleId,
    /// Granted resource.
    pub resource_id: ResourceId,
}

/// Resource granted at the delegation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationResource {
    /// Owning delegation.
    pub delegation_id: DelegationId,
    /// Granted resource.
    pub resource_id: ResourceId,
}

/// Membership of a resource in a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageResource {
    /// Owning package.
    pub package_id: PackageId,
    /// Contained resource.
    pub resource_id: ResourceId,
}
