use std::collections::HashMap;

use async_trait::async_trait;
use tieline_application::{ConnectionGraphRepository, ConnectionQuery, MergeStrategy, QueryPlan};
use tieline_core::AppResult;
use tieline_domain::{
    Assignment, AssignmentId, AssignmentPackage, AssignmentResource, ConnectionKey,
    ConnectionReason, ConnectionTuple, Delegation, DelegationId, DelegationPackage,
    DelegationResource, Package, PackageId, PackageResource, Party, PartyId, Resource, ResourceId,
    Role, RoleId, RoleMap, RolePackage, RoleResource,
};
use tokio::sync::RwLock;

mod derive;

use derive::GraphSnapshot;

/// Collapses tuples sharing a composite key and reason, OR-ing the
/// provenance flags of the collapsed rows. Mirrors the grouped select the
/// Postgres repository emits for unique-result queries.
fn union_merge(tuples: Vec<ConnectionTuple>) -> Vec<ConnectionTuple> {
    let mut order: Vec<(ConnectionKey, ConnectionReason)> = Vec::new();
    let mut merged: HashMap<(ConnectionKey, ConnectionReason), ConnectionTuple> = HashMap::new();

    for tuple in tuples {
        let identity = (tuple.key(), tuple.reason);
        match merged.entry(identity) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.is_key_role_access |= tuple.is_key_role_access;
                existing.is_role_map |= tuple.is_role_map;
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                order.push(identity);
                entry.insert(tuple);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|identity| merged.remove(&identity))
        .collect()
}

/// In-memory connection graph repository implementation.
///
/// Evaluates composed queries over plain tables with the same semantics the
/// Postgres repository lowers to SQL; used by tests and local tooling.
#[derive(Debug, Default)]
pub struct InMemoryConnectionRepository {
    parties: RwLock<HashMap<PartyId, Party>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    assignments: RwLock<HashMap<AssignmentId, Assignment>>,
    role_maps: RwLock<Vec<RoleMap>>,
    delegations: RwLock<HashMap<DelegationId, Delegation>>,
    packages: RwLock<HashMap<PackageId, Package>>,
    resources: RwLock<HashMap<ResourceId, Resource>>,
    assignment_packages: RwLock<Vec<AssignmentPackage>>,
    role_packages: RwLock<Vec<RolePackage>>,
    delegation_packages: RwLock<Vec<DelegationPackage>>,
    assignment_resources: RwLock<Vec<AssignmentResource>>,
    role_resources: RwLock<Vec<RoleResource>>,
    delegation_resources: RwLock<Vec<DelegationResource>>,
    package_resources: RwLock<Vec<PackageResource>>,
}

impl InMemoryConnectionRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a party row.
    pub async fn insert_party(&self, party: Party) {
        self.parties.write().await.insert(party.id(), party);
    }

    /// Seeds a role row.
    pub async fn insert_role(&self, role: Role) {
        self.roles.write().await.insert(role.id(), role);
    }

    /// Seeds an assignment row.
    pub async fn insert_assignment(&self, assignment: Assignment) {
        self.assignments.write().await.insert(assignment.id, assignment);
    }

    /// Seeds a role alias row.
    pub async fn insert_role_map(&self, role_map: RoleMap) {
        self.role_maps.write().await.push(role_map);
    }

    /// Seeds a delegation row.
    pub async fn insert_delegation(&self, delegation: Delegation) {
        self.delegations.write().await.insert(delegation.id, delegation);
    }

    /// Seeds a package row.
    pub async fn insert_package(&self, package: Package) {
        self.packages.write().await.insert(package.id(), package);
    }

    /// Seeds a resource row.
    pub async fn insert_resource(&self, resource: Resource) {
        self.resources.write().await.insert(resource.id(), resource);
    }

    /// Seeds an assignment-level package grant.
    pub async fn grant_assignment_package(&self, grant: AssignmentPackage) {
        self.assignment_packages.write().await.push(grant);
    }

    /// Seeds a role-level package grant.
    pub async fn grant_role_package(&self, grant: RolePackage) {
        self.role_packages.write().await.push(grant);
    }

    /// Seeds a delegation-level package grant.
    pub async fn grant_delegation_package(&self, grant: DelegationPackage) {
        self.delegation_packages.write().await.push(grant);
    }

    /// Seeds an assignment-level resource grant.
    pub async fn grant_assignment_resource(&self, grant: AssignmentResource) {
        self.assignment_resources.write().await.push(grant);
    }

    /// Seeds a role-level resource grant.
    pub async fn grant_role_resource(&self, grant: RoleResource) {
        self.role_resources.write().await.push(grant);
    }

    /// Seeds a delegation-level resource grant.
    pub async fn grant_delegation_resource(&self, grant: DelegationResource) {
        self.delegation_resources.write().await.push(grant);
    }

    /// Seeds a package membership row.
    pub async fn insert_package_resource(&self, membership: PackageResource) {
        self.package_resources.write().await.push(membership);
    }

    async fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            parties: self.parties.read().await.values().cloned().collect(),
            roles: self.roles.read().await.clone(),
            assignments: self.assignments.read().await.values().copied().collect(),
            assignments_by_id: self.assignments.read().await.clone(),
            role_maps: self.role_maps.read().await.clone(),
            delegations: self.delegations.read().await.values().copied().collect(),
        }
    }

    async fn lookup_package(&self, package_id: PackageId) -> Option<Package> {
        self.packages.read().await.get(&package_id).cloned()
    }

    async fn lookup_resource(&self, resource_id: ResourceId) -> Option<Resource> {
        self.resources.read().await.get(&resource_id).cloned()
    }
}

#[async_trait]
impl ConnectionGraphRepository for InMemoryConnectionRepository {
    async fn fetch_connection_tuples(
        &self,
        query: &ConnectionQuery,
    ) -> AppResult<Vec<ConnectionTuple>> {
        let snapshot = self.snapshot().await;

        let composed = match &query.plan {
            QueryPlan::ToOthers { sources } => sources
                .iter()
                .flat_map(|source| snapshot.derive_source(*source))
                .collect(),
            QueryPlan::FromOthers {
                include_key_role,
                include_delegation,
                include_sub_connections,
            } => snapshot.derive_from_others(
                *include_key_role,
                *include_delegation,
                *include_sub_connections,
            ),
        };

        let merged = match query.merge {
            MergeStrategy::Union => union_merge(composed),
            MergeStrategy::Concat => composed,
        };

        Ok(merged
            .into_iter()
            .filter(|tuple| query.matches(tuple))
            .collect())
    }

    async fn load_parties(&self, ids: &[PartyId]) -> AppResult<Vec<Party>> {
        let parties = self.parties.read().await;
        Ok(ids.iter().filter_map(|id| parties.get(id).cloned()).collect())
    }

    async fn load_roles(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let roles = self.roles.read().await;
        Ok(ids.iter().filter_map(|id| roles.get(id).cloned()).collect())
    }

    async fn load_assignment_packages(
        &self,
        assignment_ids: &[AssignmentId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(AssignmentId, Package)>> {
        let grants = self.assignment_packages.read().await.clone();
        let mut rows = Vec::new();
        for grant in grants {
            if !assignment_ids.contains(&grant.assignment_id) {
                continue;
            }
            if !package_ids.is_empty() && !package_ids.contains(&grant.package_id) {
                continue;
            }
            if let Some(package) = self.lookup_package(grant.package_id).await {
                rows.push((grant.assignment_id, package));
            }
        }

        Ok(rows)
    }

    async fn load_role_packages(
        &self,
        role_ids: &[RoleId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(RoleId, Package)>> {
        let grants = self.role_packages.read().await.clone();
        let mut rows = Vec::new();
        for grant in grants {
            if !role_ids.contains(&grant.role_id) {
                continue;
            }
            if !package_ids.is_empty() && !package_ids.contains(&grant.package_id) {
                continue;
            }
            if let Some(package) = self.lookup_package(grant.package_id).await {
                rows.push((grant.role_id, package));
            }
        }

        Ok(rows)
    }

    async fn load_delegation_packages(
        &self,
        delegation_ids: &[DelegationId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(DelegationId, Package)>> {
        let grants = self.delegation_packages.read().await.clone();
        let mut rows = Vec::new();
        for grant in grants {
            if !delegation_ids.contains(&grant.delegation_id) {
                continue;
            }
            if !package_ids.is_empty() && !package_ids.contains(&grant.package_id) {
                continue;
            }
            if let Some(package) = self.lookup_package(grant.package_id).await {
                rows.push((grant.delegation_id, package));
            }
        }

        Ok(rows)
    }

    async fn load_assignment_resources(
        &self,
        assignment_ids: &[AssignmentId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(AssignmentId, Resource)>> {
        let grants = self.assignment_resources.read().await.clone();
        let mut rows = Vec::new();
        for grant in grants {
            if !assignment_ids.contains(&grant.assignment_id) {
                continue;
            }
            if !resource_ids.is_empty() && !resource_ids.contains(&grant.resource_id) {
                continue;
            }
            if let Some(resource) = self.lookup_resource(grant.resource_id).await {
                rows.push((grant.assignment_id, resource));
            }
        }

        Ok(rows)
    }

    async fn load_role_resources(
        &self,
        role_ids: &[RoleId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(RoleId, Resource)>> {
        let grants = self.role_resources.read().await.clone();
        let mut rows = Vec::new();
        for grant in grants {
            if !role_ids.contains(&grant.role_id) {
                continue;
            }
            if !resource_ids.is_empty() && !resource_ids.contains(&grant.resource_id) {
                continue;
            }
            if let Some(resource) = self.lookup_resource(grant.resource_id).await {
                rows.push((grant.role_id, resource));
            }
        }

        Ok(rows)
    }

    async fn load_delegation_resources(
        &self,
        delegation_ids: &[DelegationId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(DelegationId, Resource)>> {
        let grants = self.delegation_resources.read().await.clone();
        let mut rows = Vec::new();
        for grant in grants {
            if !delegation_ids.contains(&grant.delegation_id) {
                continue;
            }
            if !resource_ids.is_empty() && !resource_ids.contains(&grant.resource_id) {
                continue;
            }
            if let Some(resource) = self.lookup_resource(grant.resource_id).await {
                rows.push((grant.delegation_id, resource));
            }
        }

        Ok(rows)
    }

    async fn load_package_resources(
        &self,
        package_ids: &[PackageId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(PackageId, Resource)>> {
        let memberships = self.package_resources.read().await.clone();
        let mut rows = Vec::new();
        for membership in memberships {
            if !package_ids.contains(&membership.package_id) {
                continue;
            }
            if !resource_ids.is_empty() && !resource_ids.contains(&membership.resource_id) {
                continue;
            }
            if let Some(resource) = self.lookup_resource(membership.resource_id).await {
                rows.push((membership.package_id, resource));
            }
        }

        Ok(rows)
    }

    fn explain_query(&self, query: &ConnectionQuery) -> String {
        let plan = match &query.plan {
            QueryPlan::ToOthers { sources } => format!(
                "to_others(sources=[{}])",
                sources
                    .iter()
                    .map(|source| source.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            QueryPlan::FromOthers {
                include_key_role,
                include_delegation,
                include_sub_connections,
            } => format!(
                "from_others(key_role={include_key_role}, delegation={include_delegation}, \
                 sub_connections={include_sub_connections})"
            ),
        };
        let merge = match query.merge {
            MergeStrategy::Union => "union",
            MergeStrategy::Concat => "concat",
        };

        format!(
            "scan {plan} merge={merge} restrict(from={}, to={}, roles={})",
            query.from_ids.len(),
            query.to_ids.len(),
            query.role_ids.len()
        )
    }
}
