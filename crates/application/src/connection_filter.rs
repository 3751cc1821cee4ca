use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use tieline_core::{AppError, AppResult};
use tieline_domain::{PackageId, PartyId, ResourceId, RoleId};

/// Validated query parameters for connection resolution.
///
/// Empty id sets leave that dimension unrestricted, but at least one set must
/// be populated: the engine refuses unrestricted full-graph scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFilter {
    /// Restrict to connections held over these parties.
    pub from_ids: BTreeSet<PartyId>,
    /// Restrict to connections held by these parties.
    pub to_ids: BTreeSet<PartyId>,
    /// Restrict to connections carrying these roles.
    pub role_ids: BTreeSet<RoleId>,
    /// Restrict attached packages to these ids.
    pub package_ids: BTreeSet<PackageId>,
    /// Restrict attached resources to these ids.
    pub resource_ids: BTreeSet<ResourceId>,
    /// Collapse tuples that are identical across every field.
    pub only_unique_results: bool,
    /// Attach full party and role objects to each record.
    pub enrich_entities: bool,
    /// Attach packages reachable from each connection.
    pub include_packages: bool,
    /// Attach resources reachable from each connection.
    pub include_resource: bool,
    /// Expand attached packages into their resources.
    pub enrich_package_resources: bool,
    /// Drop connections whose from, to, or via party is soft-deleted.
    pub exclude_deleted: bool,
    /// Apply the delegation derivation rules.
    pub include_delegation: bool,
    /// Apply the key-role derivation rules.
    pub include_key_role: bool,
    /// Expand results one hierarchy hop through child parties (from-others mode).
    pub include_sub_connections: bool,
}

impl Default for ConnectionFilter {
    fn default() -> Self {
        Self {
            from_ids: BTreeSet::new(),
            to_ids: BTreeSet::new(),
            role_ids: BTreeSet::new(),
            package_ids: BTreeSet::new(),
            resource_ids: BTreeSet::new(),
            only_unique_results: true,
            enrich_entities: true,
            include_packages: false,
            include_resource: false,
            enrich_package_resources: false,
            exclude_deleted: false,
            include_delegation: true,
            include_key_role: true,
            include_sub_connections: true,
        }
    }
}

impl ConnectionFilter {
    /// Returns whether at least one id set is populated.
    #[must_use]
    pub fn has_any(&self) -> bool {
        !self.from_ids.is_empty()
            || !self.to_ids.is_empty()
            || !self.role_ids.is_empty()
            || !self.package_ids.is_empty()
            || !self.resource_ids.is_empty()
    }

    /// Rejects filters that would scan the full graph.
    pub fn validate(&self) -> AppResult<()> {
        if !self.has_any() {
            return Err(AppError::Validation(
                "connection filter must restrict at least one id set".to_owned(),
            ));
        }

        Ok(())
    }
}

impl Display for ConnectionFilter {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "from=[{}] to=[{}] roles=[{}] packages=[{}] resources=[{}] \
             only_unique_results={} enrich_entities={} include_packages={} \
             include_resource={} enrich_package_resources={} exclude_deleted={} \
             include_delegation={} include_key_role={} include_sub_connections={}",
            join_ids(self.from_ids.iter()),
            join_ids(self.to_ids.iter()),
            join_ids(self.role_ids.iter()),
            join_ids(self.package_ids.iter()),
            join_ids(self.resource_ids.iter()),
            self.only_unique_results,
            self.enrich_entities,
            self.include_packages,
            self.include_resource,
            self.enrich_package_resources,
            self.exclude_deleted,
            self.include_delegation,
            self.include_key_role,
            self.include_sub_connections,
        )
    }
}

fn join_ids<T: Display>(ids: impl Iterator<Item = T>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}
