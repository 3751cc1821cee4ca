use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tieline_application::{ConnectionDirection, ConnectionFilter};
use tieline_domain::{
    ConnectionPackage, ConnectionRecord, PackageId, Party, PartyId, Resource, ResourceId, Role,
    RoleId,
};

/// Requested derivation direction.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionRequest {
    /// What the `from` parties can reach.
    ToOthers,
    /// What reaches the `to` parties.
    FromOthers,
}

impl From<DirectionRequest> for ConnectionDirection {
    fn from(value: DirectionRequest) -> Self {
        match value {
            DirectionRequest::ToOthers => Self::ToOthers,
            DirectionRequest::FromOthers => Self::FromOthers,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Connection filter payload; omitted switches keep the engine defaults.
#[derive(Debug, Deserialize)]
pub struct ConnectionFilterRequest {
    #[serde(default)]
    pub from_ids: Vec<Uuid>,
    #[serde(default)]
    pub to_ids: Vec<Uuid>,
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
    #[serde(default)]
    pub package_ids: Vec<Uuid>,
    #[serde(default)]
    pub resource_ids: Vec<Uuid>,
    #[serde(default = "default_true")]
    pub only_unique_results: bool,
    #[serde(default = "default_true")]
    pub enrich_entities: bool,
    #[serde(default)]
    pub include_packages: bool,
    #[serde(default)]
    pub include_resource: bool,
    #[serde(default)]
    pub enrich_package_resources: bool,
    #[serde(default)]
    pub exclude_deleted: bool,
    #[serde(default = "default_true")]
    pub include_delegation: bool,
    #[serde(default = "default_true")]
    pub include_key_role: bool,
    #[serde(default = "default_true")]
    pub include_sub_connections: bool,
}

impl From<ConnectionFilterRequest> for ConnectionFilter {
    fn from(value: ConnectionFilterRequest) -> Self {
        Self {
            from_ids: value.from_ids.into_iter().map(PartyId::from_uuid).collect(),
            to_ids: value.to_ids.into_iter().map(PartyId::from_uuid).collect(),
            role_ids: value.role_ids.into_iter().map(RoleId::from_uuid).collect(),
            package_ids: value
                .package_ids
                .into_iter()
                .map(PackageId::from_uuid)
                .collect(),
            resource_ids: value
                .resource_ids
                .into_iter()
                .map(ResourceId::from_uuid)
                .collect(),
            only_unique_results: value.only_unique_results,
            enrich_entities: value.enrich_entities,
            include_packages: value.include_packages,
            include_resource: value.include_resource,
            enrich_package_resources: value.enrich_package_resources,
            exclude_deleted: value.exclude_deleted,
            include_delegation: value.include_delegation,
            include_key_role: value.include_key_role,
            include_sub_connections: value.include_sub_connections,
        }
    }
}

/// Request body for connection resolution and explain.
#[derive(Debug, Deserialize)]
pub struct QueryConnectionsRequest {
    /// Derivation direction.
    pub direction: DirectionRequest,
    /// Query filter.
    pub filter: ConnectionFilterRequest,
}

/// Enriched party projection.
#[derive(Debug, Serialize)]
pub struct PartyResponse {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub is_deleted: bool,
}

impl From<Party> for PartyResponse {
    fn from(value: Party) -> Self {
        Self {
            id: value.id().as_uuid(),
            parent_id: value.parent_id().map(|id| id.as_uuid()),
            name: value.name().as_str().to_owned(),
            is_deleted: value.is_deleted(),
        }
    }
}

/// Enriched role projection.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub is_key_role: bool,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            id: value.id().as_uuid(),
            code: value.code().as_str().to_owned(),
            name: value.name().as_str().to_owned(),
            is_key_role: value.is_key_role(),
        }
    }
}

/// Attached resource projection.
#[derive(Debug, Serialize)]
pub struct ResourceResponse {
    pub id: Uuid,
    pub ref_id: String,
}

impl From<Resource> for ResourceResponse {
    fn from(value: Resource) -> Self {
        Self {
            id: value.id().as_uuid(),
            ref_id: value.ref_id().as_str().to_owned(),
        }
    }
}

/// Attached package projection with optional resource expansion.
#[derive(Debug, Serialize)]
pub struct PackageResponse {
    pub id: Uuid,
    pub urn: String,
    pub resources: Vec<ResourceResponse>,
}

impl From<ConnectionPackage> for PackageResponse {
    fn from(value: ConnectionPackage) -> Self {
        Self {
            id: value.package.id().as_uuid(),
            urn: value.package.urn().as_str().to_owned(),
            resources: value
                .resources
                .into_iter()
                .map(ResourceResponse::from)
                .collect(),
        }
    }
}

/// One resolved connection.
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub assignment_id: Option<Uuid>,
    pub delegation_id: Option<Uuid>,
    pub from_id: Uuid,
    pub to_id: Uuid,
    pub role_id: Option<Uuid>,
    pub via_id: Option<Uuid>,
    pub via_role_id: Option<Uuid>,
    pub reason: String,
    pub from_party: Option<PartyResponse>,
    pub to_party: Option<PartyResponse>,
    pub via_party: Option<PartyResponse>,
    pub role: Option<RoleResponse>,
    pub via_role: Option<RoleResponse>,
    pub packages: Vec<PackageResponse>,
    pub resources: Vec<ResourceResponse>,
}

impl From<ConnectionRecord> for ConnectionResponse {
    fn from(value: ConnectionRecord) -> Self {
        Self {
            assignment_id: value.assignment_id.map(|id| id.as_uuid()),
            delegation_id: value.delegation_id.map(|id| id.as_uuid()),
            from_id: value.from_id.as_uuid(),
            to_id: value.to_id.as_uuid(),
            role_id: value.role_id.map(|id| id.as_uuid()),
            via_id: value.via_id.map(|id| id.as_uuid()),
            via_role_id: value.via_role_id.map(|id| id.as_uuid()),
            reason: value.reason.as_str().to_owned(),
            from_party: value.from_party.map(PartyResponse::from),
            to_party: value.to_party.map(PartyResponse::from),
            via_party: value.via_party.map(PartyResponse::from),
            role: value.role.map(RoleResponse::from),
            via_role: value.via_role.map(RoleResponse::from),
            packages: value.packages.into_iter().map(PackageResponse::from).collect(),
            resources: value
                .resources
                .into_iter()
                .map(ResourceResponse::from)
                .collect(),
        }
    }
}

/// Rendered query text returned by the explain endpoint.
#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    /// The composed statement, never executed by this endpoint.
    pub statement: String,
}

/// Liveness payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use tieline_application::ConnectionFilter;

    use super::{ConnectionFilterRequest, QueryConnectionsRequest};

    #[test]
    fn omitted_switches_keep_engine_defaults() {
        let payload = r#"{"from_ids": ["00000000-0000-0000-0000-000000000005"]}"#;
        let parsed: Result<ConnectionFilterRequest, _> = serde_json::from_str(payload);
        let Ok(parsed) = parsed else {
            panic!("filter payload should deserialize");
        };

        let filter = ConnectionFilter::from(parsed);
        let defaults = ConnectionFilter::default();
        assert_eq!(filter.only_unique_results, defaults.only_unique_results);
        assert_eq!(filter.enrich_entities, defaults.enrich_entities);
        assert_eq!(filter.include_delegation, defaults.include_delegation);
        assert_eq!(filter.include_key_role, defaults.include_key_role);
        assert_eq!(
            filter.include_sub_connections,
            defaults.include_sub_connections
        );
        assert_eq!(filter.include_packages, defaults.include_packages);
        assert_eq!(filter.from_ids.len(), 1);
    }

    #[test]
    fn direction_values_deserialize_snake_case() {
        let payload = r#"{"direction": "from_others", "filter": {}}"#;
        let parsed: Result<QueryConnectionsRequest, _> = serde_json::from_str(payload);
        assert!(parsed.is_ok());
    }
}
