use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use tieline_application::{ConnectionGraphRepository, ConnectionQuery};
use tieline_core::{AppError, AppResult};
use tieline_domain::{
    AssignmentId, ConnectionReason, ConnectionTuple, DelegationId, Package, PackageId, Party,
    PartyId, Resource, ResourceId, Role, RoleId,
};

mod sql;

/// PostgreSQL-backed connection graph repository.
///
/// Lowers the composed query IR to a single SQL statement per derivation
/// mode; all lookups use runtime-bound parameters against the read-only
/// registry tables.
#[derive(Clone)]
pub struct PostgresConnectionRepository {
    pool: PgPool,
}

impl PostgresConnectionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_owned_packages(
        &self,
        statement: &str,
        owner_ids: Vec<Uuid>,
        package_ids: Vec<Uuid>,
        context: &str,
    ) -> AppResult<Vec<(Uuid, Package)>> {
        let rows = sqlx::query_as::<_, OwnedCapabilityRow>(statement)
            .bind(owner_ids)
            .bind(package_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load {context}: {error}")))?;

        rows.into_iter()
            .map(|row| {
                let capability_id = row.capability_id;
                Package::new(PackageId::from_uuid(capability_id), row.reference)
                    .map(|package| (row.owner_id, package))
                    .map_err(|error| {
                        AppError::Internal(format!(
                            "failed to decode package '{capability_id}': {error}"
                        ))
                    })
            })
            .collect()
    }

    async fn fetch_owned_resources(
        &self,
        statement: &str,
        owner_ids: Vec<Uuid>,
        resource_ids: Vec<Uuid>,
        context: &str,
    ) -> AppResult<Vec<(Uuid, Resource)>> {
        let rows = sqlx::query_as::<_, OwnedCapabilityRow>(statement)
            .bind(owner_ids)
            .bind(resource_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load {context}: {error}")))?;

        rows.into_iter()
            .map(|row| {
                let capability_id = row.capability_id;
                Resource::new(ResourceId::from_uuid(capability_id), row.reference)
                    .map(|resource| (row.owner_id, resource))
                    .map_err(|error| {
                        AppError::Internal(format!(
                            "failed to decode resource '{capability_id}': {error}"
                        ))
                    })
            })
            .collect()
    }
}

#[derive(Debug, FromRow)]
struct ConnectionTupleRow {
    assignment_id: Option<Uuid>,
    delegation_id: Option<Uuid>,
    from_id: Uuid,
    to_id: Uuid,
    role_id: Option<Uuid>,
    via_id: Option<Uuid>,
    via_role_id: Option<Uuid>,
    reason: String,
    is_key_role_access: bool,
    is_role_map: bool,
}

impl ConnectionTupleRow {
    fn decode(self) -> AppResult<ConnectionTuple> {
        let reason = ConnectionReason::from_str(self.reason.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode connection reason '{}': {error}",
                self.reason
            ))
        })?;

        Ok(ConnectionTuple {
            assignment_id: self.assignment_id.map(AssignmentId::from_uuid),
            delegation_id: self.delegation_id.map(DelegationId::from_uuid),
            from_id: PartyId::from_uuid(self.from_id),
            to_id: PartyId::from_uuid(self.to_id),
            role_id: self.role_id.map(RoleId::from_uuid),
            via_id: self.via_id.map(PartyId::from_uuid),
            via_role_id: self.via_role_id.map(RoleId::from_uuid),
            reason,
            is_key_role_access: self.is_key_role_access,
            is_role_map: self.is_role_map,
        })
    }
}

#[derive(Debug, FromRow)]
struct PartyRow {
    id: Uuid,
    parent_id: Option<Uuid>,
    name: String,
    is_deleted: bool,
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    code: String,
    name: String,
    is_key_role: bool,
}

#[derive(Debug, FromRow)]
struct OwnedCapabilityRow {
    owner_id: Uuid,
    capability_id: Uuid,
    reference: String,
}

fn uuids<T: Copy>(ids: &[T], as_uuid: impl Fn(&T) -> Uuid) -> Vec<Uuid> {
    ids.iter().map(as_uuid).collect()
}

#[async_trait]
impl ConnectionGraphRepository for PostgresConnectionRepository {
    async fn fetch_connection_tuples(
        &self,
        query: &ConnectionQuery,
    ) -> AppResult<Vec<ConnectionTuple>> {
        let statement = sql::build_base_statement(query);

        let from_ids: Vec<Uuid> = query.from_ids.iter().map(|id| id.as_uuid()).collect();
        let to_ids: Vec<Uuid> = query.to_ids.iter().map(|id| id.as_uuid()).collect();
        let role_ids: Vec<Uuid> = query.role_ids.iter().map(|id| id.as_uuid()).collect();

        let rows = sqlx::query_as::<_, ConnectionTupleRow>(statement.as_str())
            .bind(from_ids)
            .bind(to_ids)
            .bind(role_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to fetch connection tuples: {error}"))
            })?;

        rows.into_iter().map(ConnectionTupleRow::decode).collect()
    }

    async fn load_parties(&self, ids: &[PartyId]) -> AppResult<Vec<Party>> {
        let rows = sqlx::query_as::<_, PartyRow>(sql::PARTIES)
            .bind(uuids(ids, |id| id.as_uuid()))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load parties: {error}")))?;

        rows.into_iter()
            .map(|row| {
                let party_id = row.id;
                Party::new(
                    PartyId::from_uuid(row.id),
                    row.parent_id.map(PartyId::from_uuid),
                    row.name,
                    row.is_deleted,
                )
                .map_err(|error| {
                    AppError::Internal(format!("failed to decode party '{party_id}': {error}"))
                })
            })
            .collect()
    }

    async fn load_roles(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(sql::ROLES)
            .bind(uuids(ids, |id| id.as_uuid()))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load roles: {error}")))?;

        rows.into_iter()
            .map(|row| {
                let role_id = row.id;
                Role::new(
                    RoleId::from_uuid(row.id),
                    row.code,
                    row.name,
                    row.is_key_role,
                )
                .map_err(|error| {
                    AppError::Internal(format!("failed to decode role '{role_id}': {error}"))
                })
            })
            .collect()
    }

    async fn load_assignment_packages(
        &self,
        assignment_ids: &[AssignmentId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(AssignmentId, Package)>> {
        let rows = self
            .fetch_owned_packages(
                sql::ASSIGNMENT_PACKAGES,
                uuids(assignment_ids, |id| id.as_uuid()),
                uuids(package_ids, |id| id.as_uuid()),
                "assignment packages",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|(owner, package)| (AssignmentId::from_uuid(owner), package))
            .collect())
    }

    async fn load_role_packages(
        &self,
        role_ids: &[RoleId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(RoleId, Package)>> {
        let rows = self
            .fetch_owned_packages(
                sql::ROLE_PACKAGES,
                uuids(role_ids, |id| id.as_uuid()),
                uuids(package_ids, |id| id.as_uuid()),
                "role packages",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|(owner, package)| (RoleId::from_uuid(owner), package))
            .collect())
    }

    async fn load_delegation_packages(
        &self,
        delegation_ids: &[DelegationId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(DelegationId, Package)>> {
        let rows = self
            .fetch_owned_packages(
                sql::DELEGATION_PACKAGES,
                uuids(delegation_ids, |id| id.as_uuid()),
                uuids(package_ids, |id| id.as_uuid()),
                "delegation packages",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|(owner, package)| (DelegationId::from_uuid(owner), package))
            .collect())
    }

    async fn load_assignment_resources(
        &self,
        assignment_ids: &[AssignmentId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(AssignmentId, Resource)>> {
        let rows = self
            .fetch_owned_resources(
                sql::ASSIGNMENT_RESOURCES,
                uuids(assignment_ids, |id| id.as_uuid()),
                uuids(resource_ids, |id| id.as_uuid()),
                "assignment resources",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|(owner, resource)| (AssignmentId::from_uuid(owner), resource))
            .collect())
    }

    async fn load_role_resources(
        &self,
        role_ids: &[RoleId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(RoleId, Resource)>> {
        let rows = self
            .fetch_owned_resources(
                sql::ROLE_RESOURCES,
                uuids(role_ids, |id| id.as_uuid()),
                uuids(resource_ids, |id| id.as_uuid()),
                "role resources",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|(owner, resource)| (RoleId::from_uuid(owner), resource))
            .collect())
    }

    async fn load_delegation_resources(
        &self,
        delegation_ids: &[DelegationId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(DelegationId, Resource)>> {
        let rows = self
            .fetch_owned_resources(
                sql::DELEGATION_RESOURCES,
                uuids(delegation_ids, |id| id.as_uuid()),
                uuids(resource_ids, |id| id.as_uuid()),
                "delegation resources",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|(owner, resource)| (DelegationId::from_uuid(owner), resource))
            .collect())
    }

    async fn load_package_resources(
        &self,
        package_ids: &[PackageId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(PackageId, Resource)>> {
        let rows = self
            .fetch_owned_resources(
                sql::PACKAGE_RESOURCES,
                uuids(package_ids, |id| id.as_uuid()),
                uuids(resource_ids, |id| id.as_uuid()),
                "package resources",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|(owner, resource)| (PackageId::from_uuid(owner), resource))
            .collect())
    }

    fn explain_query(&self, query: &ConnectionQuery) -> String {
        sql::build_base_statement(query)
    }
}
