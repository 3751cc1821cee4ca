use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tieline_core::{AppError, AppResult};
use tieline_domain::{
    AssignmentId, ConnectionRecord, ConnectionTuple, DelegationId, Package, PackageId, Party,
    PartyId, Resource, ResourceId, Role, RoleId,
};
use tokio_util::sync::CancellationToken;

use crate::{ConnectionDirection, ConnectionFilter, ConnectionQuery};

mod capabilities;
mod enrichment;
#[cfg(test)]
mod tests;

/// Repository port executing composed connection queries against the graph store.
///
/// All reads are equality/containment lookups; the engine never writes. An
/// empty capability-id restriction leaves that lookup unrestricted.
#[async_trait]
pub trait ConnectionGraphRepository: Send + Sync {
    /// Executes the composed base query in a single roundtrip.
    async fn fetch_connection_tuples(
        &self,
        query: &ConnectionQuery,
    ) -> AppResult<Vec<ConnectionTuple>>;

    /// Loads full party objects for the given ids.
    async fn load_parties(&self, ids: &[PartyId]) -> AppResult<Vec<Party>>;

    /// Loads full role objects for the given ids.
    async fn load_roles(&self, ids: &[RoleId]) -> AppResult<Vec<Role>>;

    /// Loads assignment-level package grants.
    async fn load_assignment_packages(
        &self,
        assignment_ids: &[AssignmentId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(AssignmentId, Package)>>;

    /// Loads role-level package grants.
    async fn load_role_packages(
        &self,
        role_ids: &[RoleId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(RoleId, Package)>>;

    /// Loads delegation-level package grants.
    async fn load_delegation_packages(
        &self,
        delegation_ids: &[DelegationId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(DelegationId, Package)>>;

    /// Loads assignment-level resource grants.
    async fn load_assignment_resources(
        &self,
        assignment_ids: &[AssignmentId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(AssignmentId, Resource)>>;

    /// Loads role-level resource grants.
    async fn load_role_resources(
        &self,
        role_ids: &[RoleId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(RoleId, Resource)>>;

    /// Loads delegation-level resource grants.
    async fn load_delegation_resources(
        &self,
        delegation_ids: &[DelegationId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(DelegationId, Resource)>>;

    /// Loads the resources contained in the given packages.
    async fn load_package_resources(
        &self,
        package_ids: &[PackageId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(PackageId, Resource)>>;

    /// Renders the composed query without executing it.
    fn explain_query(&self, query: &ConnectionQuery) -> String;
}

/// Application service resolving effective connections between parties.
///
/// Stateless and safe for concurrent use; each invocation runs its phases
/// sequentially and performs no retries.
#[derive(Clone)]
pub struct ConnectionService {
    repository: Arc<dyn ConnectionGraphRepository>,
}

impl ConnectionService {
    /// Creates a new connection service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn ConnectionGraphRepository>) -> Self {
        Self { repository }
    }

    /// Resolves every effective connection matching the filter.
    ///
    /// Fails with a validation error before any store access when the filter
    /// restricts nothing; store failures discard everything computed in
    /// earlier phases.
    pub async fn resolve_connections(
        &self,
        filter: &ConnectionFilter,
        direction: ConnectionDirection,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<ConnectionRecord>> {
        filter.validate()?;

        self.resolve_validated(filter, direction, cancel)
            .await
            .map_err(|error| {
                wrap_store_error(
                    &format!("failed to get connections with filter {filter}"),
                    error,
                )
            })
    }

    /// Renders the composed query for the filter without executing it.
    ///
    /// Debug-only sibling of [`Self::resolve_connections`]; carries no side
    /// effects.
    pub fn explain_query(
        &self,
        filter: &ConnectionFilter,
        direction: ConnectionDirection,
    ) -> AppResult<String> {
        filter.validate()?;

        let query = ConnectionQuery::from_filter(filter, direction);
        Ok(self.repository.explain_query(&query))
    }

    async fn resolve_validated(
        &self,
        filter: &ConnectionFilter,
        direction: ConnectionDirection,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<ConnectionRecord>> {
        let query = ConnectionQuery::from_filter(filter, direction);

        let tuples = run_cancellable(
            cancel,
            "connection fetch",
            self.repository.fetch_connection_tuples(&query),
        )
        .await?;

        let records = self.enrich_entities(filter, &tuples, cancel).await?;

        let records = self
            .attach_packages(filter, records, cancel)
            .await
            .map_err(|error| wrap_store_error("failed to include packages", error))?;

        let records = self
            .attach_resources(filter, records, cancel)
            .await
            .map_err(|error| wrap_store_error("failed to include resources", error))?;

        Ok(records)
    }
}

pub(crate) async fn run_cancellable<T>(
    cancel: &CancellationToken,
    operation: &str,
    operation_future: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AppError::Canceled(format!("{operation} aborted"))),
        result = operation_future => result,
    }
}

fn wrap_store_error(context: &str, error: AppError) -> AppError {
    match error {
        AppError::Canceled(_) => error,
        other => AppError::Internal(format!("{context}: {other}")),
    }
}
