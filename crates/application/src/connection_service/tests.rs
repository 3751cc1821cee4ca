use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tieline_core::{AppError, AppResult};
use tieline_domain::{
    Assignment, AssignmentId, ConnectionTuple, DelegationId, Package, PackageId, Party, PartyId,
    Resource, ResourceId, Role, RoleId,
};

use crate::{ConnectionDirection, ConnectionFilter, ConnectionQuery};

use super::{ConnectionGraphRepository, ConnectionService};

#[derive(Default)]
struct FakeConnectionGraphRepository {
    tuples: Vec<ConnectionTuple>,
    parties: Vec<Party>,
    roles: Vec<Role>,
    assignment_packages: Vec<(AssignmentId, Package)>,
    role_packages: Vec<(RoleId, Package)>,
    delegation_packages: Vec<(DelegationId, Package)>,
    assignment_resources: Vec<(AssignmentId, Resource)>,
    role_resources: Vec<(RoleId, Resource)>,
    delegation_resources: Vec<(DelegationId, Resource)>,
    package_resources: Vec<(PackageId, Resource)>,
    fail_base_fetch: bool,
    fail_package_lookup: bool,
    fetch_called: AtomicBool,
}

fn restricted<O: Copy + PartialEq, C: Clone, I: Copy + PartialEq>(
    rows: &[(O, C)],
    owners: &[O],
    restriction: &[I],
    id_of: impl Fn(&C) -> I,
) -> Vec<(O, C)> {
    rows.iter()
        .filter(|(owner, capability)| {
            owners.contains(owner)
                && (restriction.is_empty() || restriction.contains(&id_of(capability)))
        })
        .cloned()
        .collect()
}

#[async_trait]
impl ConnectionGraphRepository for FakeConnectionGraphRepository {
    async fn fetch_connection_tuples(
        &self,
        _query: &ConnectionQuery,
    ) -> AppResult<Vec<ConnectionTuple>> {
        self.fetch_called.store(true, Ordering::SeqCst);
        if self.fail_base_fetch {
            return Err(AppError::Internal("connection table unavailable".to_owned()));
        }

        Ok(self.tuples.clone())
    }

    async fn load_parties(&self, ids: &[PartyId]) -> AppResult<Vec<Party>> {
        Ok(self
            .parties
            .iter()
            .filter(|party| ids.contains(&party.id()))
            .cloned()
            .collect())
    }

    async fn load_roles(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
        Ok(self
            .roles
            .iter()
            .filter(|role| ids.contains(&role.id()))
            .cloned()
            .collect())
    }

    async fn load_assignment_packages(
        &self,
        assignment_ids: &[AssignmentId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(AssignmentId, Package)>> {
        if self.fail_package_lookup {
            return Err(AppError::Internal("package table unavailable".to_owned()));
        }

        Ok(restricted(
            &self.assignment_packages,
            assignment_ids,
            package_ids,
            Package::id,
        ))
    }

    async fn load_role_packages(
        &self,
        role_ids: &[RoleId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(RoleId, Package)>> {
        Ok(restricted(
            &self.role_packages,
            role_ids,
            package_ids,
            Package::id,
        ))
    }

    async fn load_delegation_packages(
        &self,
        delegation_ids: &[DelegationId],
        package_ids: &[PackageId],
    ) -> AppResult<Vec<(DelegationId, Package)>> {
        Ok(restricted(
            &self.delegation_packages,
            delegation_ids,
            package_ids,
            Package::id,
        ))
    }

    async fn load_assignment_resources(
        &self,
        assignment_ids: &[AssignmentId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(AssignmentId, Resource)>> {
        Ok(restricted(
            &self.assignment_resources,
            assignment_ids,
            resource_ids,
            Resource::id,
        ))
    }

    async fn load_role_resources(
        &self,
        role_ids: &[RoleId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(RoleId, Resource)>> {
        Ok(restricted(
            &self.role_resources,
            role_ids,
            resource_ids,
            Resource::id,
        ))
    }

    async fn load_delegation_resources(
        &self,
        delegation_ids: &[DelegationId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(DelegationId, Resource)>> {
        Ok(restricted(
            &self.delegation_resources,
            delegation_ids,
            resource_ids,
            Resource::id,
        ))
    }

    async fn load_package_resources(
        &self,
        package_ids: &[PackageId],
        resource_ids: &[ResourceId],
    ) -> AppResult<Vec<(PackageId, Resource)>> {
        Ok(restricted(
            &self.package_resources,
            package_ids,
            resource_ids,
            Resource::id,
        ))
    }

    fn explain_query(&self, _query: &ConnectionQuery) -> String {
        "composed query".to_owned()
    }
}

fn party_id(value: u128) -> PartyId {
    PartyId::from_uuid(Uuid::from_u128(value))
}

fn role_id(value: u128) -> RoleId {
    RoleId::from_uuid(Uuid::from_u128(value))
}

fn party(value: u128, is_deleted: bool) -> Party {
    match Party::new(party_id(value), None, format!("party-{value}"), is_deleted) {
        Ok(party) => party,
        Err(error) => panic!("invalid fixture party: {error}"),
    }
}

fn package(value: u128) -> Package {
    match Package::new(
        PackageId::from_uuid(Uuid::from_u128(value)),
        format!("urn:tieline:package:{value}"),
    ) {
        Ok(package) => package,
        Err(error) => panic!("invalid fixture package: {error}"),
    }
}

fn resource(value: u128) -> Resource {
    match Resource::new(
        ResourceId::from_uuid(Uuid::from_u128(value)),
        format!("resource-{value}"),
    ) {
        Ok(resource) => resource,
        Err(error) => panic!("invalid fixture resource: {error}"),
    }
}

fn direct_tuple(from: u128, to: u128, role: u128, assignment: u128) -> ConnectionTuple {
    ConnectionTuple::direct(&Assignment::new(
        AssignmentId::from_uuid(Uuid::from_u128(assignment)),
        party_id(from),
        party_id(to),
        role_id(role),
    ))
}

fn restricted_filter() -> ConnectionFilter {
    let mut filter = ConnectionFilter::default();
    filter.from_ids.insert(party_id(1));
    filter
}

fn service(repository: FakeConnectionGraphRepository) -> (ConnectionService, Arc<FakeConnectionGraphRepository>) {
    let repository = Arc::new(repository);
    (ConnectionService::new(repository.clone()), repository)
}

#[tokio::test]
async fn resolve_rejects_unrestricted_filter_before_any_fetch() {
    let (service, repository) = service(FakeConnectionGraphRepository::default());

    let result = service
        .resolve_connections(
            &ConnectionFilter::default(),
            ConnectionDirection::ToOthers,
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(!repository.fetch_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn resolve_wraps_base_fetch_failure_with_filter_context() {
    let (service, _) = service(FakeConnectionGraphRepository {
        fail_base_fetch: true,
        ..FakeConnectionGraphRepository::default()
    });

    let result = service
        .resolve_connections(
            &restricted_filter(),
            ConnectionDirection::ToOthers,
            &CancellationToken::new(),
        )
        .await;

    let message = result.err().map(|error| error.to_string()).unwrap_or_default();
    assert!(message.contains("failed to get connections with filter"));
    assert!(message.contains("connection table unavailable"));
}

#[tokio::test]
async fn resolve_wraps_package_failure_with_operation_name() {
    let (service, _) = service(FakeConnectionGraphRepository {
        tuples: vec![direct_tuple(1, 2, 10, 100)],
        fail_package_lookup: true,
        ..FakeConnectionGraphRepository::default()
    });

    let mut filter = restricted_filter();
    filter.include_packages = true;

    let result = service
        .resolve_connections(&filter, ConnectionDirection::ToOthers, &CancellationToken::new())
        .await;

    let message = result.err().map(|error| error.to_string()).unwrap_or_default();
    assert!(message.contains("failed to include packages"));
    assert!(message.contains("failed to get connections with filter"));
}

#[tokio::test]
async fn resolve_aborts_on_pre_canceled_token() {
    let (service, repository) = service(FakeConnectionGraphRepository {
        tuples: vec![direct_tuple(1, 2, 10, 100)],
        ..FakeConnectionGraphRepository::default()
    });

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = service
        .resolve_connections(&restricted_filter(), ConnectionDirection::ToOthers, &cancel)
        .await;

    assert!(matches!(result, Err(AppError::Canceled(_))));
    assert!(!repository.fetch_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn exclude_deleted_drops_tuples_touching_deleted_parties() {
    let via_deleted = ConnectionTuple {
        via_id: Some(party_id(3)),
        ..direct_tuple(1, 2, 10, 100)
    };
    let (service, _) = service(FakeConnectionGraphRepository {
        tuples: vec![
            direct_tuple(1, 2, 10, 100),
            via_deleted,
            direct_tuple(3, 2, 10, 101),
        ],
        parties: vec![party(1, false), party(2, false), party(3, true)],
        ..FakeConnectionGraphRepository::default()
    });

    let mut filter = restricted_filter();
    filter.exclude_deleted = true;

    let records = service
        .resolve_connections(&filter, ConnectionDirection::ToOthers, &CancellationToken::new())
        .await
        .unwrap_or_default();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].from_id, party_id(1));
    assert!(records[0].via_id.is_none());
    assert_eq!(
        records[0].from_party.as_ref().map(|party| party.id()),
        Some(party_id(1))
    );
}

#[tokio::test]
async fn enrichment_skipped_leaves_party_objects_unset() {
    let (service, _) = service(FakeConnectionGraphRepository {
        tuples: vec![direct_tuple(1, 2, 10, 100)],
        parties: vec![party(1, false), party(2, false)],
        ..FakeConnectionGraphRepository::default()
    });

    let mut filter = restricted_filter();
    filter.enrich_entities = false;

    let records = service
        .resolve_connections(&filter, ConnectionDirection::ToOthers, &CancellationToken::new())
        .await
        .unwrap_or_default();

    assert_eq!(records.len(), 1);
    assert!(records[0].from_party.is_none());
    assert!(records[0].role.is_none());
}

#[tokio::test]
async fn attached_packages_are_deduped_across_lookup_paths() {
    let tuple = direct_tuple(1, 2, 10, 100);
    let (service, _) = service(FakeConnectionGraphRepository {
        tuples: vec![tuple],
        parties: vec![party(1, false), party(2, false)],
        assignment_packages: vec![(
            AssignmentId::from_uuid(Uuid::from_u128(100)),
            package(500),
        )],
        role_packages: vec![
            (role_id(10), package(500)),
            (role_id(10), package(501)),
        ],
        ..FakeConnectionGraphRepository::default()
    });

    let mut filter = restricted_filter();
    filter.include_packages = true;

    let records = service
        .resolve_connections(&filter, ConnectionDirection::ToOthers, &CancellationToken::new())
        .await
        .unwrap_or_default();

    assert_eq!(records.len(), 1);
    let mut attached: Vec<PackageId> = records[0]
        .packages
        .iter()
        .map(|attached| attached.package.id())
        .collect();
    attached.sort();
    assert_eq!(
        attached,
        vec![
            PackageId::from_uuid(Uuid::from_u128(500)),
            PackageId::from_uuid(Uuid::from_u128(501)),
        ]
    );
}

#[tokio::test]
async fn package_resource_expansion_drops_packages_without_matches() {
    let tuple = direct_tuple(1, 2, 10, 100);
    let empty_package = package(500);
    let carrier_package = package(501);
    let matching = resource(600);
    let excluded = resource(601);

    let repository = FakeConnectionGraphRepository {
        tuples: vec![tuple],
        parties: vec![party(1, false), party(2, false)],
        assignment_packages: vec![
            (AssignmentId::from_uuid(Uuid::from_u128(100)), empty_package),
            (AssignmentId::from_uuid(Uuid::from_u128(100)), carrier_package),
        ],
        package_resources: vec![
            (PackageId::from_uuid(Uuid::from_u128(501)), matching),
            (PackageId::from_uuid(Uuid::from_u128(501)), excluded),
        ],
        ..FakeConnectionGraphRepository::default()
    };
    let (service, _) = service(repository);

    let mut filter = restricted_filter();
    filter.enrich_package_resources = true;
    filter
        .resource_ids
        .insert(ResourceId::from_uuid(Uuid::from_u128(600)));

    let records = service
        .resolve_connections(&filter, ConnectionDirection::ToOthers, &CancellationToken::new())
        .await
        .unwrap_or_default();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].packages.len(), 1);
    assert_eq!(
        records[0].packages[0].package.id(),
        PackageId::from_uuid(Uuid::from_u128(501))
    );
    assert_eq!(records[0].packages[0].resources.len(), 1);
    assert_eq!(
        records[0].packages[0].resources[0].id(),
        ResourceId::from_uuid(Uuid::from_u128(600))
    );
}

#[tokio::test]
async fn package_resource_expansion_keeps_empty_packages_when_requested() {
    let tuple = direct_tuple(1, 2, 10, 100);
    let repository = FakeConnectionGraphRepository {
        tuples: vec![tuple],
        parties: vec![party(1, false), party(2, false)],
        assignment_packages: vec![(
            AssignmentId::from_uuid(Uuid::from_u128(100)),
            package(500),
        )],
        ..FakeConnectionGraphRepository::default()
    };
    let (service, _) = service(repository);

    let mut filter = restricted_filter();
    filter.include_packages = true;
    filter.enrich_package_resources = true;

    let records = service
        .resolve_connections(&filter, ConnectionDirection::ToOthers, &CancellationToken::new())
        .await
        .unwrap_or_default();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].packages.len(), 1);
    assert!(records[0].packages[0].resources.is_empty());
}

#[tokio::test]
async fn resources_attach_through_the_delegation_path() {
    let delegation_id = DelegationId::from_uuid(Uuid::from_u128(700));
    let tuple = ConnectionTuple {
        assignment_id: None,
        delegation_id: Some(delegation_id),
        role_id: None,
        ..direct_tuple(1, 2, 10, 100)
    };
    let (service, _) = service(FakeConnectionGraphRepository {
        tuples: vec![tuple],
        parties: vec![party(1, false), party(2, false)],
        delegation_resources: vec![(delegation_id, resource(600))],
        ..FakeConnectionGraphRepository::default()
    });

    let mut filter = restricted_filter();
    filter.include_resource = true;

    let records = service
        .resolve_connections(&filter, ConnectionDirection::ToOthers, &CancellationToken::new())
        .await
        .unwrap_or_default();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resources.len(), 1);
    assert_eq!(
        records[0].resources[0].id(),
        ResourceId::from_uuid(Uuid::from_u128(600))
    );
}

#[tokio::test]
async fn explain_query_validates_and_renders_without_executing() {
    let (service, repository) = service(FakeConnectionGraphRepository::default());

    let unrestricted = service.explain_query(&ConnectionFilter::default(), ConnectionDirection::ToOthers);
    assert!(unrestricted.is_err());

    let rendered = service.explain_query(&restricted_filter(), ConnectionDirection::FromOthers);
    assert_eq!(rendered.ok().as_deref(), Some("composed query"));
    assert!(!repository.fetch_called.load(Ordering::SeqCst));
}
