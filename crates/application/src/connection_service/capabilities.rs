use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use tieline_domain::ConnectionPackage;

use super::*;

impl ConnectionService {
    pub(super) async fn attach_packages(
        &self,
        filter: &ConnectionFilter,
        mut records: Vec<ConnectionRecord>,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<ConnectionRecord>> {
        if !filter.include_packages && !filter.enrich_package_resources {
            return Ok(records);
        }

        let package_restriction: Vec<PackageId> = filter.package_ids.iter().copied().collect();

        let by_assignment = run_cancellable(
            cancel,
            "assignment package lookup",
            self.repository
                .load_assignment_packages(&assignment_ids(&records), &package_restriction),
        )
        .await?;
        let by_role = run_cancellable(
            cancel,
            "role package lookup",
            self.repository
                .load_role_packages(&role_ids(&records), &package_restriction),
        )
        .await?;
        let by_delegation = run_cancellable(
            cancel,
            "delegation package lookup",
            self.repository
                .load_delegation_packages(&delegation_ids(&records), &package_restriction),
        )
        .await?;

        let assignment_index = index_by_owner(by_assignment);
        let role_index = index_by_owner(by_role);
        let delegation_index = index_by_owner(by_delegation);

        for record in &mut records {
            let mut attached: Vec<Package> = Vec::new();
            if let Some(assignment_id) = record.assignment_id {
                attached.extend(owned(&assignment_index, &assignment_id));
            }
            if let Some(role_id) = record.role_id {
                attached.extend(owned(&role_index, &role_id));
            }
            if let Some(delegation_id) = record.delegation_id {
                attached.extend(owned(&delegation_index, &delegation_id));
            }

            record.packages = dedupe_by_id(attached, Package::id)
                .into_iter()
                .map(|package| ConnectionPackage {
                    package,
                    resources: Vec::new(),
                })
                .collect();
        }

        if filter.enrich_package_resources {
            self.expand_package_resources(filter, &mut records, cancel)
                .await?;
        }

        Ok(records)
    }

    async fn expand_package_resources(
        &self,
        filter: &ConnectionFilter,
        records: &mut [ConnectionRecord],
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let package_ids: Vec<PackageId> = records
            .iter()
            .flat_map(|record| record.packages.iter().map(|attached| attached.package.id()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let resource_restriction: Vec<ResourceId> = filter.resource_ids.iter().copied().collect();

        let rows = run_cancellable(
            cancel,
            "package resource lookup",
            self.repository
                .load_package_resources(&package_ids, &resource_restriction),
        )
        .await?;
        let resource_index = index_by_owner(rows);

        for record in records.iter_mut() {
            for attached in &mut record.packages {
                attached.resources = dedupe_by_id(
                    owned(&resource_index, &attached.package.id()),
                    Resource::id,
                );
            }

            // A package without matching resources is only useful as a carrier
            // when packages themselves were requested.
            if !filter.include_packages {
                record
                    .packages
                    .retain(|attached| !attached.resources.is_empty());
            }
        }

        Ok(())
    }

    pub(super) async fn attach_resources(
        &self,
        filter: &ConnectionFilter,
        mut records: Vec<ConnectionRecord>,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<ConnectionRecord>> {
        if !filter.include_resource {
            return Ok(records);
        }

        let resource_restriction: Vec<ResourceId> = filter.resource_ids.iter().copied().collect();

        let by_assignment = run_cancellable(
            cancel,
            "assignment resource lookup",
            self.repository
                .load_assignment_resources(&assignment_ids(&records), &resource_restriction),
        )
        .await?;
        let by_role = run_cancellable(
            cancel,
            "role resource lookup",
            self.repository
                .load_role_resources(&role_ids(&records), &resource_restriction),
        )
        .await?;
        let by_delegation = run_cancellable(
            cancel,
            "delegation resource lookup",
            self.repository
                .load_delegation_resources(&delegation_ids(&records), &resource_restriction),
        )
        .await?;

        let assignment_index = index_by_owner(by_assignment);
        let role_index = index_by_owner(by_role);
        let delegation_index = index_by_owner(by_delegation);

        for record in &mut records {
            let mut attached: Vec<Resource> = Vec::new();
            if let Some(assignment_id) = record.assignment_id {
                attached.extend(owned(&assignment_index, &assignment_id));
            }
            if let Some(role_id) = record.role_id {
                attached.extend(owned(&role_index, &role_id));
            }
            if let Some(delegation_id) = record.delegation_id {
                attached.extend(owned(&delegation_index, &delegation_id));
            }

            record.resources = dedupe_by_id(attached, Resource::id);
        }

        Ok(records)
    }
}

fn assignment_ids(records: &[ConnectionRecord]) -> Vec<AssignmentId> {
    distinct(records.iter().filter_map(|record| record.assignment_id))
}

fn role_ids(records: &[ConnectionRecord]) -> Vec<RoleId> {
    distinct(records.iter().filter_map(|record| record.role_id))
}

fn delegation_ids(records: &[ConnectionRecord]) -> Vec<DelegationId> {
    distinct(records.iter().filter_map(|record| record.delegation_id))
}

fn distinct<T: Ord>(values: impl Iterator<Item = T>) -> Vec<T> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}

fn index_by_owner<K: Eq + Hash, V>(rows: Vec<(K, V)>) -> HashMap<K, Vec<V>> {
    let mut index: HashMap<K, Vec<V>> = HashMap::new();
    for (owner, value) in rows {
        index.entry(owner).or_default().push(value);
    }

    index
}

fn owned<K: Eq + Hash, V: Clone>(index: &HashMap<K, Vec<V>>, owner: &K) -> Vec<V> {
    index.get(owner).cloned().unwrap_or_default()
}

fn dedupe_by_id<T, I: Eq + Hash>(values: Vec<T>, id_of: impl Fn(&T) -> I) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(id_of(value)))
        .collect()
}
