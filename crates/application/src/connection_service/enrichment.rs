use std::collections::{BTreeSet, HashMap};

use super::*;

impl ConnectionService {
    pub(super) async fn enrich_entities(
        &self,
        filter: &ConnectionFilter,
        tuples: &[ConnectionTuple],
        cancel: &CancellationToken,
    ) -> AppResult<Vec<ConnectionRecord>> {
        if !filter.enrich_entities && !filter.exclude_deleted {
            return Ok(tuples.iter().map(ConnectionRecord::from_tuple).collect());
        }

        let party_ids: Vec<PartyId> = tuples
            .iter()
            .flat_map(|tuple| [Some(tuple.from_id), Some(tuple.to_id), tuple.via_id])
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let role_ids: Vec<RoleId> = tuples
            .iter()
            .flat_map(|tuple| [tuple.role_id, tuple.via_role_id])
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let parties = run_cancellable(
            cancel,
            "party enrichment",
            self.repository.load_parties(&party_ids),
        )
        .await?;
        let roles = run_cancellable(cancel, "role enrichment", self.repository.load_roles(&role_ids))
            .await?;

        let parties: HashMap<PartyId, Party> =
            parties.into_iter().map(|party| (party.id(), party)).collect();
        let roles: HashMap<RoleId, Role> = roles.into_iter().map(|role| (role.id(), role)).collect();

        let mut records = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            if filter.exclude_deleted && touches_deleted_party(tuple, &parties) {
                continue;
            }

            let mut record = ConnectionRecord::from_tuple(tuple);
            if filter.enrich_entities {
                record.from_party = parties.get(&tuple.from_id).cloned();
                record.to_party = parties.get(&tuple.to_id).cloned();
                record.via_party = tuple.via_id.and_then(|id| parties.get(&id).cloned());
                record.role = tuple.role_id.and_then(|id| roles.get(&id).cloned());
                record.via_role = tuple.via_role_id.and_then(|id| roles.get(&id).cloned());
            }

            records.push(record);
        }

        Ok(records)
    }
}

fn touches_deleted_party(tuple: &ConnectionTuple, parties: &HashMap<PartyId, Party>) -> bool {
    let is_deleted =
        |id: PartyId| parties.get(&id).is_some_and(|party| party.is_deleted());

    is_deleted(tuple.from_id) || is_deleted(tuple.to_id) || tuple.via_id.is_some_and(is_deleted)
}
