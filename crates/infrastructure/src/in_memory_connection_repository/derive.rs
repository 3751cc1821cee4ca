use std::collections::HashMap;

use tieline_application::RuleSource;
use tieline_domain::{
    Assignment, AssignmentId, ConnectionReason, ConnectionTuple, Delegation, Party, Role, RoleId,
    RoleMap,
};

/// Immutable view of the graph tables taken for one query execution.
#[derive(Debug)]
pub(super) struct GraphSnapshot {
    pub(super) parties: Vec<Party>,
    pub(super) roles: HashMap<RoleId, Role>,
    pub(super) assignments: Vec<Assignment>,
    pub(super) assignments_by_id: HashMap<AssignmentId, Assignment>,
    pub(super) role_maps: Vec<RoleMap>,
    pub(super) delegations: Vec<Delegation>,
}

impl GraphSnapshot {
    /// Evaluates one to-others rule source against the snapshot.
    pub(super) fn derive_source(&self, source: RuleSource) -> Vec<ConnectionTuple> {
        match source {
            RuleSource::Direct => self.direct_tuples(),
            RuleSource::KeyRoleDirect => self.key_role_tuples(),
            RuleSource::HierarchyOfDirect => {
                self.hierarchy_hops(&self.direct_tuples(), ConnectionReason::Hierarchy)
            }
            RuleSource::HierarchyOfKeyRole => {
                self.hierarchy_hops(&self.key_role_tuples(), ConnectionReason::KeyRole)
            }
            RuleSource::RoleMapOfDirect => {
                self.role_map_aliases(&self.direct_tuples(), ConnectionReason::RoleMap)
            }
            RuleSource::RoleMapOfKeyRole => {
                self.role_map_aliases(&self.key_role_tuples(), ConnectionReason::KeyRole)
            }
            RuleSource::Delegation => self.delegation_tuples(),
            RuleSource::DelegationKeyRole => self.delegation_key_role_tuples(),
        }
    }

    /// Staged from-others composition: direct and key-role inherited
    /// assignments, their role-map aliases, delegations joined on the target
    /// assignment, and one hierarchy hop through child parties.
    pub(super) fn derive_from_others(
        &self,
        include_key_role: bool,
        include_delegation: bool,
        include_sub_connections: bool,
    ) -> Vec<ConnectionTuple> {
        let mut combined = self.direct_tuples();
        if include_key_role {
            combined.extend(self.key_role_tuples());
        }

        let aliases = self.role_map_aliases(&combined, ConnectionReason::RoleMap);
        combined.extend(aliases);

        if include_delegation {
            let delegated: Vec<ConnectionTuple> = combined
                .iter()
                .flat_map(|tuple| {
                    self.delegations
                        .iter()
                        .filter(|delegation| Some(delegation.to_assignment_id) == tuple.assignment_id)
                        .filter_map(|delegation| {
                            self.assignments_by_id
                                .get(&delegation.from_assignment_id)
                                .map(|from_assignment| tuple.delegated(delegation, from_assignment))
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
            combined.extend(delegated);
        }

        if include_sub_connections {
            let hops = self.hierarchy_hops(&combined, ConnectionReason::Hierarchy);
            combined.extend(hops);
        }

        combined
    }

    fn direct_tuples(&self) -> Vec<ConnectionTuple> {
        self.assignments.iter().map(ConnectionTuple::direct).collect()
    }

    fn key_role_tuples(&self) -> Vec<ConnectionTuple> {
        self.assignments
            .iter()
            .filter(|key_assignment| self.is_key_role(key_assignment.role_id))
            .flat_map(|key_assignment| {
                self.assignments
                    .iter()
                    .filter(move |granting| granting.to_id == key_assignment.from_id)
                    .map(move |granting| ConnectionTuple::key_role(granting, key_assignment))
            })
            .collect()
    }

    /// One hop only: consumes the supplied base tuples, never its own output.
    fn hierarchy_hops(
        &self,
        base: &[ConnectionTuple],
        reason: ConnectionReason,
    ) -> Vec<ConnectionTuple> {
        self.parties
            .iter()
            .filter_map(|child| child.parent_id().map(|parent_id| (child, parent_id)))
            .flat_map(|(child, parent_id)| {
                base.iter()
                    .filter(move |tuple| tuple.from_id == parent_id)
                    .map(move |tuple| tuple.hierarchy_hop(child.id(), reason))
            })
            .collect()
    }

    /// One hop only: aliases are applied to the base tuples, not re-expanded.
    fn role_map_aliases(
        &self,
        base: &[ConnectionTuple],
        reason: ConnectionReason,
    ) -> Vec<ConnectionTuple> {
        base.iter()
            .flat_map(|tuple| {
                self.role_maps
                    .iter()
                    .filter(move |role_map| Some(role_map.has_role_id) == tuple.role_id)
                    .map(move |role_map| tuple.role_alias(role_map.get_role_id, reason))
            })
            .collect()
    }

    fn delegation_tuples(&self) -> Vec<ConnectionTuple> {
        self.delegations
            .iter()
            .filter_map(|delegation| {
                let from_assignment = self.assignments_by_id.get(&delegation.from_assignment_id)?;
                let to_assignment = self.assignments_by_id.get(&delegation.to_assignment_id)?;
                Some(ConnectionTuple::delegation(
                    delegation,
                    from_assignment,
                    to_assignment,
                ))
            })
            .collect()
    }

    fn delegation_key_role_tuples(&self) -> Vec<ConnectionTuple> {
        self.delegations
            .iter()
            .filter_map(|delegation| {
                let from_assignment = self.assignments_by_id.get(&delegation.from_assignment_id)?;
                let to_assignment = self.assignments_by_id.get(&delegation.to_assignment_id)?;
                self.is_key_role(to_assignment.role_id).then(|| {
                    ConnectionTuple::delegation_key_role(
                        delegation,
                        from_assignment,
                        to_assignment,
                    )
                })
            })
            .collect()
    }

    fn is_key_role(&self, role_id: RoleId) -> bool {
        self.roles
            .get(&role_id)
            .is_some_and(|role| role.is_key_role())
    }
}
