use std::collections::BTreeSet;

use tieline_domain::{ConnectionTuple, PartyId, RoleId};

use crate::ConnectionFilter;

/// How independently derived rule outputs are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Set union: tuples identical across every field collapse to one.
    Union,
    /// Concatenation: duplicates stay, each keeping its own reason.
    Concat,
}

/// Direction of a connection resolution query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDirection {
    /// What the `from` parties can reach.
    ToOthers,
    /// What reaches the `to` parties.
    FromOthers,
}

/// One derivation rule in the to-others composition.
///
/// A closed set of tagged variants, one per producing rule; the repository
/// lowers each to a logical source and unions them in a single execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    /// The assignment rows themselves.
    Direct,
    /// Assignments inherited by key-role holders.
    KeyRoleDirect,
    /// Direct assignments propagated one hop to child parties.
    HierarchyOfDirect,
    /// Key-role inherited assignments propagated one hop to child parties.
    HierarchyOfKeyRole,
    /// Direct assignments re-emitted under aliased roles.
    RoleMapOfDirect,
    /// Key-role inherited assignments re-emitted under aliased roles.
    RoleMapOfKeyRole,
    /// Assignment rights forwarded by delegations.
    Delegation,
    /// Delegations whose receiving assignment carries a key role.
    DelegationKeyRole,
}

impl RuleSource {
    /// Returns a stable name used when rendering the composed query.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::KeyRoleDirect => "key_role_direct",
            Self::HierarchyOfDirect => "hierarchy_of_direct",
            Self::HierarchyOfKeyRole => "hierarchy_of_key_role",
            Self::RoleMapOfDirect => "role_map_of_direct",
            Self::RoleMapOfKeyRole => "role_map_of_key_role",
            Self::Delegation => "delegation",
            Self::DelegationKeyRole => "delegation_key_role",
        }
    }
}

/// Composition plan for one derivation mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Mode A: independent rule outputs merged flat.
    ToOthers {
        /// Enabled rules, in composition order.
        sources: Vec<RuleSource>,
    },
    /// Mode B: staged composition answering "who can act on me".
    FromOthers {
        /// Include key-role inherited assignments in the base stage.
        include_key_role: bool,
        /// Join delegations targeting a base assignment.
        include_delegation: bool,
        /// Expand every tuple one hierarchy hop through child parties.
        include_sub_connections: bool,
    },
}

/// Declarative intermediate representation of one resolution query.
///
/// Building the query touches no storage; the repository executes it in a
/// single roundtrip, applying the id restrictions after rule composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionQuery {
    /// Composition plan for the selected direction.
    pub plan: QueryPlan,
    /// Merge strategy for combined rule outputs.
    pub merge: MergeStrategy,
    /// Final restriction on the `from` party.
    pub from_ids: BTreeSet<PartyId>,
    /// Final restriction on the `to` party.
    pub to_ids: BTreeSet<PartyId>,
    /// Final restriction on the carried role.
    pub role_ids: BTreeSet<RoleId>,
}

impl ConnectionQuery {
    /// Builds the query plan for a validated filter. No storage is touched.
    #[must_use]
    pub fn from_filter(filter: &ConnectionFilter, direction: ConnectionDirection) -> Self {
        let plan = match direction {
            ConnectionDirection::ToOthers => QueryPlan::ToOthers {
                sources: Self::to_others_sources(filter),
            },
            ConnectionDirection::FromOthers => QueryPlan::FromOthers {
                include_key_role: filter.include_key_role,
                include_delegation: filter.include_delegation,
                include_sub_connections: filter.include_sub_connections,
            },
        };

        Self {
            plan,
            merge: if filter.only_unique_results {
                MergeStrategy::Union
            } else {
                MergeStrategy::Concat
            },
            from_ids: filter.from_ids.clone(),
            to_ids: filter.to_ids.clone(),
            role_ids: filter.role_ids.clone(),
        }
    }

    fn to_others_sources(filter: &ConnectionFilter) -> Vec<RuleSource> {
        let mut sources = vec![RuleSource::Direct];
        if filter.include_key_role {
            sources.push(RuleSource::KeyRoleDirect);
        }
        sources.push(RuleSource::HierarchyOfDirect);
        if filter.include_key_role {
            sources.push(RuleSource::HierarchyOfKeyRole);
        }
        sources.push(RuleSource::RoleMapOfDirect);
        if filter.include_key_role {
            sources.push(RuleSource::RoleMapOfKeyRole);
        }
        if filter.include_delegation {
            sources.push(RuleSource::Delegation);
            if filter.include_key_role {
                sources.push(RuleSource::DelegationKeyRole);
            }
        }

        sources
    }

    /// Applies the final id restriction to a composed tuple.
    ///
    /// A non-empty role restriction excludes role-less delegation tuples.
    #[must_use]
    pub fn matches(&self, tuple: &ConnectionTuple) -> bool {
        (self.from_ids.is_empty() || self.from_ids.contains(&tuple.from_id))
            && (self.to_ids.is_empty() || self.to_ids.contains(&tuple.to_id))
            && (self.role_ids.is_empty()
                || tuple
                    .role_id
                    .is_some_and(|role_id| self.role_ids.contains(&role_id)))
    }
}

#[cfg(test)]
mod tests {
    use tieline_domain::{Assignment, AssignmentId, ConnectionTuple, PartyId, RoleId};

    use crate::ConnectionFilter;

    use super::{ConnectionDirection, ConnectionQuery, MergeStrategy, QueryPlan, RuleSource};

    #[test]
    fn default_filter_enables_every_rule() {
        let query = ConnectionQuery::from_filter(
            &ConnectionFilter::default(),
            ConnectionDirection::ToOthers,
        );

        let QueryPlan::ToOthers { sources } = query.plan else {
            panic!("expected a to-others plan");
        };
        assert_eq!(sources.len(), 8);
        assert_eq!(query.merge, MergeStrategy::Union);
    }

    #[test]
    fn disabled_switches_remove_their_rules() {
        let filter = ConnectionFilter {
            include_key_role: false,
            include_delegation: false,
            only_unique_results: false,
            ..ConnectionFilter::default()
        };
        let query = ConnectionQuery::from_filter(&filter, ConnectionDirection::ToOthers);

        let QueryPlan::ToOthers { sources } = query.plan else {
            panic!("expected a to-others plan");
        };
        assert_eq!(
            sources,
            vec![
                RuleSource::Direct,
                RuleSource::HierarchyOfDirect,
                RuleSource::RoleMapOfDirect,
            ]
        );
        assert_eq!(query.merge, MergeStrategy::Concat);
    }

    #[test]
    fn role_restriction_excludes_roleless_delegation_tuples() {
        let role_id = RoleId::new();
        let mut filter = ConnectionFilter::default();
        filter.role_ids.insert(role_id);
        let query = ConnectionQuery::from_filter(&filter, ConnectionDirection::ToOthers);

        let assignment = Assignment::new(AssignmentId::new(), PartyId::new(), PartyId::new(), role_id);
        let with_role = ConnectionTuple::direct(&assignment);
        let without_role = ConnectionTuple {
            role_id: None,
            ..with_role
        };

        assert!(query.matches(&with_role));
        assert!(!query.matches(&without_role));
    }
}
