//! Lowers the composed query IR to one SQL statement per derivation mode.
//!
//! Every logical rule source selects the same column list; sources are glued
//! with `UNION ALL` and a unique-results query collapses duplicates in the
//! outer grouped select, OR-ing the provenance flags of collapsed rows.

use tieline_application::{ConnectionQuery, MergeStrategy, QueryPlan, RuleSource};

const DIRECT: &str = "\
SELECT assignment.id AS assignment_id, NULL::uuid AS delegation_id,
       assignment.from_id, assignment.to_id, assignment.role_id,
       NULL::uuid AS via_id, NULL::uuid AS via_role_id,
       'assignment'::text AS reason,
       FALSE AS is_key_role_access, FALSE AS is_role_map
FROM assignment";

const KEY_ROLE: &str = "\
SELECT granting.id AS assignment_id, NULL::uuid AS delegation_id,
       granting.from_id, key_assignment.to_id, granting.role_id,
       key_assignment.from_id AS via_id, key_assignment.role_id AS via_role_id,
       'key_role'::text AS reason,
       TRUE AS is_key_role_access, FALSE AS is_role_map
FROM assignment AS key_assignment
INNER JOIN role AS key_role
    ON key_role.id = key_assignment.role_id AND key_role.is_key_role
INNER JOIN assignment AS granting
    ON granting.to_id = key_assignment.from_id";

const HIERARCHY_OF_DIRECT: &str = "\
SELECT assignment.id AS assignment_id, NULL::uuid AS delegation_id,
       child.id AS from_id, assignment.to_id, assignment.role_id,
       assignment.from_id AS via_id, NULL::uuid AS via_role_id,
       'hierarchy'::text AS reason,
       FALSE AS is_key_role_access, FALSE AS is_role_map
FROM party AS child
INNER JOIN assignment
    ON assignment.from_id = child.parent_id";

const HIERARCHY_OF_KEY_ROLE: &str = "\
SELECT granting.id AS assignment_id, NULL::uuid AS delegation_id,
       child.id AS from_id, key_assignment.to_id, granting.role_id,
       granting.from_id AS via_id, key_assignment.role_id AS via_role_id,
       'key_role'::text AS reason,
       TRUE AS is_key_role_access, FALSE AS is_role_map
FROM party AS child
INNER JOIN assignment AS granting
    ON granting.from_id = child.parent_id
INNER JOIN assignment AS key_assignment
    ON key_assignment.from_id = granting.to_id
INNER JOIN role AS key_role
    ON key_role.id = key_assignment.role_id AND key_role.is_key_role";

const ROLE_MAP_OF_DIRECT: &str = "\
SELECT assignment.id AS assignment_id, NULL::uuid AS delegation_id,
       assignment.from_id, assignment.to_id, role_map.get_role_id AS role_id,
       NULL::uuid AS via_id, NULL::uuid AS via_role_id,
       'role_map'::text AS reason,
       FALSE AS is_key_role_access, TRUE AS is_role_map
FROM assignment
INNER JOIN role_map
    ON role_map.has_role_id = assignment.role_id";

const ROLE_MAP_OF_KEY_ROLE: &str = "\
SELECT granting.id AS assignment_id, NULL::uuid AS delegation_id,
       granting.from_id, key_assignment.to_id, role_map.get_role_id AS role_id,
       key_assignment.from_id AS via_id, key_assignment.role_id AS via_role_id,
       'key_role'::text AS reason,
       TRUE AS is_key_role_access, TRUE AS is_role_map
FROM assignment AS key_assignment
INNER JOIN role AS key_role
    ON key_role.id = key_assignment.role_id AND key_role.is_key_role
INNER JOIN assignment AS granting
    ON granting.to_id = key_assignment.from_id
INNER JOIN role_map
    ON role_map.has_role_id = granting.role_id";

const DELEGATION: &str = "\
SELECT NULL::uuid AS assignment_id, delegation.id AS delegation_id,
       from_assignment.from_id, to_assignment.to_id, NULL::uuid AS role_id,
       from_assignment.to_id AS via_id, NULL::uuid AS via_role_id,
       'delegation'::text AS reason,
       FALSE AS is_key_role_access, FALSE AS is_role_map
FROM delegation
INNER JOIN assignment AS from_assignment
    ON from_assignment.id = delegation.from_assignment_id
INNER JOIN assignment AS to_assignment
    ON to_assignment.id = delegation.to_assignment_id";

const DELEGATION_KEY_ROLE: &str = "\
SELECT NULL::uuid AS assignment_id, delegation.id AS delegation_id,
       from_assignment.from_id, to_assignment.to_id, NULL::uuid AS role_id,
       from_assignment.to_id AS via_id, to_assignment.role_id AS via_role_id,
       'key_role'::text AS reason,
       TRUE AS is_key_role_access, FALSE AS is_role_map
FROM delegation
INNER JOIN assignment AS from_assignment
    ON from_assignment.id = delegation.from_assignment_id
INNER JOIN assignment AS to_assignment
    ON to_assignment.id = delegation.to_assignment_id
INNER JOIN role AS receiving_role
    ON receiving_role.id = to_assignment.role_id AND receiving_role.is_key_role";

const ALIASED_FROM_BASE: &str = "\
SELECT base.assignment_id, base.delegation_id, base.from_id, base.to_id,
       role_map.get_role_id AS role_id, base.via_id, base.via_role_id,
       'role_map'::text AS reason,
       base.is_key_role_access, TRUE AS is_role_map
FROM base
INNER JOIN role_map
    ON role_map.has_role_id = base.role_id";

const DELEGATED_FROM_COMBINED: &str = "\
SELECT NULL::uuid AS assignment_id, delegation.id AS delegation_id,
       from_assignment.from_id, combined.to_id, NULL::uuid AS role_id,
       from_assignment.to_id AS via_id, NULL::uuid AS via_role_id,
       'delegation'::text AS reason,
       combined.is_key_role_access, combined.is_role_map
FROM combined
INNER JOIN delegation
    ON delegation.to_assignment_id = combined.assignment_id
INNER JOIN assignment AS from_assignment
    ON from_assignment.id = delegation.from_assignment_id";

pub(super) const PARTIES: &str = "\
SELECT party.id, party.parent_id, party.name, party.is_deleted
FROM party
WHERE party.id = ANY($1::uuid[])";

pub(super) const ROLES: &str = "\
SELECT role.id, role.code, role.name, role.is_key_role
FROM role
WHERE role.id = ANY($1::uuid[])";

pub(super) const ASSIGNMENT_PACKAGES: &str = "\
SELECT grants.assignment_id AS owner_id, package.id AS capability_id, package.urn AS reference
FROM assignment_package AS grants
INNER JOIN package ON package.id = grants.package_id
WHERE grants.assignment_id = ANY($1::uuid[])
    AND (cardinality($2::uuid[]) = 0 OR package.id = ANY($2::uuid[]))";

pub(super) const ROLE_PACKAGES: &str = "\
SELECT grants.role_id AS owner_id, package.id AS capability_id, package.urn AS reference
FROM role_package AS grants
INNER JOIN package ON package.id = grants.package_id
WHERE grants.role_id = ANY($1::uuid[])
    AND (cardinality($2::uuid[]) = 0 OR package.id = ANY($2::uuid[]))";

pub(super) const DELEGATION_PACKAGES: &str = "\
SELECT grants.delegation_id AS owner_id, package.id AS capability_id, package.urn AS reference
FROM delegation_package AS grants
INNER JOIN package ON package.id = grants.package_id
WHERE grants.delegation_id = ANY($1::uuid[])
    AND (cardinality($2::uuid[]) = 0 OR package.id = ANY($2::uuid[]))";

pub(super) const ASSIGNMENT_RESOURCES: &str = "\
SELECT grants.assignment_id AS owner_id, resource.id AS capability_id, resource.ref_id AS reference
FROM assignment_resource AS grants
INNER JOIN resource ON resource.id = grants.resource_id
WHERE grants.assignment_id = ANY($1::uuid[])
    AND (cardinality($2::uuid[]) = 0 OR resource.id = ANY($2::uuid[]))";

pub(super) const ROLE_RESOURCES: &str = "\
SELECT grants.role_id AS owner_id, resource.id AS capability_id, resource.ref_id AS reference
FROM role_resource AS grants
INNER JOIN resource ON resource.id = grants.resource_id
WHERE grants.role_id = ANY($1::uuid[])
    AND (cardinality($2::uuid[]) = 0 OR resource.id = ANY($2::uuid[]))";

pub(super) const DELEGATION_RESOURCES: &str = "\
SELECT grants.delegation_id AS owner_id, resource.id AS capability_id, resource.ref_id AS reference
FROM delegation_resource AS grants
INNER JOIN resource ON resource.id = grants.resource_id
WHERE grants.delegation_id = ANY($1::uuid[])
    AND (cardinality($2::uuid[]) = 0 OR resource.id = ANY($2::uuid[]))";

pub(super) const PACKAGE_RESOURCES: &str = "\
SELECT memberships.package_id AS owner_id, resource.id AS capability_id, resource.ref_id AS reference
FROM package_resource AS memberships
INNER JOIN resource ON resource.id = memberships.resource_id
WHERE memberships.package_id = ANY($1::uuid[])
    AND (cardinality($2::uuid[]) = 0 OR resource.id = ANY($2::uuid[]))";

fn rule_select(source: RuleSource) -> &'static str {
    match source {
        RuleSource::Direct => DIRECT,
        RuleSource::KeyRoleDirect => KEY_ROLE,
        RuleSource::HierarchyOfDirect => HIERARCHY_OF_DIRECT,
        RuleSource::HierarchyOfKeyRole => HIERARCHY_OF_KEY_ROLE,
        RuleSource::RoleMapOfDirect => ROLE_MAP_OF_DIRECT,
        RuleSource::RoleMapOfKeyRole => ROLE_MAP_OF_KEY_ROLE,
        RuleSource::Delegation => DELEGATION,
        RuleSource::DelegationKeyRole => DELEGATION_KEY_ROLE,
    }
}

/// Builds the single statement executing the composed base query.
///
/// Binds: `$1` from-id restriction, `$2` to-id restriction, `$3` role-id
/// restriction, each an possibly-empty uuid array.
pub(super) fn build_base_statement(query: &ConnectionQuery) -> String {
    match &query.plan {
        QueryPlan::ToOthers { sources } => {
            let body = sources
                .iter()
                .map(|source| rule_select(*source))
                .collect::<Vec<_>>()
                .join("\nUNION ALL\n");
            wrap_with_restrictions(&body, query.merge)
        }
        QueryPlan::FromOthers {
            include_key_role,
            include_delegation,
            include_sub_connections,
        } => build_from_others(
            *include_key_role,
            *include_delegation,
            *include_sub_connections,
            query.merge,
        ),
    }
}

fn build_from_others(
    include_key_role: bool,
    include_delegation: bool,
    include_sub_connections: bool,
    merge: MergeStrategy,
) -> String {
    let base = if include_key_role {
        format!("{DIRECT}\nUNION ALL\n{KEY_ROLE}")
    } else {
        DIRECT.to_owned()
    };

    let mut ctes: Vec<(&str, String)> = vec![
        ("base", base),
        ("aliased", ALIASED_FROM_BASE.to_owned()),
        (
            "combined",
            "SELECT * FROM base\nUNION ALL\nSELECT * FROM aliased".to_owned(),
        ),
    ];
    let mut current = "combined";

    if include_delegation {
        ctes.push(("delegated", DELEGATED_FROM_COMBINED.to_owned()));
        ctes.push((
            "with_delegated",
            "SELECT * FROM combined\nUNION ALL\nSELECT * FROM delegated".to_owned(),
        ));
        current = "with_delegated";
    }

    if include_sub_connections {
        ctes.push((
            "sub_connections",
            format!(
                "SELECT source.assignment_id, source.delegation_id, child.id AS from_id,\n\
                 \x20      source.to_id, source.role_id, source.from_id AS via_id,\n\
                 \x20      source.via_role_id, 'hierarchy'::text AS reason,\n\
                 \x20      source.is_key_role_access, source.is_role_map\n\
                 FROM {current} AS source\n\
                 INNER JOIN party AS child ON child.parent_id = source.from_id"
            ),
        ));
        ctes.push((
            "expanded",
            format!("SELECT * FROM {current}\nUNION ALL\nSELECT * FROM sub_connections"),
        ));
        current = "expanded";
    }

    let with_clause = ctes
        .iter()
        .map(|(name, body)| format!("{name} AS (\n{body}\n)"))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "WITH {with_clause}\n{}",
        wrap_with_restrictions(&format!("SELECT * FROM {current}"), merge)
    )
}

fn wrap_with_restrictions(body: &str, merge: MergeStrategy) -> String {
    let restriction = "\
WHERE (cardinality($1::uuid[]) = 0 OR connection.from_id = ANY($1::uuid[]))
    AND (cardinality($2::uuid[]) = 0 OR connection.to_id = ANY($2::uuid[]))
    AND (cardinality($3::uuid[]) = 0 OR connection.role_id = ANY($3::uuid[]))";

    match merge {
        MergeStrategy::Union => format!(
            "SELECT connection.assignment_id, connection.delegation_id, connection.from_id,\n\
             \x20      connection.to_id, connection.role_id, connection.via_id,\n\
             \x20      connection.via_role_id, connection.reason,\n\
             \x20      bool_or(connection.is_key_role_access) AS is_key_role_access,\n\
             \x20      bool_or(connection.is_role_map) AS is_role_map\n\
             FROM (\n{body}\n) AS connection\n\
             {restriction}\n\
             GROUP BY connection.assignment_id, connection.delegation_id, connection.from_id,\n\
             \x20        connection.to_id, connection.role_id, connection.via_id,\n\
             \x20        connection.via_role_id, connection.reason"
        ),
        MergeStrategy::Concat => {
            format!("SELECT connection.*\nFROM (\n{body}\n) AS connection\n{restriction}")
        }
    }
}
