//! Definition lookup: prefix tables, include closures and scope walks.

use crate::error::LinkError;
use crate::model::{EntityKind, Location, NodeId, NodeKind, Owner, Schema, UnitId};
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;

/// Node kind a named reference binds to.
#[must_use]
pub(crate) fn definition_kind(kind: EntityKind) -> Option<NodeKind> {
    match kind {
        EntityKind::IfFeature => Some(NodeKind::Feature),
        EntityKind::Uses => Some(NodeKind::Grouping),
        EntityKind::DerivedType => Some(NodeKind::Typedef),
        EntityKind::Base | EntityKind::IdentityRef => Some(NodeKind::Identity),
        _ => None,
    }
}

/// Module a prefix denotes inside `unit`.
///
/// No prefix and the unit's own prefix both mean the unit's module.
pub(crate) fn module_for_prefix(
    schema: &Schema,
    unit: UnitId,
    prefix: Option<&str>,
    location: &Location,
    construct: &'static str,
) -> Result<UnitId, LinkError> {
    let u = schema.unit(unit);
    let prefix = match prefix {
        Some(p) if p != u.prefix => p,
        _ => return Ok(schema.module_of(unit)),
    };
    let Some(import) = u.import_by_prefix(prefix) else {
        return Err(LinkError::UnknownPrefix {
            location: location.clone(),
            construct,
            prefix: String::from(prefix),
        });
    };
    import.target.ok_or_else(|| {
        LinkError::data_model(
            &import.location,
            alloc::format!("import of \"{}\" was never bound", import.module),
        )
    })
}

/// Prefix `site` uses for `module`.
pub(crate) fn prefix_for_module(
    schema: &Schema,
    site: UnitId,
    module: UnitId,
    location: &Location,
) -> Result<String, LinkError> {
    let unit = schema.unit(site);
    if schema.module_of(site) == module {
        return Ok(unit.prefix.clone());
    }
    unit.imports
        .iter()
        .find(|i| i.target == Some(module))
        .map(|i| i.prefix.clone())
        .ok_or_else(|| LinkError::NotImported {
            location: location.clone(),
            module: schema.unit(module).name.clone(),
            unit: unit.name.clone(),
        })
}

/// A module and every submodule it includes, transitively.
#[must_use]
pub(crate) fn module_units(schema: &Schema, module: UnitId) -> Vec<UnitId> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let mut stack = alloc::vec![module];
    while let Some(unit) = stack.pop() {
        if !seen.insert(unit) {
            continue;
        }
        out.push(unit);
        let u = schema.unit(unit);
        stack.extend(u.includes.iter().rev().filter_map(|i| i.target));
    }
    out
}

/// Search the scopes enclosing `holder` for a definition.
///
/// Walks owners up to the unit root. A node cloned from a grouping keeps
/// searching from its origin, so scoped typedefs inside the grouping stay
/// visible at the use site.
#[must_use]
pub(crate) fn search_scope(
    schema: &Schema,
    holder: NodeId,
    kind: NodeKind,
    name: &str,
) -> Option<NodeId> {
    let mut visited = BTreeSet::new();
    let mut from = Some(holder);
    while let Some(start) = from {
        if !visited.insert(start) {
            break;
        }
        let mut owner = schema.node(start).owner;
        while let Some(scope) = owner {
            if let Some(found) = find_definition(schema, scope, kind, name) {
                return Some(found);
            }
            owner = match scope {
                Owner::Node(node) => schema.node(node).owner,
                Owner::Unit(_) => None,
            };
        }
        from = schema.node(start).origin;
    }
    None
}

/// Search the root-level definitions of `units`.
#[must_use]
pub(crate) fn search_roots(
    schema: &Schema,
    units: &[UnitId],
    kind: NodeKind,
    name: &str,
) -> Option<NodeId> {
    units
        .iter()
        .find_map(|&unit| find_definition(schema, Owner::Unit(unit), kind, name))
}

/// Whether a definition sits inside another node rather than at a unit root.
#[must_use]
pub(crate) fn is_scoped(schema: &Schema, definition: NodeId) -> bool {
    matches!(schema.node(definition).owner, Some(Owner::Node(_)))
}

fn find_definition(schema: &Schema, scope: Owner, kind: NodeKind, name: &str) -> Option<NodeId> {
    schema.children(scope).find(|&c| {
        let node = schema.node(c);
        node.kind == kind && node.name == name
    })
}
