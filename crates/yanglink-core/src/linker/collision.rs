//! Collision detection and augment splicing.
//!
//! Names are only compared when the augment and its target live in the same
//! namespace; nodes from different namespaces never clash.

use super::context::LinkContext;
use super::deviation;
use crate::error::LinkError;
use crate::model::{Location, NodeId, NodeKind, Owner, Schema};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// Check an augment's children against what already exists at `target`.
///
/// Existing names are the target's children (for a choice also the children
/// of its cases) and the children of every augment already applied there,
/// whatever its namespace. Checking an augment that is already applied
/// reports its own first child.
pub(crate) fn check(schema: &Schema, augment: NodeId, target: NodeId) -> Result<(), LinkError> {
    let namespace = schema.namespace_of(schema.node(augment).unit);
    if namespace != schema.namespace_of(schema.node(target).unit) {
        return Ok(());
    }

    let mut existing: Vec<&str> = Vec::new();
    collect_names(schema, Owner::Node(target), &mut existing);
    for &applied in &schema.node(target).augments {
        collect_names(schema, Owner::Node(applied), &mut existing);
    }

    for child in schema.children(Owner::Node(augment)) {
        let node = schema.node(child);
        if !node.kind.is_schema_node() {
            continue;
        }
        if existing.contains(&node.name.as_str()) {
            return Err(LinkError::Collision {
                location: schema.node(augment).location.clone(),
                name: node.name.clone(),
            });
        }
    }
    Ok(())
}

/// Names directly under `owner`, looking through cases.
fn collect_names<'s>(schema: &'s Schema, owner: Owner, out: &mut Vec<&'s str>) {
    for child in schema.children(owner) {
        let node = schema.node(child);
        if !node.kind.is_schema_node() {
            continue;
        }
        out.push(node.name.as_str());
        if node.kind == NodeKind::Case {
            collect_names(schema, Owner::Node(child), out);
        }
    }
}

/// Wrap every non-case child of an augment aimed at a choice in a case of the
/// same name. Returns whether anything was wrapped.
pub(crate) fn wrap_for_choice(schema: &mut Schema, augment: NodeId, target: NodeId) -> bool {
    if schema.node(target).kind != NodeKind::Choice {
        return false;
    }
    let loose: Vec<NodeId> = schema
        .children(Owner::Node(augment))
        .filter(|&c| {
            let kind = schema.node(c).kind;
            kind.is_schema_node() && kind != NodeKind::Case
        })
        .collect();
    if loose.is_empty() {
        return false;
    }

    let unit = schema.node(augment).unit;
    let file = schema.unit(unit).file.clone();
    // Case -> the children it will adopt, held while they are detached.
    let mut adopted: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for child in loose {
        let name = schema.node(child).name.clone();
        let case = schema.push_node(crate::model::SchemaNode::new(
            NodeKind::Case,
            &name,
            unit,
            Location::synthetic(&file),
        ));
        schema.insert_after(child, case);
        schema.detach(child);
        adopted.entry(case).or_default().push(child);
    }
    for (case, children) in adopted {
        for child in children {
            schema.append_child(Owner::Node(case), child);
        }
    }
    true
}

/// Apply a top-level augment: its children stay under the augment, which is
/// recorded on the target.
pub(crate) fn apply_augment(ctx: &mut LinkContext<'_>, augment: NodeId, target: NodeId) -> Result<(), LinkError> {
    check(ctx.schema, augment, target)?;
    let wrapped = wrap_for_choice(ctx.schema, augment, target);
    deviation::record_link(ctx.schema, target, augment, |n| &mut n.augments);
    ctx.schema.node_mut(augment).augment_target = Some(target);
    ctx.summary.augments_applied += 1;
    ctx.observer.augment_applied(augment, target, wrapped);
    Ok(())
}

/// Apply a uses-scoped augment: its children move into the instantiated
/// target.
pub(crate) fn apply_uses_augment(
    ctx: &mut LinkContext<'_>,
    augment: NodeId,
    target: NodeId,
) -> Result<(), LinkError> {
    check(ctx.schema, augment, target)?;
    let wrapped = wrap_for_choice(ctx.schema, augment, target);
    let children: Vec<NodeId> = ctx.schema.children(Owner::Node(augment)).collect();
    for child in children {
        ctx.schema.detach(child);
        ctx.schema.append_child(Owner::Node(target), child);
    }
    ctx.schema.node_mut(augment).augment_target = Some(target);
    ctx.summary.augments_applied += 1;
    ctx.observer.augment_applied(augment, target, wrapped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitId;

    fn names(schema: &Schema, owner: NodeId) -> Vec<&str> {
        schema
            .children(Owner::Node(owner))
            .map(|c| schema.node(c).name.as_str())
            .collect()
    }

    fn loc() -> Location {
        Location::new("m.yang", 1, 1)
    }

    fn setup() -> (Schema, UnitId, NodeId) {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let c = schema.add_node(Owner::Unit(m), NodeKind::Container, "c", loc());
        schema.add_node(Owner::Node(c), NodeKind::Leaf, "x", loc());
        (schema, m, c)
    }

    fn augment(schema: &mut Schema, unit: UnitId, names: &[&str]) -> NodeId {
        let path = crate::model::SchemaPath::absolute(&[(None, "c")]);
        let aug = schema.add_augment(Owner::Unit(unit), path, loc());
        for name in names {
            schema.add_node(Owner::Node(aug), NodeKind::Leaf, name, loc());
        }
        aug
    }

    #[test]
    fn test_same_namespace_collision() {
        let (mut schema, m, c) = setup();
        let aug = augment(&mut schema, m, &["y", "x"]);
        let err = check(&schema, aug, c).unwrap_err();
        assert!(matches!(err, LinkError::Collision { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_other_namespace_never_collides() {
        let (mut schema, _, c) = setup();
        let other = schema.add_module("o", "urn:o", "o", "o.yang");
        let aug = augment(&mut schema, other, &["x"]);
        assert!(check(&schema, aug, c).is_ok());
    }

    #[test]
    fn test_earlier_foreign_augment_counts_as_existing() {
        let (mut schema, m, c) = setup();
        let other = schema.add_module("o", "urn:o", "o", "o.yang");
        let foreign = augment(&mut schema, other, &["y"]);
        schema.node_mut(c).augments.push(foreign);
        let aug = augment(&mut schema, m, &["z", "y"]);
        let err = check(&schema, aug, c).unwrap_err();
        assert!(matches!(err, LinkError::Collision { ref name, .. } if name == "y"));
    }

    #[test]
    fn test_reapplying_is_detected() {
        let (mut schema, m, c) = setup();
        let aug = augment(&mut schema, m, &["y"]);
        check(&schema, aug, c).unwrap();
        schema.node_mut(c).augments.push(aug);
        let err = check(&schema, aug, c).unwrap_err();
        assert!(matches!(err, LinkError::Collision { ref name, .. } if name == "y"));
    }

    #[test]
    fn test_choice_children_get_cases() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let ch = schema.add_node(Owner::Unit(m), NodeKind::Choice, "ch", loc());
        let path = crate::model::SchemaPath::absolute(&[(None, "ch")]);
        let aug = schema.add_augment(Owner::Unit(m), path, loc());
        schema.add_node(Owner::Node(aug), NodeKind::Leaf, "a", loc());
        schema.add_node(Owner::Node(aug), NodeKind::Case, "b", loc());
        schema.add_node(Owner::Node(aug), NodeKind::Container, "c", loc());

        assert!(wrap_for_choice(&mut schema, aug, ch));
        let kids: Vec<_> = schema.children(Owner::Node(aug)).collect();
        assert_eq!(names(&schema, aug), ["a", "b", "c"]);
        for &kid in &kids {
            assert_eq!(schema.node(kid).kind, NodeKind::Case);
        }
        let wrapped = schema.children(Owner::Node(kids[0])).next().unwrap();
        assert_eq!(schema.node(wrapped).kind, NodeKind::Leaf);
        assert_eq!(schema.node(wrapped).parent(), Some(kids[0]));
    }

    #[test]
    fn test_choice_case_children_count_as_existing() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let ch = schema.add_node(Owner::Unit(m), NodeKind::Choice, "ch", loc());
        let case = schema.add_node(Owner::Node(ch), NodeKind::Case, "one", loc());
        schema.add_node(Owner::Node(case), NodeKind::Leaf, "a", loc());
        let path = crate::model::SchemaPath::absolute(&[(None, "ch")]);
        let aug = schema.add_augment(Owner::Unit(m), path, loc());
        schema.add_node(Owner::Node(aug), NodeKind::Leaf, "a", loc());
        assert!(check(&schema, aug, ch).is_err());
    }
}
