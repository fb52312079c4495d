//! Phase 5: Identity derivation.
//!
//! Record every identity on each of its transitive bases, so downstream
//! stages can enumerate the values an identityref accepts.

use crate::error::LinkError;
use crate::linker::context::LinkContext;
use crate::linker::deviation;
use crate::model::{EntityKind, NodeId, NodeKind, Schema};
use alloc::collections::BTreeSet;
use alloc::vec::Vec;

/// Fill `derived_identities` for every identity's bases.
pub fn propagate_identities(ctx: &mut LinkContext<'_>) -> Result<(), LinkError> {
    let identities: Vec<NodeId> = ctx
        .schema
        .source_unit_ids()
        .into_iter()
        .flat_map(|unit| ctx.schema.roots(unit).collect::<Vec<_>>())
        .filter(|&node| ctx.schema.node(node).kind == NodeKind::Identity)
        .collect();

    for identity in identities {
        for base in transitive_bases(ctx.schema, identity)? {
            deviation::record_link(ctx.schema, base, identity, |n| &mut n.derived_identities);
        }
    }
    Ok(())
}

fn direct_bases(schema: &Schema, identity: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    schema
        .node(identity)
        .entities
        .iter()
        .map(|&id| schema.entity(id))
        .filter(|e| e.kind == EntityKind::Base)
        .filter_map(|e| e.target)
}

fn transitive_bases(schema: &Schema, identity: NodeId) -> Result<Vec<NodeId>, LinkError> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = direct_bases(schema, identity).collect();
    while let Some(base) = stack.pop() {
        if base == identity {
            let node = schema.node(identity);
            return Err(LinkError::CircularReference {
                location: node.location.clone(),
                construct: "base",
                name: node.name.clone(),
            });
        }
        if !seen.insert(base) {
            continue;
        }
        out.push(base);
        stack.extend(direct_bases(schema, base));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::context::NoopObserver;
    use crate::linker::LinkOptions;
    use crate::model::{Location, Owner, ResolutionStatus};

    fn loc() -> Location {
        Location::new("id.yang", 1, 1)
    }

    fn identity(schema: &mut Schema, unit: crate::model::UnitId, name: &str, base: Option<NodeId>) -> NodeId {
        let node = schema.add_node(Owner::Unit(unit), NodeKind::Identity, name, loc());
        if let Some(base) = base {
            let id = schema.add_base(node, "unused", loc());
            let entity = schema.entity_mut(id);
            entity.target = Some(base);
            entity.status = ResolutionStatus::Resolved;
        }
        node
    }

    fn propagate(schema: &mut Schema) -> Result<(), LinkError> {
        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(schema, &options, &mut observer);
        propagate_identities(&mut ctx)
    }

    #[test]
    fn test_transitive_derivation() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let a = identity(&mut schema, m, "crypto", None);
        let b = identity(&mut schema, m, "symmetric", Some(a));
        let c = identity(&mut schema, m, "aes", Some(b));

        propagate(&mut schema).unwrap();
        assert_eq!(schema.node(a).derived_identities, [b, c]);
        assert_eq!(schema.node(b).derived_identities, [c]);
        assert!(schema.node(c).derived_identities.is_empty());
    }

    #[test]
    fn test_base_cycle() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let a = identity(&mut schema, m, "a", None);
        let b = identity(&mut schema, m, "b", Some(a));
        let id = schema.add_base(a, "b", loc());
        schema.entity_mut(id).target = Some(b);

        let err = propagate(&mut schema).unwrap_err();
        assert!(matches!(err, LinkError::CircularReference { construct: "base", .. }));
    }
}
