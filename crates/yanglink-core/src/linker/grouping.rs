//! Grouping instantiation.
//!
//! A `uses` gets a private deep copy of its grouping's children, inserted
//! right after the `uses` node. References inside the copy that depend on
//! where they sit (types, leafrefs, identityrefs, uniques) are registered
//! again with the copy as holder; everything else shares the original
//! entity.

use super::context::LinkContext;
use super::lookup;
use crate::error::LinkError;
use crate::model::{
    CloneMap, Entity, EntityId, EntityKind, Location, NodeId, NodeKind, Owner, QName, Reference,
    Schema, SchemaPath, TypeSpec, UnitId,
};
use alloc::vec::Vec;

/// Prefix rewriting from the grouping's unit to the use site.
struct Rewrite {
    /// Unit whose prefix table the cloned references were written against.
    from: UnitId,
    /// Use site.
    to: UnitId,
}

impl Rewrite {
    fn qname(&self, schema: &Schema, name: &mut QName, location: &Location, construct: &'static str) -> Result<(), LinkError> {
        let module = lookup::module_for_prefix(schema, self.from, name.prefix(), location, construct)?;
        name.prefix = Some(lookup::prefix_for_module(schema, self.to, module, location)?);
        Ok(())
    }

    /// Rewrite written prefixes of a path; unprefixed steps stay as they are.
    /// On error the path is left as written.
    fn path(&self, schema: &Schema, path: &mut SchemaPath, location: &Location, construct: &'static str) -> Result<(), LinkError> {
        let mut rewritten = path.clone();
        let mut result = Ok(());
        rewritten.for_each_prefix_mut(&mut |name| {
            if result.is_ok() && name.prefix.is_some() {
                result = self.qname(schema, name, location, construct);
            }
        });
        result.map(|()| *path = rewritten)
    }

    /// Rewrite every level of `spec`. Returns, outermost first, whether each
    /// level could be spelled at the use site.
    fn type_spec(&self, schema: &Schema, origin: NodeId, spec: &mut TypeSpec, location: &Location) -> Result<Vec<bool>, LinkError> {
        let mut spelled = Vec::new();
        let mut result = Ok(());
        spec.visit_mut(&mut |s| {
            if result.is_err() {
                return;
            }
            let outcome = if let Some(path) = s.path.as_mut() {
                self.path(schema, path, location, "leafref")
            } else if let Some(base) = s.base.as_mut() {
                self.qname(schema, base, location, "identityref")
            } else if s.is_derived() && !self.scoped_typedef(schema, origin, &s.name) {
                self.qname(schema, &mut s.name, location, "type")
            } else {
                Ok(())
            };
            match spellable(outcome) {
                Ok(ok) => spelled.push(ok),
                Err(err) => result = Err(err),
            }
        });
        result.map(|()| spelled)
    }

    /// An unprefixed type naming a typedef nested inside the grouping.
    fn scoped_typedef(&self, schema: &Schema, origin: NodeId, name: &QName) -> bool {
        name.prefix.is_none()
            && lookup::search_scope(schema, origin, NodeKind::Typedef, &name.name)
                .is_some_and(|def| lookup::is_scoped(schema, def))
    }
}

/// `Ok(false)` when the use site does not import the module a name refers to.
/// Such a name keeps its written prefix and resolves against the grouping's unit.
fn spellable(outcome: Result<(), LinkError>) -> Result<bool, LinkError> {
    match outcome {
        Ok(()) => Ok(true),
        Err(LinkError::NotImported { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}

/// Instantiate `grouping` at `uses`. Returns the clone roots.
pub(crate) fn instantiate(
    ctx: &mut LinkContext<'_>,
    uses: NodeId,
    grouping: NodeId,
) -> Result<Vec<NodeId>, LinkError> {
    let site = ctx.schema.node(uses).unit;
    let from = ctx.schema.node(grouping).unit;
    let rewrite = (ctx.schema.module_of(from) != ctx.schema.module_of(site)).then_some(Rewrite { from, to: site });

    let roots: Vec<NodeId> = ctx
        .schema
        .children(Owner::Node(grouping))
        .filter(|&c| instantiable(ctx.schema.node(c).kind))
        .collect();

    let mut anchor = uses;
    let mut instances = Vec::with_capacity(roots.len());
    let mut map = CloneMap::new();
    for root in roots {
        let (copy, part) = ctx
            .schema
            .deep_clone(root, site, &|n| !instantiable(n.kind));
        ctx.schema.insert_after(anchor, copy);
        anchor = copy;
        instances.push(copy);
        map.extend(part);
    }

    for (&original, &copy) in &map {
        reregister(ctx.schema, original, copy, site, rewrite.as_ref())?;
    }

    ctx.schema.node_mut(uses).instances = instances.clone();
    ctx.summary.groupings_instantiated += 1;
    ctx.observer
        .grouping_instantiated(&ctx.schema.node(grouping).name, uses, instances.len());
    Ok(instances)
}

/// Nested `uses` already have their expansion beside them; definitions are
/// never instantiated.
fn instantiable(kind: NodeKind) -> bool {
    kind != NodeKind::Uses && !kind.is_template()
}

/// Give a clone its own copies of the references that depend on position.
fn reregister(
    schema: &mut Schema,
    original: NodeId,
    copy: NodeId,
    site: UnitId,
    rewrite: Option<&Rewrite>,
) -> Result<(), LinkError> {
    if let Some(mut spec) = schema.node(copy).type_spec.clone() {
        let location = schema.node(copy).location.clone();
        spec.visit_mut(&mut |s| {
            s.entity = None;
            s.effective = None;
        });
        let spelled = match rewrite {
            Some(rewrite) => rewrite.type_spec(schema, original, &mut spec, &location)?,
            None => Vec::new(),
        };
        let mut created = Vec::new();
        schema.register_type_entities(&mut spec, copy, site, &location, &mut created);
        if let Some(rewrite) = rewrite {
            let mut levels = spelled.into_iter();
            let mut foreign = Vec::new();
            spec.visit_mut(&mut |s| {
                if levels.next() == Some(false) {
                    foreign.extend(s.entity);
                }
            });
            for id in foreign {
                schema.entity_mut(id).context = rewrite.from;
            }
        }
        schema.node_mut(copy).type_spec = Some(spec);
    }

    let held = schema.node(copy).entities.clone();
    let mut entities = Vec::with_capacity(held.len());
    for id in held {
        let entity = schema.entity(id);
        if entity.kind != EntityKind::Unique {
            entities.push(id);
            continue;
        }
        let location = entity.location.clone();
        let mut reference = entity.reference.clone();
        let mut context = site;
        if let (Some(rewrite), Reference::Paths(paths)) = (rewrite, &mut reference) {
            let mut rewritten = paths.clone();
            let mut all = true;
            for path in rewritten.iter_mut() {
                if !spellable(rewrite.path(schema, path, &location, "unique"))? {
                    all = false;
                    break;
                }
            }
            if all {
                *paths = rewritten;
            } else {
                context = rewrite.from;
            }
        }
        let fresh = schema.register_pending(Entity::new(EntityKind::Unique, reference, copy, context, location));
        entities.push(fresh);
    }
    schema.node_mut(copy).entities = entities;
    Ok(())
}

/// Entities a freshly linked grouping still needs before it can be cloned:
/// uses-augments first, then the `uses` they hang off, so the `uses` pop first.
#[must_use]
pub(crate) fn pending_inside(schema: &Schema, grouping: NodeId) -> Vec<EntityId> {
    let mut augments = Vec::new();
    let mut uses = Vec::new();
    let mut stack = alloc::vec![grouping];
    while let Some(node) = stack.pop() {
        for &id in &schema.node(node).entities {
            let entity = schema.entity(id);
            if entity.status.is_final() {
                continue;
            }
            match entity.kind {
                EntityKind::Uses => uses.push(id),
                EntityKind::UsesAugment => augments.push(id),
                _ => {}
            }
        }
        stack.extend(schema.children(Owner::Node(node)));
    }
    augments.extend(uses);
    augments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::context::NoopObserver;
    use crate::linker::LinkOptions;
    use crate::model::{Import, ResolutionStatus};

    fn loc() -> Location {
        Location::new("g.yang", 1, 1)
    }

    #[test]
    fn test_clones_follow_uses_in_order() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let g = schema.add_node(Owner::Unit(m), NodeKind::Grouping, "g", loc());
        schema.add_node(Owner::Node(g), NodeKind::Typedef, "local", loc());
        schema.add_node(Owner::Node(g), NodeKind::Leaf, "a", loc());
        schema.add_node(Owner::Node(g), NodeKind::Leaf, "b", loc());
        let c = schema.add_node(Owner::Unit(m), NodeKind::Container, "c", loc());
        let uses = schema.add_uses(Owner::Node(c), "g", loc());
        schema.add_node(Owner::Node(c), NodeKind::Leaf, "z", loc());

        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(&mut schema, &options, &mut observer);
        let roots = instantiate(&mut ctx, uses, g).unwrap();
        assert_eq!(ctx.summary.groupings_instantiated, 1);

        let names: Vec<_> = schema
            .children(Owner::Node(c))
            .map(|n| schema.node(n).name.as_str())
            .collect();
        assert_eq!(names, ["g", "a", "b", "z"]);
        assert_eq!(schema.node(uses).instances, roots);
        for root in roots {
            assert_eq!(schema.node(root).parent(), Some(c));
            assert_eq!(schema.node(root).unit, m);
        }
    }

    #[test]
    fn test_cross_module_types_are_rewritten_and_reregistered() {
        let mut schema = Schema::new();
        let g = schema.add_module("g", "urn:g", "g", "g.yang");
        let t = schema.add_module("t", "urn:t", "t", "t.yang");
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let mut import = Import::new("t", "gt", loc());
        import.target = Some(t);
        schema.add_import(g, import);
        let mut import = Import::new("g", "g", loc());
        import.target = Some(g);
        schema.add_import(m, import);
        let mut import = Import::new("t", "mt", loc());
        import.target = Some(t);
        schema.add_import(m, import);

        let grp = schema.add_node(Owner::Unit(g), NodeKind::Grouping, "grp", loc());
        let inner = schema.add_node(Owner::Node(grp), NodeKind::Typedef, "inner", loc());
        schema.set_type(inner, TypeSpec::named("string"));
        let a = schema.add_node(Owner::Node(grp), NodeKind::Leaf, "a", loc());
        let original = schema.set_type(a, TypeSpec::named("gt:addr"))[0];
        let b = schema.add_node(Owner::Node(grp), NodeKind::Leaf, "b", loc());
        schema.set_type(b, TypeSpec::named("inner"));
        let c2 = schema.add_node(Owner::Node(grp), NodeKind::Leaf, "c", loc());
        schema.set_type(c2, TypeSpec::named("g-local"));

        let c = schema.add_node(Owner::Unit(m), NodeKind::Container, "c", loc());
        let uses = schema.add_uses(Owner::Node(c), "g:grp", loc());

        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(&mut schema, &options, &mut observer);
        let roots = instantiate(&mut ctx, uses, grp).unwrap();

        let clone_a = schema.node(roots[0]).type_spec.clone().unwrap();
        assert_eq!(clone_a.name, QName::new(Some("mt"), "addr"));
        let fresh = clone_a.entity.unwrap();
        assert_ne!(fresh, original);
        let entity = schema.entity(fresh);
        assert_eq!(entity.holder, roots[0]);
        assert_eq!(entity.context, m);
        assert_eq!(entity.status, ResolutionStatus::Unresolved);
        assert!(schema.unit(m).pending(EntityKind::DerivedType).contains(&fresh));

        // Scoped typedef keeps its bare name; a top-level one gets the site's prefix.
        let clone_b = schema.node(roots[1]).type_spec.as_ref().unwrap();
        assert_eq!(clone_b.name, QName::local("inner"));
        let clone_c = schema.node(roots[2]).type_spec.as_ref().unwrap();
        assert_eq!(clone_c.name, QName::new(Some("g"), "g-local"));
    }

    #[test]
    fn test_name_unknown_at_site_keeps_grouping_prefix() {
        let mut schema = Schema::new();
        let g = schema.add_module("g", "urn:g", "g", "g.yang");
        let t = schema.add_module("t", "urn:t", "t", "t.yang");
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let mut import = Import::new("t", "t", loc());
        import.target = Some(t);
        schema.add_import(g, import);
        let mut import = Import::new("g", "g", loc());
        import.target = Some(g);
        schema.add_import(m, import);
        let grp = schema.add_node(Owner::Unit(g), NodeKind::Grouping, "grp", loc());
        let a = schema.add_node(Owner::Node(grp), NodeKind::Leaf, "a", loc());
        schema.set_type(a, TypeSpec::named("t:addr"));
        let b = schema.add_node(Owner::Node(grp), NodeKind::Leaf, "b", loc());
        schema.set_type(b, TypeSpec::union(alloc::vec![TypeSpec::named("t:addr"), TypeSpec::named("g-local")]));
        let uses = schema.add_uses(Owner::Unit(m), "g:grp", loc());

        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(&mut schema, &options, &mut observer);
        let roots = instantiate(&mut ctx, uses, grp).unwrap();

        // m has no import for t: the name stays as written and reads through g.
        let clone_a = schema.node(roots[0]).type_spec.clone().unwrap();
        assert_eq!(clone_a.name, QName::new(Some("t"), "addr"));
        let entity = schema.entity(clone_a.entity.unwrap());
        assert_eq!(entity.context, g);
        assert_eq!(entity.holder, roots[0]);
        assert!(schema.unit(m).pending(EntityKind::DerivedType).contains(&clone_a.entity.unwrap()));

        // Within one union, each member is spelled independently.
        let clone_b = schema.node(roots[1]).type_spec.clone().unwrap();
        assert_eq!(schema.entity(clone_b.entity.unwrap()).context, m);
        let foreign = &clone_b.members[0];
        assert_eq!(foreign.name, QName::new(Some("t"), "addr"));
        assert_eq!(schema.entity(foreign.entity.unwrap()).context, g);
        let local = &clone_b.members[1];
        assert_eq!(local.name, QName::new(Some("g"), "g-local"));
        assert_eq!(schema.entity(local.entity.unwrap()).context, m);
    }
}
