//! Resolution engine.
//!
//! Resolves one pending entity, and everything it turns out to depend on,
//! with an explicit stack of [`ResolutionRecord`]s:
//!
//! ```text
//! Unresolved ──scope hit──▶ Linked ──────────┐
//!     │                                       ├──complete──▶ Resolved
//!     └──miss──▶ IntraFileResolved ──hit──▶ InterFileLinked
//!                         └──miss (if-feature)──▶ Undefined
//! ```
//!
//! Binding a definition pushes the definition's own pending references, so
//! they complete before the entity that needed them. Pushing an entity that
//! is already on the stack means the references form a cycle.

use super::context::LinkContext;
use super::{collision, deviation, grouping, lookup, path};
use crate::error::LinkError;
use crate::model::{
    validate_qname, BuiltinType, Entity, EntityId, EntityKind, NodeId, NodeKind, Reference,
    ResolutionRecord, ResolutionStatus, Schema, TypeSpec,
};
use alloc::collections::BTreeSet;
use alloc::vec::Vec;

/// Resolve `seed` and every entity it depends on.
pub(crate) fn resolve(ctx: &mut LinkContext<'_>, seed: EntityId) -> Result<(), LinkError> {
    let mut engine = Engine {
        stack: Vec::new(),
        on_stack: BTreeSet::new(),
    };
    engine.push(ctx, seed)?;

    while let Some(&record) = engine.stack.last() {
        let status = ctx.schema.entity(record.entity).status;
        let discovered = match status {
            ResolutionStatus::Resolved | ResolutionStatus::Undefined => {
                engine.pop();
                Vec::new()
            }
            ResolutionStatus::Linked | ResolutionStatus::InterFileLinked => {
                engine.pop();
                complete(ctx, record)?;
                ctx.summary.entities_resolved += 1;
                ctx.set_status(record.entity, ResolutionStatus::Resolved);
                Vec::new()
            }
            ResolutionStatus::Unresolved => link_local(ctx, record)?,
            ResolutionStatus::IntraFileResolved => link_external(ctx, record)?,
            ResolutionStatus::Invalid => {
                let entity = ctx.schema.entity(record.entity);
                return Err(LinkError::InvalidState {
                    location: entity.location.clone(),
                    construct: entity.kind.construct(),
                    status,
                });
            }
        };
        for id in discovered {
            engine.push(ctx, id)?;
        }
    }
    Ok(())
}

struct Engine {
    stack: Vec<ResolutionRecord>,
    on_stack: BTreeSet<EntityId>,
}

impl Engine {
    fn push(&mut self, ctx: &LinkContext<'_>, id: EntityId) -> Result<(), LinkError> {
        let entity = ctx.schema.entity(id);
        if self.on_stack.contains(&id) {
            return Err(LinkError::CircularReference {
                location: entity.location.clone(),
                construct: entity.kind.construct(),
                name: entity.describe(),
            });
        }
        if self.stack.len() >= ctx.options.max_stack_depth {
            return Err(LinkError::StackOverflow {
                location: entity.location.clone(),
                limit: ctx.options.max_stack_depth,
            });
        }
        self.stack.push(ResolutionRecord {
            entity: id,
            holder: entity.holder,
        });
        self.on_stack.insert(id);
        Ok(())
    }

    fn pop(&mut self) {
        if let Some(record) = self.stack.pop() {
            self.on_stack.remove(&record.entity);
        }
    }
}

/// `Linked` when the target sits in the holder's module, `InterFileLinked` otherwise.
fn linked_status(schema: &Schema, holder: NodeId, target: NodeId) -> ResolutionStatus {
    let holder_module = schema.module_of(schema.node(holder).unit);
    if schema.module_of(schema.node(target).unit) == holder_module {
        ResolutionStatus::Linked
    } else {
        ResolutionStatus::InterFileLinked
    }
}

fn bind(ctx: &mut LinkContext<'_>, id: EntityId, target: NodeId, status: ResolutionStatus) {
    ctx.schema.entity_mut(id).target = Some(target);
    ctx.set_status(id, status);
}

/// Same-file step: scope search for names, path resolution for paths.
fn link_local(ctx: &mut LinkContext<'_>, record: ResolutionRecord) -> Result<Vec<EntityId>, LinkError> {
    let id = record.entity;
    let entity = ctx.schema.entity(id).clone();
    let holder = record.holder;

    if let Some(kind) = lookup::definition_kind(entity.kind) {
        let name = named(&entity)?;
        validate_qname(name, &entity.location)?;
        let module = lookup::module_for_prefix(
            ctx.schema,
            entity.context,
            name.prefix(),
            &entity.location,
            entity.kind.construct(),
        )?;
        if module == ctx.schema.module_of(ctx.schema.node(holder).unit) {
            if let Some(definition) = lookup::search_scope(ctx.schema, holder, kind, &name.name) {
                bind(ctx, id, definition, ResolutionStatus::Linked);
                return Ok(discover(ctx.schema, definition));
            }
        }
        ctx.set_status(id, ResolutionStatus::IntraFileResolved);
        return Ok(Vec::new());
    }

    match entity.kind {
        EntityKind::Union => {
            ctx.set_status(id, ResolutionStatus::Linked);
            Ok(union_members(ctx.schema, holder, id))
        }
        EntityKind::Leafref | EntityKind::Unique if ctx.schema.in_template(holder) => {
            // Each instantiation registers its own copy.
            ctx.set_status(id, ResolutionStatus::Resolved);
            Ok(Vec::new())
        }
        EntityKind::Leafref => {
            let target = path::resolve_leafref(ctx, id)?;
            let status = linked_status(ctx.schema, holder, target);
            bind(ctx, id, target, status);
            Ok(Vec::new())
        }
        EntityKind::Unique => {
            let targets = path::resolve_unique(ctx, id)?;
            ctx.schema.entity_mut(id).targets = targets;
            ctx.set_status(id, ResolutionStatus::Linked);
            Ok(Vec::new())
        }
        EntityKind::UsesAugment => {
            // The uses must be instantiated before its augment has anything to land on.
            if let Some(uses) = owning_uses(ctx.schema, holder) {
                if !ctx.schema.entity(uses).status.is_final() {
                    return Ok(alloc::vec![uses]);
                }
            }
            let target = path::resolve_schema_target(ctx, id)?;
            bind(ctx, id, target, ResolutionStatus::Linked);
            Ok(Vec::new())
        }
        EntityKind::Augment | EntityKind::Deviation | EntityKind::CompilerAnnotation => {
            let target = path::resolve_schema_target(ctx, id)?;
            let status = linked_status(ctx.schema, holder, target);
            bind(ctx, id, target, status);
            Ok(Vec::new())
        }
        _ => Err(LinkError::InvalidState {
            location: entity.location.clone(),
            construct: entity.kind.construct(),
            status: entity.status,
        }),
    }
}

/// Cross-file step: search the module the prefix names, with its submodules.
fn link_external(ctx: &mut LinkContext<'_>, record: ResolutionRecord) -> Result<Vec<EntityId>, LinkError> {
    let id = record.entity;
    let entity = ctx.schema.entity(id).clone();
    let construct = entity.kind.construct();
    let Some(kind) = lookup::definition_kind(entity.kind) else {
        return Err(LinkError::InvalidState {
            location: entity.location.clone(),
            construct,
            status: entity.status,
        });
    };
    let name = named(&entity)?;
    let module =
        lookup::module_for_prefix(ctx.schema, entity.context, name.prefix(), &entity.location, construct)?;
    let units = lookup::module_units(ctx.schema, module);

    if let Some(definition) = lookup::search_roots(ctx.schema, &units, kind, &name.name) {
        bind(ctx, id, definition, ResolutionStatus::InterFileLinked);
        return Ok(discover(ctx.schema, definition));
    }

    if entity.kind == EntityKind::IfFeature && !ctx.options.strict_features {
        ctx.set_status(id, ResolutionStatus::Undefined);
        ctx.summary.undefined_features += 1;
        ctx.observer.feature_undefined(&entity.describe(), &entity.location);
        return Ok(Vec::new());
    }
    Err(LinkError::Unresolved {
        location: entity.location.clone(),
        construct,
        name: entity.describe(),
    })
}

fn named(entity: &Entity) -> Result<&crate::model::QName, LinkError> {
    entity.name().ok_or_else(|| {
        LinkError::data_model(
            &entity.location,
            alloc::format!("{} reference is not a name", entity.kind.construct()),
        )
    })
}

/// Pending references a definition carries itself.
fn discover(schema: &Schema, definition: NodeId) -> Vec<EntityId> {
    let node = schema.node(definition);
    let found = match node.kind {
        NodeKind::Typedef => node
            .type_spec
            .as_ref()
            .map(|spec| spec.entities())
            .unwrap_or_default(),
        NodeKind::Grouping => grouping::pending_inside(schema, definition),
        NodeKind::Feature => held(schema, definition, EntityKind::IfFeature),
        NodeKind::Identity => held(schema, definition, EntityKind::Base),
        _ => Vec::new(),
    };
    found
        .into_iter()
        .filter(|&id| !schema.entity(id).status.is_final())
        .collect()
}

fn held(schema: &Schema, node: NodeId, kind: EntityKind) -> Vec<EntityId> {
    schema
        .node(node)
        .entities
        .iter()
        .copied()
        .filter(|&id| schema.entity(id).kind == kind)
        .collect()
}

fn union_members(schema: &Schema, holder: NodeId, union: EntityId) -> Vec<EntityId> {
    let Some(spec) = schema.node(holder).type_spec.as_ref().and_then(|s| s.find(union)) else {
        return Vec::new();
    };
    spec.members
        .iter()
        .flat_map(TypeSpec::entities)
        .filter(|&id| !schema.entity(id).status.is_final())
        .collect()
}

/// The `uses` entity an augment node hangs off.
fn owning_uses(schema: &Schema, augment: NodeId) -> Option<EntityId> {
    let uses = schema.node(augment).parent()?;
    held(schema, uses, EntityKind::Uses).first().copied()
}

/// Completion step of a linked entity.
fn complete(ctx: &mut LinkContext<'_>, record: ResolutionRecord) -> Result<(), LinkError> {
    let entity = ctx.schema.entity(record.entity);
    let kind = entity.kind;
    let Some(target) = entity.target else {
        return Ok(());
    };
    match kind {
        EntityKind::DerivedType => requeue_through_typedefs(ctx, record),
        EntityKind::Uses => grouping::instantiate(ctx, record.holder, target).map(|_| ()),
        EntityKind::Augment => collision::apply_augment(ctx, record.holder, target),
        EntityKind::UsesAugment => collision::apply_uses_augment(ctx, record.holder, target),
        EntityKind::Deviation => deviation::apply(ctx, record.holder, target),
        EntityKind::CompilerAnnotation => {
            deviation::record_link(ctx.schema, target, record.holder, |n| &mut n.annotations);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Follow a resolved typedef chain; a leafref or identityref at its end is
/// registered again at the holder, read with the typedef's prefixes.
fn requeue_through_typedefs(ctx: &mut LinkContext<'_>, record: ResolutionRecord) -> Result<(), LinkError> {
    let holder = record.holder;
    // Instantiations re-queue for themselves.
    if ctx.schema.in_template(holder) {
        return Ok(());
    }
    let already = ctx
        .schema
        .node(holder)
        .type_spec
        .as_ref()
        .and_then(|s| s.find(record.entity))
        .is_some_and(|spec| spec.effective.is_some());
    if already {
        return Ok(());
    }

    let mut typedef = ctx.schema.entity(record.entity).target;
    for _ in 0..=ctx.schema.node_count() {
        let Some(def) = typedef else { return Ok(()) };
        let Some(spec) = ctx.schema.node(def).type_spec.as_ref() else {
            return Ok(());
        };
        let reference = match spec.builtin {
            Some(BuiltinType::Leafref) => spec.path.clone().map(Reference::Path),
            Some(BuiltinType::IdentityRef) => spec.base.clone().map(Reference::Name),
            Some(_) => return Ok(()),
            None => {
                typedef = spec.entity.and_then(|e| ctx.schema.entity(e).target);
                continue;
            }
        };
        let Some(reference) = reference else { return Ok(()) };
        let kind = if spec.builtin == Some(BuiltinType::Leafref) {
            EntityKind::Leafref
        } else {
            EntityKind::IdentityRef
        };
        let location = spec
            .entity
            .map(|e| ctx.schema.entity(e).location.clone())
            .unwrap_or_else(|| ctx.schema.node(def).location.clone());
        let context = ctx.schema.node(def).unit;
        let fresh = ctx
            .schema
            .register_pending(Entity::new(kind, reference, holder, context, location));
        if let Some(spec) = ctx
            .schema
            .node_mut(holder)
            .type_spec
            .as_mut()
            .and_then(|s| s.find_mut(record.entity))
        {
            spec.effective = Some(fresh);
        }
        return Ok(());
    }
    Ok(())
}
