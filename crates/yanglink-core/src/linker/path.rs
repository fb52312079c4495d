//! Path resolver.
//!
//! Resolves schema node identifiers (augment, uses-augment, deviation and
//! annotation targets) and data paths (leafref, unique) over the arena.
//! Every step's prefix is mapped to a module first; the walk then explores
//! candidate children with an explicit backtracking stack, so an augment
//! branch that dead-ends falls back to the next candidate.
//!
//! In data mode choice and case nodes are transparent, and a relative path
//! is rewritten to an absolute one by prepending the names of the nodes
//! its `..` hops land on.

use super::context::{LinkContext, LinkObserver};
use super::lookup;
use crate::error::LinkError;
use crate::model::{
    EntityId, EntityKind, Location, NodeId, NodeKind, Owner, QName, Reference, Schema, SchemaPath,
    UnitId,
};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// How a step's module relates to the previous step's and the root's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixTransition {
    /// Same module as the previous step, which is the root's.
    NoChangeIntra,
    /// Same module as the previous step, which is not the root's.
    NoChangeInter,
    /// From the root's module into another one.
    IntraToInter,
    /// From another module back into the root's.
    InterToIntra,
    /// Between two modules, neither the root's.
    InterToInter,
}

impl PrefixTransition {
    /// Classify a step by module.
    #[must_use]
    pub fn classify(previous: UnitId, current: UnitId, root: UnitId) -> Self {
        if previous == current {
            if current == root {
                Self::NoChangeIntra
            } else {
                Self::NoChangeInter
            }
        } else if previous == root {
            Self::IntraToInter
        } else if current == root {
            Self::InterToIntra
        } else {
            Self::InterToInter
        }
    }

    /// Whether the step enters a different module.
    #[must_use]
    pub fn changes_module(self) -> bool {
        !matches!(self, Self::NoChangeIntra | Self::NoChangeInter)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PathMode {
    /// Every schema node is a step; choice and case included.
    Schema,
    /// Choice and case are skipped.
    Data,
}

enum Start {
    /// Roots of a module and its submodules.
    Root(UnitId),
    /// Children of a node.
    Under(NodeId),
    /// An explicit candidate set (clone roots of a `uses`).
    Among(Vec<NodeId>),
}

/// A path step with its prefix mapped to a module.
#[derive(Debug)]
struct ResolvedStep {
    module: UnitId,
    name: String,
    /// Index of the source step, `None` for steps prepended from `..` hops.
    source: Option<usize>,
}

fn map_steps(
    schema: &Schema,
    context: UnitId,
    path: &SchemaPath,
    location: &Location,
    construct: &'static str,
) -> Result<Vec<ResolvedStep>, LinkError> {
    path.steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let module =
                lookup::module_for_prefix(schema, context, step.name.prefix(), location, construct)?;
            Ok(ResolvedStep {
                module,
                name: step.name.name.clone(),
                source: Some(index),
            })
        })
        .collect()
}

/// Candidate children of a set of owners: natural ones, then augment-contributed.
fn pool(schema: &Schema, owners: Vec<Owner>, mode: PathMode) -> (Vec<NodeId>, Vec<NodeId>) {
    let mut natural = Vec::new();
    let mut augmented = Vec::new();
    let mut work: Vec<(Owner, bool)> = owners.into_iter().map(|o| (o, false)).collect();
    let mut next = 0;
    while let Some(&(owner, via_augment)) = work.get(next) {
        next += 1;
        let mut sources = alloc::vec![(owner, via_augment)];
        if let Owner::Node(node) = owner {
            sources.extend(schema.node(node).augments.iter().map(|&a| (Owner::Node(a), true)));
        }
        for (source, via) in sources {
            for child in schema.children(source) {
                if mode == PathMode::Data && schema.node(child).kind.is_data_transparent() {
                    work.push((Owner::Node(child), via));
                } else if via {
                    augmented.push(child);
                } else {
                    natural.push(child);
                }
            }
        }
    }
    (natural, augmented)
}

fn candidates(
    schema: &Schema,
    (natural, augmented): (Vec<NodeId>, Vec<NodeId>),
    step: &ResolvedStep,
    transition: PrefixTransition,
) -> Vec<NodeId> {
    let (first, second) = if transition.changes_module() {
        (augmented, natural)
    } else {
        (natural, augmented)
    };
    first
        .into_iter()
        .chain(second)
        .filter(|&c| {
            let node = schema.node(c);
            node.matches_step(&step.name) && schema.module_of(node.unit) == step.module
        })
        .collect()
}

/// Walk `steps` from `start`; returns the node matched at each step.
fn walk(
    schema: &Schema,
    observer: &mut dyn LinkObserver,
    start: Start,
    steps: &[ResolvedStep],
    root: UnitId,
    mode: PathMode,
) -> Option<Vec<NodeId>> {
    let first = steps.first()?;
    let initial = match start {
        Start::Root(module) => {
            let owners = lookup::module_units(schema, module)
                .into_iter()
                .map(Owner::Unit)
                .collect();
            pool(schema, owners, mode)
        }
        Start::Under(node) => pool(schema, alloc::vec![Owner::Node(node)], mode),
        Start::Among(nodes) => (nodes, Vec::new()),
    };

    // Frames are (node, step index, parent frame); the stack holds frame indices.
    let mut frames: Vec<(NodeId, usize, Option<usize>)> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    let transition = PrefixTransition::classify(root, first.module, root);
    let found = candidates(schema, initial, first, transition);
    observer.path_step(&first.name, transition, found.len());
    for node in found.into_iter().rev() {
        frames.push((node, 0, None));
        stack.push(frames.len() - 1);
    }

    while let Some(index) = stack.pop() {
        let (node, depth, _) = frames[index];
        let Some(step) = steps.get(depth + 1) else {
            return Some(chain(&frames, index));
        };
        let transition = PrefixTransition::classify(steps[depth].module, step.module, root);
        let found = candidates(
            schema,
            pool(schema, alloc::vec![Owner::Node(node)], mode),
            step,
            transition,
        );
        observer.path_step(&step.name, transition, found.len());
        for next in found.into_iter().rev() {
            frames.push((next, depth + 1, Some(index)));
            stack.push(frames.len() - 1);
        }
    }
    None
}

fn chain(frames: &[(NodeId, usize, Option<usize>)], mut index: usize) -> Vec<NodeId> {
    let mut out = Vec::new();
    loop {
        let (node, _, parent) = frames[index];
        out.push(node);
        match parent {
            Some(p) => index = p,
            None => break,
        }
    }
    out.reverse();
    out
}

/// Nearest ancestor that holds data, `None` at the unit root.
///
/// Choice and case are skipped; an augment stands for the node it was
/// applied to.
pub(crate) fn data_parent(
    schema: &Schema,
    node: NodeId,
    location: &Location,
) -> Result<Option<NodeId>, LinkError> {
    let mut current = schema.node(node).parent();
    while let Some(id) = current {
        let n = schema.node(id);
        current = match n.kind {
            NodeKind::Choice | NodeKind::Case | NodeKind::Uses => n.parent(),
            NodeKind::Augment => Some(n.augment_target.ok_or_else(|| {
                LinkError::data_model(location, alloc::format!("augment \"{}\" is not applied yet", n.name))
            })?),
            _ => return Ok(Some(id)),
        };
    }
    Ok(None)
}

/// Step name that addresses `node` (input and output by keyword).
fn step_name(schema: &Schema, node: NodeId) -> String {
    let n = schema.node(node);
    match n.kind {
        NodeKind::Input | NodeKind::Output => String::from(n.kind.keyword()),
        _ => n.name.clone(),
    }
}

/// Steps of `path` as seen from `holder`, made absolute.
///
/// Unprefixed steps of a relative path stay in the module of the step
/// before them.
fn absolute_steps(
    schema: &Schema,
    holder: NodeId,
    context: UnitId,
    path: &SchemaPath,
    location: &Location,
    construct: &'static str,
) -> Result<Vec<ResolvedStep>, LinkError> {
    let mut steps = map_steps(schema, context, path, location, construct)?;
    if path.absolute {
        return Ok(steps);
    }

    let mut anchor = Some(holder);
    for _ in 0..path.ancestors {
        let Some(node) = anchor else {
            return Err(LinkError::invalid_path(
                location,
                construct,
                path.to_string(),
                "\"..\" climbs above the module root",
            ));
        };
        anchor = data_parent(schema, node, location)?;
    }

    let mut lineage = Vec::new();
    let mut current = anchor;
    while let Some(node) = current {
        lineage.push(node);
        current = data_parent(schema, node, location)?;
    }
    let mut out: Vec<ResolvedStep> = lineage
        .into_iter()
        .rev()
        .map(|node| ResolvedStep {
            module: schema.module_of(schema.node(node).unit),
            name: step_name(schema, node),
            source: None,
        })
        .collect();

    for (step, source) in steps.iter_mut().zip(&path.steps) {
        if source.name.prefix.is_none() {
            if let Some(previous) = out.last() {
                step.module = previous.module;
            }
        }
        out.push(ResolvedStep {
            module: step.module,
            name: core::mem::take(&mut step.name),
            source: step.source,
        });
    }
    Ok(out)
}

fn no_match(location: &Location, construct: &'static str, path: &SchemaPath) -> LinkError {
    LinkError::invalid_path(location, construct, path.to_string(), "no schema node matches")
}

fn require_leaf(schema: &Schema, node: NodeId, location: &Location, path: &SchemaPath) -> Result<(), LinkError> {
    let kind = schema.node(node).kind;
    if kind.is_leaf_like() {
        Ok(())
    } else {
        Err(LinkError::InvalidLeafrefTarget {
            location: location.clone(),
            path: path.to_string(),
            found: kind.keyword(),
        })
    }
}

/// Resolve the target of an augment, uses-augment, deviation or compiler
/// annotation.
pub(crate) fn resolve_schema_target(ctx: &mut LinkContext<'_>, id: EntityId) -> Result<NodeId, LinkError> {
    let entity = ctx.schema.entity(id);
    let kind = entity.kind;
    let construct = kind.construct();
    let holder = entity.holder;
    let context = entity.context;
    let location = entity.location.clone();
    let path = entity
        .path()
        .cloned()
        .ok_or_else(|| LinkError::data_model(&location, alloc::format!("{construct} has no path")))?;

    let steps = map_steps(ctx.schema, context, &path, &location, construct)?;
    let root = ctx.schema.module_of(context);
    let start = if kind == EntityKind::UsesAugment {
        if path.absolute || path.ancestors > 0 {
            return Err(LinkError::invalid_path(
                &location,
                construct,
                path.to_string(),
                "must be a descendant schema node identifier",
            ));
        }
        let uses = ctx
            .schema
            .node(holder)
            .parent()
            .ok_or_else(|| LinkError::data_model(&location, "augment is not inside a uses"))?;
        Start::Among(ctx.schema.node(uses).instances.clone())
    } else {
        if !path.absolute {
            return Err(LinkError::invalid_path(
                &location,
                construct,
                path.to_string(),
                "must be an absolute schema node identifier",
            ));
        }
        let first = steps.first().ok_or_else(|| no_match(&location, construct, &path))?;
        Start::Root(first.module)
    };

    walk(ctx.schema, ctx.observer, start, &steps, root, PathMode::Schema)
        .and_then(|chain| chain.last().copied())
        .ok_or_else(|| no_match(&location, construct, &path))
}

/// Resolve a leafref path and its predicates.
///
/// The resolved predicate axes are written back to the entity and to the
/// holder's type.
pub(crate) fn resolve_leafref(ctx: &mut LinkContext<'_>, id: EntityId) -> Result<NodeId, LinkError> {
    let entity = ctx.schema.entity(id);
    let holder = entity.holder;
    let context = entity.context;
    let location = entity.location.clone();
    let mut path = entity
        .path()
        .cloned()
        .ok_or_else(|| LinkError::data_model(&location, "leafref has no path"))?;

    let steps = absolute_steps(ctx.schema, holder, context, &path, &location, "leafref")?;
    let first = steps.first().ok_or_else(|| no_match(&location, "leafref", &path))?;
    let root = ctx.schema.module_of(context);
    let chain = walk(
        ctx.schema,
        ctx.observer,
        Start::Root(first.module),
        &steps,
        root,
        PathMode::Data,
    )
    .ok_or_else(|| no_match(&location, "leafref", &path))?;
    let target = *chain.last().ok_or_else(|| no_match(&location, "leafref", &path))?;
    require_leaf(ctx.schema, target, &location, &path)?;

    for (step, &at) in steps.iter().zip(&chain) {
        let Some(index) = step.source else { continue };
        if path.steps[index].predicates.is_empty() {
            continue;
        }
        if ctx.schema.node(at).kind != NodeKind::List {
            return Err(LinkError::PredicateNotList {
                location: location.clone(),
                step: path.steps[index].name.to_string(),
            });
        }
        for p in 0..path.steps[index].predicates.len() {
            let key = path.steps[index].predicates[p].key.clone();
            let left = key_leaf(ctx.schema, at, &key).ok_or_else(|| {
                LinkError::invalid_path(
                    &location,
                    "leafref",
                    path.to_string(),
                    alloc::format!("\"{key}\" is not a key leaf of \"{}\"", ctx.schema.node(at).name),
                )
            })?;
            let right_path = path.steps[index].predicates[p].right.clone();
            let right = resolve_from_current(ctx, holder, context, &right_path, &location)?;
            let predicate = &mut path.steps[index].predicates[p];
            predicate.left_axis = Some(left);
            predicate.right_axis = Some(right);
        }
    }

    if let Some(spec) = ctx
        .schema
        .node_mut(holder)
        .type_spec
        .as_mut()
        .and_then(|s| s.find_mut(id))
    {
        if spec.path.is_some() {
            spec.path = Some(path.clone());
        }
    }
    ctx.schema.entity_mut(id).reference = Reference::Path(path);
    Ok(target)
}

/// Key leaf named `key` inside `list`. `None` unless `key` is one of the
/// list's keys.
fn key_leaf(schema: &Schema, list: NodeId, key: &QName) -> Option<NodeId> {
    if !schema.node(list).keys.contains(&key.name) {
        return None;
    }
    let (natural, augmented) = pool(schema, alloc::vec![Owner::Node(list)], PathMode::Data);
    natural.into_iter().chain(augmented).find(|&c| {
        let node = schema.node(c);
        node.kind.is_leaf_like() && node.name == key.name
    })
}

/// Resolve the relative path after `current()`, which is the leafref holder.
fn resolve_from_current(
    ctx: &mut LinkContext<'_>,
    holder: NodeId,
    context: UnitId,
    path: &SchemaPath,
    location: &Location,
) -> Result<NodeId, LinkError> {
    let steps = absolute_steps(ctx.schema, holder, context, path, location, "leafref")?;
    let first = steps.first().ok_or_else(|| no_match(location, "leafref", path))?;
    let root = ctx.schema.module_of(context);
    let target = walk(
        ctx.schema,
        ctx.observer,
        Start::Root(first.module),
        &steps,
        root,
        PathMode::Data,
    )
    .and_then(|chain| chain.last().copied())
    .ok_or_else(|| no_match(location, "leafref", path))?;
    require_leaf(ctx.schema, target, location, path)?;
    Ok(target)
}

/// Resolve the descendant paths of a `unique` statement to leaves.
pub(crate) fn resolve_unique(ctx: &mut LinkContext<'_>, id: EntityId) -> Result<Vec<NodeId>, LinkError> {
    let entity = ctx.schema.entity(id);
    let list = entity.holder;
    let context = entity.context;
    let location = entity.location.clone();
    let Reference::Paths(paths) = &entity.reference else {
        return Err(LinkError::data_model(&location, "unique has no paths"));
    };
    let paths = paths.clone();
    let list_module = ctx.schema.module_of(ctx.schema.node(list).unit);

    let mut targets = Vec::with_capacity(paths.len());
    for path in &paths {
        if path.absolute || path.ancestors > 0 {
            return Err(LinkError::invalid_path(
                &location,
                "unique",
                path.to_string(),
                "must be a descendant path",
            ));
        }
        let mut steps = map_steps(ctx.schema, context, path, &location, "unique")?;
        let mut previous = list_module;
        for (step, source) in steps.iter_mut().zip(&path.steps) {
            if source.name.prefix.is_none() {
                step.module = previous;
            }
            previous = step.module;
        }
        let target = walk(
            ctx.schema,
            ctx.observer,
            Start::Under(list),
            &steps,
            list_module,
            PathMode::Data,
        )
        .and_then(|chain| chain.last().copied())
        .ok_or_else(|| no_match(&location, "unique", path))?;
        if !ctx.schema.node(target).kind.is_leaf_like() {
            return Err(LinkError::invalid_path(
                &location,
                "unique",
                path.to_string(),
                "must end at a leaf",
            ));
        }
        targets.push(target);
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::context::NoopObserver;
    use crate::linker::LinkOptions;
    use crate::model::{Import, TypeSpec};

    fn loc() -> Location {
        Location::new("m.yang", 1, 1)
    }

    fn parse(text: &str) -> SchemaPath {
        SchemaPath::parse(text, &loc()).unwrap()
    }

    #[test]
    fn test_classify_transitions() {
        let a = UnitId::from_raw(1).unwrap();
        let b = UnitId::from_raw(2).unwrap();
        let c = UnitId::from_raw(3).unwrap();
        assert_eq!(PrefixTransition::classify(a, a, a), PrefixTransition::NoChangeIntra);
        assert_eq!(PrefixTransition::classify(b, b, a), PrefixTransition::NoChangeInter);
        assert_eq!(PrefixTransition::classify(a, b, a), PrefixTransition::IntraToInter);
        assert_eq!(PrefixTransition::classify(b, a, a), PrefixTransition::InterToIntra);
        assert_eq!(PrefixTransition::classify(b, c, a), PrefixTransition::InterToInter);
        assert!(!PrefixTransition::NoChangeInter.changes_module());
    }

    /// m: container top { list l { key k; leaf k; leaf v; } choice ch { case one { leaf id; } } leaf ref; }
    fn fixture() -> (Schema, UnitId, NodeId) {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let top = schema.add_node(Owner::Unit(m), NodeKind::Container, "top", loc());
        let l = schema.add_node(Owner::Node(top), NodeKind::List, "l", loc());
        schema.add_key(l, "k");
        let k = schema.add_node(Owner::Node(l), NodeKind::Leaf, "k", loc());
        schema.set_type(k, TypeSpec::named("string"));
        schema.add_node(Owner::Node(l), NodeKind::Leaf, "v", loc());
        let ch = schema.add_node(Owner::Node(top), NodeKind::Choice, "ch", loc());
        let one = schema.add_node(Owner::Node(ch), NodeKind::Case, "one", loc());
        schema.add_node(Owner::Node(one), NodeKind::Leaf, "id", loc());
        let r = schema.add_node(Owner::Node(top), NodeKind::Leaf, "ref", loc());
        (schema, m, r)
    }

    fn leafref(schema: &mut Schema, holder: NodeId, path: &str) -> NodeId {
        let id = schema.set_type(holder, TypeSpec::leafref(parse(path)))[0];
        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(schema, &options, &mut observer);
        resolve_leafref(&mut ctx, id).unwrap()
    }

    #[test]
    fn test_relative_matches_absolute() {
        let (mut schema, m, r) = fixture();
        let relative = leafref(&mut schema, r, "../l/v");
        let other = schema.add_node(Owner::Unit(m), NodeKind::Leaf, "other", loc());
        let absolute = leafref(&mut schema, other, "/top/l/v");
        assert_eq!(relative, absolute);
        assert_eq!(Some(relative), schema.find_node(m, "top/l/v"));
    }

    #[test]
    fn test_choice_and_case_are_transparent_in_data_paths() {
        let (mut schema, m, r) = fixture();
        let target = leafref(&mut schema, r, "../id");
        assert_eq!(Some(target), schema.find_node(m, "top/ch/one/id"));
    }

    #[test]
    fn test_predicate_axes() {
        let (mut schema, m, r) = fixture();
        let id = schema.set_type(r, TypeSpec::leafref(parse("/top/l[k = current()/../id]/v")))[0];
        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(&mut schema, &options, &mut observer);
        resolve_leafref(&mut ctx, id).unwrap();

        let path = schema.entity(id).path().unwrap();
        let predicate = &path.steps[1].predicates[0];
        assert_eq!(predicate.left_axis, schema.find_node(m, "top/l/k"));
        assert_eq!(predicate.right_axis, schema.find_node(m, "top/ch/one/id"));
        let spec_path = schema.node(r).type_spec.as_ref().unwrap().path.as_ref().unwrap();
        assert_eq!(spec_path.steps[1].predicates[0].left_axis, predicate.left_axis);
    }

    #[test]
    fn test_predicate_on_container_is_rejected() {
        let (mut schema, _, r) = fixture();
        let id = schema.set_type(r, TypeSpec::leafref(parse("/top[k = current()/../id]/l/v")))[0];
        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(&mut schema, &options, &mut observer);
        let err = resolve_leafref(&mut ctx, id).unwrap_err();
        assert!(matches!(err, LinkError::PredicateNotList { .. }));
    }

    #[test]
    fn test_predicate_on_non_key_leaf_is_rejected() {
        let (mut schema, _, r) = fixture();
        let id = schema.set_type(r, TypeSpec::leafref(parse("/top/l[v = current()/../id]/k")))[0];
        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(&mut schema, &options, &mut observer);
        let err = resolve_leafref(&mut ctx, id).unwrap_err();
        assert!(matches!(err, LinkError::InvalidPath { .. }), "{err}");
        assert!(err.to_string().contains("\"v\" is not a key leaf of \"l\""), "{err}");
    }

    #[test]
    fn test_leafref_to_container_is_rejected() {
        let (mut schema, _, r) = fixture();
        let id = schema.set_type(r, TypeSpec::leafref(parse("/top/l")))[0];
        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(&mut schema, &options, &mut observer);
        let err = resolve_leafref(&mut ctx, id).unwrap_err();
        assert!(matches!(err, LinkError::InvalidLeafrefTarget { found: "list", .. }));
    }

    #[test]
    fn test_too_many_hops() {
        let (mut schema, _, r) = fixture();
        let id = schema.set_type(r, TypeSpec::leafref(parse("../../../x")))[0];
        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(&mut schema, &options, &mut observer);
        let err = resolve_leafref(&mut ctx, id).unwrap_err();
        assert!(matches!(err, LinkError::InvalidPath { .. }));
    }

    #[test]
    fn test_augment_target_across_modules() {
        let (mut schema, m, _) = fixture();
        let a = schema.add_module("a", "urn:a", "a", "a.yang");
        let mut import = Import::new("m", "mm", loc());
        import.target = Some(m);
        schema.add_import(a, import);
        let augment = schema.add_augment(Owner::Unit(a), parse("/mm:top/mm:ch"), loc());
        let id = schema.node(augment).entities[0];

        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(&mut schema, &options, &mut observer);
        let target = resolve_schema_target(&mut ctx, id).unwrap();
        assert_eq!(Some(target), schema.find_node(m, "top/ch"));
    }
}
