//! Deviation application.
//!
//! The first deviation that touches a unit clones the whole unit; every
//! deviate edit then lands on the clone. The original tree is never edited.

use super::context::LinkContext;
use crate::error::LinkError;
use crate::model::{
    CloneMap, Deviate, Location, NodeId, NodeProperties, Owner, Schema, SchemaNode, SchemaUnit, UnitId,
};
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;

/// Clone of `unit`, created on first use.
pub(crate) fn ensure_clone(ctx: &mut LinkContext<'_>, unit: UnitId) -> UnitId {
    if let Some(clone) = ctx.schema.deviated(unit) {
        return clone;
    }

    let original = ctx.schema.unit(unit).clone();
    let clone = ctx.schema.push_unit(|id| SchemaUnit {
        id,
        pending: BTreeMap::new(),
        first_root: None,
        last_root: None,
        deviation_clone: None,
        clone_of: Some(unit),
        ..original
    });

    let roots: Vec<NodeId> = ctx.schema.roots(unit).collect();
    let mut map = CloneMap::new();
    for root in roots {
        let (copy, part) = ctx.schema.deep_clone(root, clone, &|_| false);
        ctx.schema.append_child(Owner::Unit(clone), copy);
        map.extend(part);
    }

    // Links between nodes of the unit point into the clone; links to other
    // units stay as they are.
    let remap = |id: NodeId| map.get(&id).copied().unwrap_or(id);
    for &copy in map.values() {
        let node = ctx.schema.node_mut(copy);
        node.augments.iter_mut().for_each(|a| *a = remap(*a));
        node.augment_target = node.augment_target.map(remap);
        node.instances.iter_mut().for_each(|i| *i = remap(*i));
        node.derived_identities.iter_mut().for_each(|d| *d = remap(*d));
        node.annotations.iter_mut().for_each(|a| *a = remap(*a));
    }

    ctx.schema.set_deviation_map(unit, map);
    ctx.schema.unit_mut(unit).deviation_clone = Some(clone);
    ctx.summary.units_cloned += 1;
    let name = ctx.schema.unit(unit).name.clone();
    ctx.observer.deviation_cloned(&name, clone);
    clone
}

/// Record `link` in one of `node`'s link lists, and in its copy's when the
/// unit was already cloned. Inside the clone, a link to a node of the same
/// unit points at that node's copy.
pub(crate) fn record_link(
    schema: &mut Schema,
    node: NodeId,
    link: NodeId,
    list: fn(&mut SchemaNode) -> &mut Vec<NodeId>,
) {
    let copy = schema.deviated_node(node).map(|copy| {
        let local = schema.node(link).unit == schema.node(node).unit;
        let link = if local { schema.deviated_node(link).unwrap_or(link) } else { link };
        (copy, link)
    });
    for (at, link) in core::iter::once((node, link)).chain(copy) {
        let links = list(schema.node_mut(at));
        if !links.contains(&link) {
            links.push(link);
        }
    }
}

/// Apply the deviates of `deviation` to the clone of `target`.
pub(crate) fn apply(ctx: &mut LinkContext<'_>, deviation: NodeId, target: NodeId) -> Result<(), LinkError> {
    let location = ctx.schema.node(deviation).location.clone();
    let unit = ctx.schema.node(target).unit;
    ensure_clone(ctx, unit);
    let copy = ctx.schema.deviated_node(target).ok_or_else(|| {
        LinkError::data_model(&location, format!("{target} has no counterpart in the deviation clone"))
    })?;

    let deviates = ctx.schema.node(deviation).deviates.clone();
    for deviate in deviates {
        match deviate {
            Deviate::NotSupported => ctx.schema.detach(copy),
            Deviate::Add(props) => add(&mut ctx.schema.node_mut(copy).properties, props, &location)?,
            Deviate::Delete(props) => delete(&mut ctx.schema.node_mut(copy).properties, props, &location)?,
            Deviate::Replace(props) => replace(&mut ctx.schema.node_mut(copy).properties, props),
        }
    }
    ctx.summary.deviations_applied += 1;
    Ok(())
}

/// Run `$body` for every single-valued property; `must` is handled apart.
macro_rules! each_property {
    ($target:ident, $edit:ident, |$name:ident, $have:ident, $want:ident| $body:block) => {{
        each_property!(@one $target, $edit, config, $name, $have, $want, $body);
        each_property!(@one $target, $edit, mandatory, $name, $have, $want, $body);
        each_property!(@one $target, $edit, default, $name, $have, $want, $body);
        each_property!(@one $target, $edit, units, $name, $have, $want, $body);
        each_property!(@one $target, $edit, min_elements, $name, $have, $want, $body);
        each_property!(@one $target, $edit, max_elements, $name, $have, $want, $body);
    }};
    (@one $target:ident, $edit:ident, $field:ident, $name:ident, $have:ident, $want:ident, $body:block) => {
        if let Some($want) = $edit.$field {
            let $name = stringify!($field);
            let $have = &mut $target.$field;
            $body
        }
    };
}

fn invalid(location: &Location, message: alloc::string::String) -> LinkError {
    LinkError::InvalidDeviation {
        location: location.clone(),
        message,
    }
}

fn add(target: &mut NodeProperties, edit: NodeProperties, location: &Location) -> Result<(), LinkError> {
    each_property!(target, edit, |name, have, want| {
        if have.is_some() {
            return Err(invalid(location, format!("cannot add {name}: already present")));
        }
        *have = Some(want);
    });
    target.must.extend(edit.must);
    Ok(())
}

fn delete(target: &mut NodeProperties, edit: NodeProperties, location: &Location) -> Result<(), LinkError> {
    each_property!(target, edit, |name, have, want| {
        if have.as_ref() != Some(&want) {
            return Err(invalid(location, format!("cannot delete {name}: value does not match")));
        }
        *have = None;
    });
    for must in edit.must {
        let Some(index) = target.must.iter().position(|m| *m == must) else {
            return Err(invalid(location, format!("cannot delete must \"{must}\": not present")));
        };
        target.must.remove(index);
    }
    Ok(())
}

fn replace(target: &mut NodeProperties, edit: NodeProperties) {
    each_property!(target, edit, |_name, have, want| {
        *have = Some(want);
    });
    if !edit.must.is_empty() {
        target.must = edit.must;
    }
}
