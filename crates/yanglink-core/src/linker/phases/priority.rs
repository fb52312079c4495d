//! Phase 2: Unit priorities.
//!
//! Every import or include target must link before the unit that depends on
//! it, so a target's priority is kept strictly above its dependents'.

use crate::error::LinkError;
use crate::linker::context::LinkContext;
use crate::model::{Location, Schema, UnitId};
use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Open,
    Done,
}

/// Reject dependency cycles, assign priorities and return the link order.
///
/// The order lists source units by descending priority; ties keep unit order.
pub fn order_units(ctx: &mut LinkContext<'_>) -> Result<Vec<UnitId>, LinkError> {
    let units = ctx.schema.source_unit_ids();
    check_cycles(ctx.schema, &units)?;
    propagate(ctx.schema, &units);

    let mut order = units;
    order.sort_by(|&a, &b| {
        let (pa, pb) = (ctx.schema.unit(a).priority, ctx.schema.unit(b).priority);
        pb.cmp(&pa).then(a.cmp(&b))
    });
    for &unit in &order {
        let record = ctx.schema.unit(unit);
        ctx.observer.unit_priority(&record.name, record.priority);
    }
    Ok(order)
}

/// Import and include edges of `unit`, with the statement location.
fn edges(schema: &Schema, unit: UnitId) -> Vec<(UnitId, Location)> {
    let record = schema.unit(unit);
    record
        .imports
        .iter()
        .filter_map(|i| i.target.map(|t| (t, i.location.clone())))
        .chain(
            record
                .includes
                .iter()
                .filter_map(|i| i.target.map(|t| (t, i.location.clone()))),
        )
        .collect()
}

/// Iterative depth-first search; an edge back to an open unit closes a cycle.
fn check_cycles(schema: &Schema, units: &[UnitId]) -> Result<(), LinkError> {
    let mut marks: BTreeMap<UnitId, Mark> = BTreeMap::new();

    for &start in units {
        if marks.contains_key(&start) {
            continue;
        }
        // (unit, its edges, next edge index)
        let mut stack: Vec<(UnitId, Vec<(UnitId, Location)>, usize)> =
            alloc::vec![(start, edges(schema, start), 0)];
        marks.insert(start, Mark::Open);

        while let Some((unit, out, next)) = stack.last_mut() {
            let Some((target, location)) = out.get(*next).cloned() else {
                marks.insert(*unit, Mark::Done);
                stack.pop();
                continue;
            };
            *next += 1;
            match marks.get(&target) {
                Some(Mark::Done) => {}
                Some(Mark::Open) => {
                    let from = stack.iter().position(|(u, _, _)| *u == target).unwrap_or(0);
                    let mut names: Vec<String> = stack[from..]
                        .iter()
                        .map(|(u, _, _)| schema.unit(*u).name.clone())
                        .collect();
                    names.push(schema.unit(target).name.clone());
                    return Err(LinkError::CircularDependency {
                        location,
                        units: names,
                    });
                }
                None => {
                    marks.insert(target, Mark::Open);
                    let out = edges(schema, target);
                    stack.push((target, out, 0));
                }
            }
        }
    }
    Ok(())
}

/// Raise every dependency above its dependents until nothing changes.
///
/// Terminates because the graph is acyclic.
fn propagate(schema: &mut Schema, units: &[UnitId]) {
    let mut queue: VecDeque<UnitId> = units.iter().copied().collect();
    while let Some(unit) = queue.pop_front() {
        let priority = schema.unit(unit).priority;
        let targets: Vec<UnitId> = schema.unit(unit).dependencies().collect();
        for target in targets {
            let record = schema.unit_mut(target);
            if record.priority <= priority {
                record.priority = priority + 1;
                queue.push_back(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::context::NoopObserver;
    use crate::linker::phases::registration::register_units;
    use crate::linker::LinkOptions;
    use crate::model::{Import, Include};

    fn loc(file: &str) -> Location {
        Location::new(file, 2, 3)
    }

    fn order(schema: &mut Schema) -> Result<Vec<UnitId>, LinkError> {
        let options = LinkOptions::default();
        let mut observer = NoopObserver;
        let mut ctx = LinkContext::new(schema, &options, &mut observer);
        register_units(&mut ctx)?;
        order_units(&mut ctx)
    }

    #[test]
    fn test_dependencies_link_first() {
        let mut schema = Schema::new();
        let a = schema.add_module("a", "urn:a", "a", "a.yang");
        let b = schema.add_module("b", "urn:b", "b", "b.yang");
        let c = schema.add_module("c", "urn:c", "c", "c.yang");
        schema.add_import(a, Import::new("b", "b", loc("a.yang")));
        schema.add_import(a, Import::new("c", "c", loc("a.yang")));
        schema.add_import(b, Import::new("c", "c", loc("b.yang")));

        let order = order(&mut schema).unwrap();
        assert_eq!(order, [c, b, a]);
        assert!(schema.unit(c).priority > schema.unit(b).priority);
        assert!(schema.unit(b).priority > schema.unit(a).priority);
    }

    #[test]
    fn test_includes_count_as_edges() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let sub = schema.add_submodule("m-sub", "m", "m", "m-sub.yang");
        schema.add_include(m, Include::new("m-sub", loc("m.yang")));
        let order = order(&mut schema).unwrap();
        assert_eq!(order, [sub, m]);
    }

    #[test]
    fn test_ties_keep_unit_order() {
        let mut schema = Schema::new();
        let a = schema.add_module("a", "urn:a", "a", "a.yang");
        let b = schema.add_module("b", "urn:b", "b", "b.yang");
        assert_eq!(order(&mut schema).unwrap(), [a, b]);
    }

    #[test]
    fn test_circular_import() {
        let mut schema = Schema::new();
        let a = schema.add_module("a", "urn:a", "a", "a.yang");
        let b = schema.add_module("b", "urn:b", "b", "b.yang");
        schema.add_import(a, Import::new("b", "b", loc("a.yang")));
        schema.add_import(b, Import::new("a", "a", loc("b.yang")));

        let err = order(&mut schema).unwrap_err();
        let LinkError::CircularDependency { location, units } = err else {
            panic!("expected a circular dependency, got {err:?}");
        };
        assert_eq!(units, ["a", "b", "a"]);
        assert_eq!(location.file, "b.yang");
    }
}
