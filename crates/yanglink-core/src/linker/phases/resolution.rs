//! Phase 3: Reference resolution.
//!
//! Walk each unit's pending lists in link order and run the engine on every
//! entity that is not final yet. Lists grow while they are walked (grouping
//! instantiation, typedef re-queueing), so they are indexed, not iterated.

use crate::error::LinkError;
use crate::linker::context::LinkContext;
use crate::linker::engine;
use crate::model::{EntityKind, UnitId};

/// Resolve every pending entity except `unique`.
pub fn resolve_units(ctx: &mut LinkContext<'_>, order: &[UnitId]) -> Result<(), LinkError> {
    for &unit in order {
        for kind in EntityKind::LINK_ORDER {
            drain(ctx, unit, kind)?;
        }
    }

    // Completion can queue entities on units that were already walked.
    loop {
        let mut progressed = false;
        for unit in ctx.schema.source_unit_ids() {
            for kind in EntityKind::LINK_ORDER {
                progressed |= drain(ctx, unit, kind)?;
            }
        }
        if !progressed {
            return Ok(());
        }
    }
}

/// Run the engine over one pending list. Returns whether anything was resolved.
pub(crate) fn drain(ctx: &mut LinkContext<'_>, unit: UnitId, kind: EntityKind) -> Result<bool, LinkError> {
    let mut resolved = false;
    let mut index = 0;
    while let Some(&id) = ctx.schema.unit(unit).pending(kind).get(index) {
        index += 1;
        if ctx.schema.entity(id).status.is_final() {
            continue;
        }
        engine::resolve(ctx, id)?;
        resolved = true;
    }
    Ok(resolved)
}
