//! Phase 4: `unique` constraints.
//!
//! Unique paths descend through the list's data tree, so they resolve only
//! once every augment and grouping has been spliced in.

use crate::error::LinkError;
use crate::linker::context::LinkContext;
use crate::model::EntityKind;

use super::resolution::drain;

/// Resolve every pending `unique` entity.
pub fn resolve_uniques(ctx: &mut LinkContext<'_>) -> Result<(), LinkError> {
    for unit in ctx.schema.source_unit_ids() {
        drain(ctx, unit, EntityKind::Unique)?;
    }
    Ok(())
}
