//! Cross-module reference linking.
//!
//! The linker takes a [`Schema`] whose units were built independently, with
//! every name and path reference queued as a pending entity, and binds each
//! reference to its definition or target node. Along the way it applies the
//! structural consequences of a binding:
//!
//! - `uses` instantiates a private copy of the grouping
//! - `augment` splices its children into the target
//! - `deviation` edits a per-unit clone, never the original
//! - identities are recorded on their transitive bases
//!
//! # Pipeline
//!
//! ```text
//! Schema (pending entities) → Linker → Schema (resolved)
//! ```
//!
//! # Usage
//!
//! ```
//! use yanglink_core::model::{NodeKind, Owner, Location, TypeSpec};
//! use yanglink_core::{Linker, LinkOptions, Schema};
//!
//! let mut schema = Schema::new();
//! let m = schema.add_module("m", "urn:m", "m", "m.yang");
//! let t = schema.add_node(Owner::Unit(m), NodeKind::Typedef, "percent", Location::new("m.yang", 3, 3));
//! schema.set_type(t, TypeSpec::named("uint8"));
//! let leaf = schema.add_node(Owner::Unit(m), NodeKind::Leaf, "load", Location::new("m.yang", 6, 3));
//! schema.set_type(leaf, TypeSpec::named("percent"));
//!
//! let summary = Linker::new(LinkOptions::default()).link(&mut schema).unwrap();
//! assert_eq!(summary.entities_resolved, 1);
//! ```

mod collision;
mod context;
mod deviation;
mod engine;
mod grouping;
mod lookup;
mod path;
mod phases;
pub mod tracing;

pub use path::PrefixTransition;

use crate::error::LinkError;
use crate::model::Schema;
use context::{LinkContext, LinkObserver, NoopObserver};
use self::tracing::Phase;

#[cfg(feature = "tracing")]
use context::TracingWrapper;
#[cfg(feature = "tracing")]
use self::tracing::Tracer;

/// Caller-tunable link behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkOptions {
    /// Treat an `if-feature` naming a missing feature as an error instead of
    /// marking it undefined.
    pub strict_features: bool,
    /// Upper bound on the resolution stack.
    pub max_stack_depth: usize,
}

impl LinkOptions {
    /// Default stack bound.
    pub const DEFAULT_MAX_STACK_DEPTH: usize = 10_000;

    /// Set `strict_features`.
    #[must_use]
    pub fn strict_features(mut self, strict: bool) -> Self {
        self.strict_features = strict;
        self
    }

    /// Set `max_stack_depth`.
    #[must_use]
    pub fn max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            strict_features: false,
            max_stack_depth: Self::DEFAULT_MAX_STACK_DEPTH,
        }
    }
}

/// What a successful link did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkSummary {
    /// Source units linked.
    pub units: usize,
    /// Entities that went through a completion step.
    pub entities_resolved: usize,
    /// `if-feature` references left undefined.
    pub undefined_features: usize,
    /// Augments and uses-augments spliced.
    pub augments_applied: usize,
    /// `uses` instantiated.
    pub groupings_instantiated: usize,
    /// Deviations applied.
    pub deviations_applied: usize,
    /// Deviation clones created.
    pub units_cloned: usize,
}

/// The linker.
#[derive(Clone, Debug, Default)]
pub struct Linker {
    options: LinkOptions,
}

impl Linker {
    /// Create a linker.
    #[must_use]
    pub fn new(options: LinkOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &LinkOptions {
        &self.options
    }

    /// Link every unit of `schema`.
    ///
    /// Stops at the first error; the schema is left partially linked.
    pub fn link(&self, schema: &mut Schema) -> Result<LinkSummary, LinkError> {
        self.link_inner(schema, &mut NoopObserver)
    }

    /// Link with tracing support.
    #[cfg(feature = "tracing")]
    pub fn link_traced<T: Tracer>(&self, schema: &mut Schema, tracer: &mut T) -> Result<LinkSummary, LinkError> {
        self.link_inner(schema, &mut TracingWrapper(tracer))
    }

    fn link_inner(&self, schema: &mut Schema, observer: &mut dyn LinkObserver) -> Result<LinkSummary, LinkError> {
        let mut ctx = LinkContext::new(schema, &self.options, observer);

        run(&mut ctx, Phase::Registration, phases::register_units)?;
        let order = run(&mut ctx, Phase::Priority, phases::order_units)?;
        ctx.summary.units = order.len();
        run(&mut ctx, Phase::Resolution, |ctx| phases::resolve_units(ctx, &order))?;
        run(&mut ctx, Phase::Uniques, phases::resolve_uniques)?;
        run(&mut ctx, Phase::Identities, phases::propagate_identities)?;

        Ok(ctx.summary)
    }
}

fn run<R>(
    ctx: &mut LinkContext<'_>,
    phase: Phase,
    body: impl FnOnce(&mut LinkContext<'_>) -> Result<R, LinkError>,
) -> Result<R, LinkError> {
    ctx.observer.phase_start(phase);
    let result = body(ctx)?;
    ctx.observer.phase_end(phase);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, NodeKind, Owner, TypeSpec};

    #[test]
    fn test_options_builders() {
        let options = LinkOptions::default().strict_features(true).max_stack_depth(64);
        assert!(options.strict_features);
        assert_eq!(options.max_stack_depth, 64);
        assert!(!LinkOptions::default().strict_features);
    }

    #[test]
    fn test_empty_schema_links() {
        let mut schema = Schema::new();
        let summary = Linker::default().link(&mut schema).unwrap();
        assert_eq!(summary, LinkSummary::default());
    }

    #[test]
    fn test_summary_counts() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let loc = Location::new("m.yang", 1, 1);
        let g = schema.add_node(Owner::Unit(m), NodeKind::Grouping, "g", loc.clone());
        schema.add_node(Owner::Node(g), NodeKind::Leaf, "x", loc.clone());
        let c = schema.add_node(Owner::Unit(m), NodeKind::Container, "c", loc.clone());
        schema.add_uses(Owner::Node(c), "g", loc.clone());
        let y = schema.add_node(Owner::Unit(m), NodeKind::Leaf, "y", loc.clone());
        schema.add_if_feature(y, "absent", loc);
        schema.set_type(y, TypeSpec::named("string"));

        let summary = Linker::default().link(&mut schema).unwrap();
        assert_eq!(summary.units, 1);
        assert_eq!(summary.groupings_instantiated, 1);
        assert_eq!(summary.undefined_features, 1);
        assert_eq!(summary.entities_resolved, 1);
        assert!(schema.find_node(m, "c/x").is_some());
    }
}
