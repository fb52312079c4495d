//! Link context (schema, options and working state during linking).

use crate::model::{Entity, EntityId, Location, NodeId, Schema, UnitId};

use super::path::PrefixTransition;
use super::tracing::Phase;
use super::{LinkOptions, LinkSummary};

#[cfg(feature = "tracing")]
use super::tracing::{TraceEvent, TraceLevel, Tracer};

/// Observer for optional link tracing.
///
/// Methods default to no-ops so untraced linking pays nothing, and one
/// implementation of every phase serves both traced and untraced entry points.
pub(crate) trait LinkObserver {
    fn phase_start(&mut self, _phase: Phase) {}

    fn phase_end(&mut self, _phase: Phase) {}

    fn unit_priority(&mut self, _unit: &str, _priority: u32) {}

    fn entity_status(&mut self, _id: EntityId, _entity: &Entity) {}

    fn feature_undefined(&mut self, _feature: &str, _location: &Location) {}

    fn grouping_instantiated(&mut self, _grouping: &str, _uses: NodeId, _clones: usize) {}

    fn augment_applied(&mut self, _augment: NodeId, _target: NodeId, _wrapped: bool) {}

    fn deviation_cloned(&mut self, _unit: &str, _clone: UnitId) {}

    fn path_step(&mut self, _step: &str, _transition: PrefixTransition, _candidates: usize) {}
}

/// Observer for untraced linking.
pub(crate) struct NoopObserver;

impl LinkObserver for NoopObserver {}

/// Adapts a public [`Tracer`] to [`LinkObserver`].
#[cfg(feature = "tracing")]
pub(crate) struct TracingWrapper<'a, T: Tracer>(pub(crate) &'a mut T);

#[cfg(feature = "tracing")]
impl<T: Tracer> LinkObserver for TracingWrapper<'_, T> {
    fn phase_start(&mut self, phase: Phase) {
        crate::trace_event!(self.0, TraceLevel::Info, TraceEvent::PhaseStart { phase });
    }

    fn phase_end(&mut self, phase: Phase) {
        crate::trace_event!(self.0, TraceLevel::Info, TraceEvent::PhaseEnd { phase });
    }

    fn unit_priority(&mut self, unit: &str, priority: u32) {
        crate::trace_event!(
            self.0,
            TraceLevel::Debug,
            TraceEvent::UnitPriority { unit, priority }
        );
    }

    fn entity_status(&mut self, id: EntityId, entity: &Entity) {
        crate::trace_event!(
            self.0,
            TraceLevel::Debug,
            TraceEvent::EntityStatus {
                entity: id,
                kind: entity.kind,
                status: entity.status,
                target: entity.target,
            }
        );
    }

    fn feature_undefined(&mut self, feature: &str, location: &Location) {
        crate::trace_event!(
            self.0,
            TraceLevel::Warn,
            TraceEvent::FeatureUndefined { feature, location }
        );
    }

    fn grouping_instantiated(&mut self, grouping: &str, uses: NodeId, clones: usize) {
        crate::trace_event!(
            self.0,
            TraceLevel::Debug,
            TraceEvent::GroupingInstantiated {
                grouping,
                uses,
                clones,
            }
        );
    }

    fn augment_applied(&mut self, augment: NodeId, target: NodeId, wrapped: bool) {
        crate::trace_event!(
            self.0,
            TraceLevel::Debug,
            TraceEvent::AugmentApplied {
                augment,
                target,
                wrapped,
            }
        );
    }

    fn deviation_cloned(&mut self, unit: &str, clone: UnitId) {
        crate::trace_event!(
            self.0,
            TraceLevel::Info,
            TraceEvent::DeviationCloned { unit, clone }
        );
    }

    fn path_step(&mut self, step: &str, transition: PrefixTransition, candidates: usize) {
        crate::trace_event!(
            self.0,
            TraceLevel::Trace,
            TraceEvent::PathStep {
                step,
                transition,
                candidates,
            }
        );
    }
}

/// Working state shared by every phase.
pub(crate) struct LinkContext<'a> {
    /// The schema being linked.
    pub schema: &'a mut Schema,
    /// Caller options.
    pub options: &'a LinkOptions,
    /// Trace sink.
    pub observer: &'a mut dyn LinkObserver,
    /// Counters reported back to the caller.
    pub summary: LinkSummary,
}

impl<'a> LinkContext<'a> {
    pub(crate) fn new(
        schema: &'a mut Schema,
        options: &'a LinkOptions,
        observer: &'a mut dyn LinkObserver,
    ) -> Self {
        Self {
            schema,
            options,
            observer,
            summary: LinkSummary::default(),
        }
    }

    /// Set an entity's status and report it.
    pub(crate) fn set_status(&mut self, id: EntityId, status: crate::model::ResolutionStatus) {
        self.schema.entity_mut(id).status = status;
        self.observer.entity_status(id, self.schema.entity(id));
    }
}
