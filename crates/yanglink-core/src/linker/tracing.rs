//! Linker tracing support.
//!
//! Structured trace events for debugging resolution issues. Events are only
//! produced through `Linker::link_traced`, which needs the `tracing` feature;
//! plain [`Linker::link`](super::Linker::link) never builds one.

use crate::model::{EntityId, EntityKind, Location, NodeId, ResolutionStatus, UnitId};

use super::path::PrefixTransition;

/// Trace verbosity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    /// Critical errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages (phase boundaries, summary stats).
    Info,
    /// Detailed debugging (individual bindings, tree edits).
    Debug,
    /// Verbose tracing (every path step).
    Trace,
}

/// Link phase identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Bind submodules, imports and includes.
    Registration,
    /// Cycle check and priority assignment.
    Priority,
    /// Per-unit resolution of pending references.
    Resolution,
    /// `unique` constraints.
    Uniques,
    /// Identity derivation sets.
    Identities,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Phase::Registration => write!(f, "registration"),
            Phase::Priority => write!(f, "priority"),
            Phase::Resolution => write!(f, "resolution"),
            Phase::Uniques => write!(f, "uniques"),
            Phase::Identities => write!(f, "identities"),
        }
    }
}

/// Structured trace events emitted during linking.
#[derive(Clone, Debug)]
pub enum TraceEvent<'a> {
    /// A link phase is starting.
    PhaseStart { phase: Phase },
    /// A link phase has ended.
    PhaseEnd { phase: Phase },

    // === Ordering events ===
    /// A unit's final priority.
    UnitPriority {
        /// Unit name.
        unit: &'a str,
        /// Assigned priority.
        priority: u32,
    },

    // === Engine events ===
    /// An entity changed status.
    EntityStatus {
        /// The entity.
        entity: EntityId,
        /// Its kind.
        kind: EntityKind,
        /// Status after the step.
        status: ResolutionStatus,
        /// Bound target, if any.
        target: Option<NodeId>,
    },
    /// An `if-feature` names a feature that exists nowhere.
    FeatureUndefined {
        /// Feature as written.
        feature: &'a str,
        /// Reference site.
        location: &'a Location,
    },

    // === Tree edit events ===
    /// A grouping was cloned into a use site.
    GroupingInstantiated {
        /// Grouping name.
        grouping: &'a str,
        /// The `uses` node.
        uses: NodeId,
        /// Number of clone roots inserted.
        clones: usize,
    },
    /// An augment was applied to its target.
    AugmentApplied {
        /// The augment node.
        augment: NodeId,
        /// Target node.
        target: NodeId,
        /// Whether children were wrapped in synthetic cases.
        wrapped: bool,
    },
    /// A unit was cloned for its first deviation.
    DeviationCloned {
        /// Original unit name.
        unit: &'a str,
        /// The clone.
        clone: UnitId,
    },

    // === Path events ===
    /// One step of a path walk.
    PathStep {
        /// Step as written.
        step: &'a str,
        /// Prefix transition relative to the previous step.
        transition: PrefixTransition,
        /// Candidate nodes matching the step.
        candidates: usize,
    },
}

/// Trait for receiving trace events during linking.
///
/// Implement this trait to capture link diagnostics. The tracer can filter
/// events by returning a minimum trace level from `level()`.
pub trait Tracer {
    /// Returns the minimum trace level to emit.
    ///
    /// Events below this level will not be passed to `trace()`.
    /// Default: `TraceLevel::Info`.
    fn level(&self) -> TraceLevel {
        TraceLevel::Info
    }

    /// Called for each trace event at or above the configured level.
    fn trace(&mut self, level: TraceLevel, event: TraceEvent<'_>);
}

/// A tracer that discards all events.
#[derive(Default, Clone, Copy, Debug)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn level(&self) -> TraceLevel {
        TraceLevel::Error
    }

    fn trace(&mut self, _level: TraceLevel, _event: TraceEvent<'_>) {}
}

/// Emit a trace event if the tracer level permits.
///
/// The level is checked before the event is constructed.
#[macro_export]
macro_rules! trace_event {
    ($tracer:expr, $level:expr, $event:expr) => {
        if $level <= $tracer.level() {
            $tracer.trace($level, $event);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    struct Recorder {
        events: Vec<(TraceLevel, String)>,
        min_level: TraceLevel,
    }

    impl Tracer for Recorder {
        fn level(&self) -> TraceLevel {
            self.min_level
        }

        fn trace(&mut self, level: TraceLevel, event: TraceEvent<'_>) {
            self.events.push((level, alloc::format!("{event:?}")));
        }
    }

    #[test]
    fn test_trace_level_ordering() {
        assert!(TraceLevel::Error < TraceLevel::Warn);
        assert!(TraceLevel::Info < TraceLevel::Debug);
        assert!(TraceLevel::Debug < TraceLevel::Trace);
    }

    #[test]
    fn test_trace_event_macro_filters() {
        let mut tracer = Recorder {
            events: Vec::new(),
            min_level: TraceLevel::Info,
        };
        trace_event!(
            tracer,
            TraceLevel::Info,
            TraceEvent::PhaseStart {
                phase: Phase::Priority
            }
        );
        trace_event!(
            tracer,
            TraceLevel::Trace,
            TraceEvent::UnitPriority {
                unit: "m",
                priority: 3
            }
        );
        assert_eq!(tracer.events.len(), 1);
        assert!(tracer.events[0].1.contains("Priority"));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Uniques.to_string(), "uniques");
    }
}
