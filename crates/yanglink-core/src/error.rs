//! Link errors.
//!
//! Every failure is fatal to the link and carries the location of the
//! construct that caused it. [`LinkError::is_data_model`] tells structural
//! inconsistencies in the trees apart from reference-resolution failures.

use crate::model::{Location, ResolutionStatus};
use alloc::string::String;
use alloc::vec::Vec;

/// Errors raised while linking.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The schema tree itself is inconsistent.
    #[error("{location}: data model violation: {message}")]
    DataModel {
        /// Offending construct.
        location: Location,
        /// What is inconsistent.
        message: String,
    },

    /// A name reference matched no definition.
    #[error("{location}: unresolved {construct} \"{name}\"")]
    Unresolved {
        /// Reference site.
        location: Location,
        /// Reference kind (`type`, `uses`, `feature`, ...).
        construct: &'static str,
        /// The reference as written.
        name: String,
    },

    /// A prefix that is neither the unit's own nor an import's.
    #[error("{location}: unknown prefix \"{prefix}\" in {construct}")]
    UnknownPrefix {
        /// Reference site.
        location: Location,
        /// Reference kind.
        construct: &'static str,
        /// The prefix.
        prefix: String,
    },

    /// An import names a module that is not part of the corpus.
    #[error("{location}: imported module \"{module}\" not found")]
    ImportNotFound {
        /// Import statement.
        location: Location,
        /// Module name (with revision when requested).
        module: String,
    },

    /// An include names a submodule that is not part of the corpus.
    #[error("{location}: included submodule \"{submodule}\" not found")]
    IncludeNotFound {
        /// Include statement.
        location: Location,
        /// Submodule name.
        submodule: String,
    },

    /// A submodule's belongs-to module is missing or does not match.
    #[error("{location}: submodule \"{submodule}\" does not belong to module \"{module}\"")]
    BelongsTo {
        /// Submodule or include statement.
        location: Location,
        /// Submodule name.
        submodule: String,
        /// Expected module.
        module: String,
    },

    /// Two imports in one unit share a prefix.
    #[error("{location}: prefix \"{prefix}\" is bound more than once")]
    DuplicatePrefix {
        /// Second import.
        location: Location,
        /// The prefix.
        prefix: String,
    },

    /// Units import or include each other in a cycle.
    #[error("{location}: circular dependency between units: {}", .units.join(" -> "))]
    CircularDependency {
        /// Unit closing the cycle.
        location: Location,
        /// Unit names in cycle order.
        units: Vec<String>,
    },

    /// A reference depends on itself (e.g. mutually recursive typedefs).
    #[error("{location}: circular {construct} reference \"{name}\"")]
    CircularReference {
        /// Reference site.
        location: Location,
        /// Reference kind.
        construct: &'static str,
        /// The reference as written.
        name: String,
    },

    /// An augment adds a name that already exists at its target.
    #[error("{location}: \"{name}\" collides with an existing node at the augment target")]
    Collision {
        /// Augment statement.
        location: Location,
        /// Duplicated name.
        name: String,
    },

    /// A path expression could not be parsed or did not resolve.
    #[error("{location}: invalid {construct} path \"{path}\": {reason}")]
    InvalidPath {
        /// Path owner.
        location: Location,
        /// Path kind (`augment`, `leafref`, `deviation`, ...).
        construct: &'static str,
        /// The path as written.
        path: String,
        /// Why it failed.
        reason: String,
    },

    /// A leafref path ends at a node that is not a leaf or leaf-list.
    #[error("{location}: leafref path \"{path}\" must end at a leaf or leaf-list, found {found}")]
    InvalidLeafrefTarget {
        /// Leafref site.
        location: Location,
        /// The path as written.
        path: String,
        /// Keyword of the node reached.
        found: &'static str,
    },

    /// A path predicate sits on a step that is not a list.
    #[error("{location}: predicate on \"{step}\", which is not a list")]
    PredicateNotList {
        /// Path owner.
        location: Location,
        /// Step carrying the predicate.
        step: String,
    },

    /// An identifier breaks the naming rules.
    #[error("{location}: invalid identifier \"{identifier}\": {reason}")]
    InvalidIdentifier {
        /// Identifier site.
        location: Location,
        /// The identifier.
        identifier: String,
        /// Rule that failed.
        reason: &'static str,
    },

    /// A deviate edit cannot be applied to its target.
    #[error("{location}: invalid deviation: {message}")]
    InvalidDeviation {
        /// Deviation statement.
        location: Location,
        /// What failed.
        message: String,
    },

    /// A cloned reference names a module the use site does not import.
    #[error("{location}: module \"{module}\" is not imported by \"{unit}\"")]
    NotImported {
        /// Reference site.
        location: Location,
        /// Module that needs a prefix.
        module: String,
        /// Unit lacking the import.
        unit: String,
    },

    /// An entity reached a status the engine cannot act on.
    #[error("{location}: {construct} entity in invalid state {status:?}")]
    InvalidState {
        /// Reference site.
        location: Location,
        /// Reference kind.
        construct: &'static str,
        /// Offending status.
        status: ResolutionStatus,
    },

    /// The resolution stack exceeded the configured depth.
    #[error("{location}: resolution stack exceeded {limit} entries")]
    StackOverflow {
        /// Reference being resolved when the limit was hit.
        location: Location,
        /// Configured limit.
        limit: usize,
    },
}

impl LinkError {
    /// Location of the offending construct.
    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            Self::DataModel { location, .. }
            | Self::Unresolved { location, .. }
            | Self::UnknownPrefix { location, .. }
            | Self::ImportNotFound { location, .. }
            | Self::IncludeNotFound { location, .. }
            | Self::BelongsTo { location, .. }
            | Self::DuplicatePrefix { location, .. }
            | Self::CircularDependency { location, .. }
            | Self::CircularReference { location, .. }
            | Self::Collision { location, .. }
            | Self::InvalidPath { location, .. }
            | Self::InvalidLeafrefTarget { location, .. }
            | Self::PredicateNotList { location, .. }
            | Self::InvalidIdentifier { location, .. }
            | Self::InvalidDeviation { location, .. }
            | Self::NotImported { location, .. }
            | Self::InvalidState { location, .. }
            | Self::StackOverflow { location, .. } => location,
        }
    }

    /// Whether this is a structural violation rather than a linker one.
    #[must_use]
    pub fn is_data_model(&self) -> bool {
        matches!(self, Self::DataModel { .. })
    }

    pub(crate) fn data_model(location: &Location, message: impl Into<String>) -> Self {
        Self::DataModel {
            location: location.clone(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_path(
        location: &Location,
        construct: &'static str,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidPath {
            location: location.clone(),
            construct,
            path: path.into(),
            reason: reason.into(),
        }
    }
}
