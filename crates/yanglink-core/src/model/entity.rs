//! Resolvable entities: references awaiting a binding.

use super::ids::{EntityId, NodeId, UnitId};
use super::location::Location;
use super::path::SchemaPath;
use super::types::QName;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Reference kind.
///
/// Variant order is the order in which the driver processes each unit's
/// pending lists, so `BTreeMap<EntityKind, _>` iterates in link order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    /// `if-feature`.
    IfFeature,
    /// `uses` of a grouping.
    Uses,
    /// `augment` nested in a `uses`.
    UsesAugment,
    /// Top-level `augment`.
    Augment,
    /// `type` naming a typedef.
    DerivedType,
    /// `type union` with at least one member that needs resolving.
    Union,
    /// Identity `base`.
    Base,
    /// `type identityref`.
    IdentityRef,
    /// `type leafref`.
    Leafref,
    /// Compiler annotation targeting a schema node.
    CompilerAnnotation,
    /// `deviation`.
    Deviation,
    /// `unique` on a list.
    Unique,
}

impl EntityKind {
    /// Kinds the driver walks per unit, in order. `Unique` runs after all units.
    pub const LINK_ORDER: [EntityKind; 11] = [
        Self::IfFeature,
        Self::Uses,
        Self::UsesAugment,
        Self::Augment,
        Self::DerivedType,
        Self::Union,
        Self::Base,
        Self::IdentityRef,
        Self::Leafref,
        Self::CompilerAnnotation,
        Self::Deviation,
    ];

    /// Construct name used in diagnostics.
    #[must_use]
    pub const fn construct(self) -> &'static str {
        match self {
            Self::IfFeature => "feature",
            Self::Uses => "uses",
            Self::UsesAugment | Self::Augment => "augment",
            Self::DerivedType | Self::Union => "type",
            Self::Base => "base",
            Self::IdentityRef => "identityref",
            Self::Leafref => "leafref",
            Self::CompilerAnnotation => "compiler-annotation",
            Self::Deviation => "deviation",
            Self::Unique => "unique",
        }
    }

    /// Whether the reference is a bare (optionally prefixed) name.
    #[must_use]
    pub const fn is_named(self) -> bool {
        matches!(
            self,
            Self::IfFeature | Self::Uses | Self::DerivedType | Self::Base | Self::IdentityRef
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.construct())
    }
}

/// Where an entity is in its resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolutionStatus {
    /// Nothing looked up yet.
    #[default]
    Unresolved,
    /// Not found in the holder's own file; needs a cross-file search.
    IntraFileResolved,
    /// Bound within the holder's own module; completion pending.
    Linked,
    /// Bound in another unit; completion pending.
    InterFileLinked,
    /// Done.
    Resolved,
    /// `if-feature` naming a feature that exists nowhere.
    Undefined,
    /// State violation.
    Invalid,
}

impl ResolutionStatus {
    /// Whether the engine has nothing left to do.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Resolved | Self::Undefined)
    }

    /// Whether a target is bound and only completion remains.
    #[must_use]
    pub const fn is_linked(self) -> bool {
        matches!(self, Self::Linked | Self::InterFileLinked)
    }
}

/// What an entity refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reference {
    /// A definition name (typedef, grouping, feature, identity).
    Name(QName),
    /// A schema or data path.
    Path(SchemaPath),
    /// Descendant paths of a `unique` statement.
    Paths(Vec<SchemaPath>),
    /// No reference of its own (unions).
    None,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Path(path) => write!(f, "{path}"),
            Self::Paths(paths) => {
                for (i, path) in paths.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{path}")?;
                }
                Ok(())
            }
            Self::None => f.write_str("-"),
        }
    }
}

/// A reference awaiting resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    /// Reference kind.
    pub kind: EntityKind,
    /// Resolution state.
    pub status: ResolutionStatus,
    /// The reference itself.
    pub reference: Reference,
    /// Node that lexically contains the reference.
    pub holder: NodeId,
    /// Unit whose prefix table interprets the reference.
    pub context: UnitId,
    /// Reference site.
    pub location: Location,
    /// Bound definition or target node.
    pub target: Option<NodeId>,
    /// Bound leaves of a `unique` statement.
    pub targets: Vec<NodeId>,
}

impl Entity {
    /// Create an unresolved entity.
    #[must_use]
    pub fn new(
        kind: EntityKind,
        reference: Reference,
        holder: NodeId,
        context: UnitId,
        location: Location,
    ) -> Self {
        Self {
            kind,
            status: ResolutionStatus::Unresolved,
            reference,
            holder,
            context,
            location,
            target: None,
            targets: Vec::new(),
        }
    }

    /// Name reference, if this is a named kind.
    #[must_use]
    pub fn name(&self) -> Option<&QName> {
        match &self.reference {
            Reference::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Path reference, if any.
    #[must_use]
    pub fn path(&self) -> Option<&SchemaPath> {
        match &self.reference {
            Reference::Path(path) => Some(path),
            _ => None,
        }
    }

    /// The reference rendered for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        use alloc::string::ToString;
        self.reference.to_string()
    }
}

/// An entity paired with its holder, as it sits on the resolution stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolutionRecord {
    /// The entity.
    pub entity: EntityId,
    /// Node that lexically contains it.
    pub holder: NodeId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;

    #[test]
    fn test_kind_order_matches_link_order() {
        let mut map = BTreeMap::new();
        for kind in EntityKind::LINK_ORDER.iter().rev() {
            map.insert(*kind, ());
        }
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, EntityKind::LINK_ORDER);
        assert!(EntityKind::Deviation < EntityKind::Unique);
    }

    #[test]
    fn test_status_classes() {
        assert!(ResolutionStatus::Undefined.is_final());
        assert!(!ResolutionStatus::IntraFileResolved.is_final());
        assert!(ResolutionStatus::InterFileLinked.is_linked());
        assert!(!ResolutionStatus::Unresolved.is_linked());
    }

    #[test]
    fn test_construct_names() {
        assert_eq!(EntityKind::DerivedType.construct(), "type");
        assert_eq!(EntityKind::IfFeature.to_string(), "feature");
        assert!(EntityKind::Base.is_named());
        assert!(!EntityKind::Leafref.is_named());
    }
}
