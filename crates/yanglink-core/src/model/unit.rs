//! Schema units (modules and submodules) and their import/include records.

use super::entity::EntityKind;
use super::ids::{EntityId, NodeId, UnitId};
use super::location::Location;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Module or submodule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitKind {
    Module,
    Submodule,
}

/// An `import` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Import {
    /// Imported module name.
    pub module: String,
    /// Local prefix for the module.
    pub prefix: String,
    /// Requested revision.
    pub revision: Option<String>,
    /// Bound unit, once registration has run.
    pub target: Option<UnitId>,
    /// Statement location.
    pub location: Location,
}

impl Import {
    /// Create an unbound import.
    #[must_use]
    pub fn new(module: &str, prefix: &str, location: Location) -> Self {
        Self {
            module: String::from(module),
            prefix: String::from(prefix),
            revision: None,
            target: None,
            location,
        }
    }

    /// Request a specific revision.
    #[must_use]
    pub fn with_revision(mut self, revision: &str) -> Self {
        self.revision = Some(String::from(revision));
        self
    }
}

/// An `include` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Include {
    /// Included submodule name.
    pub submodule: String,
    /// Requested revision.
    pub revision: Option<String>,
    /// Bound unit, once registration has run.
    pub target: Option<UnitId>,
    /// Statement location.
    pub location: Location,
}

impl Include {
    /// Create an unbound include.
    #[must_use]
    pub fn new(submodule: &str, location: Location) -> Self {
        Self {
            submodule: String::from(submodule),
            revision: None,
            target: None,
            location,
        }
    }
}

/// One parsed source file.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaUnit {
    /// Unit identifier.
    pub id: UnitId,
    /// Module or submodule.
    pub kind: UnitKind,
    /// Unit name.
    pub name: String,
    /// Namespace URI (modules only; submodules share their parent's).
    pub namespace: Option<String>,
    /// Own prefix (a submodule uses its belongs-to prefix).
    pub prefix: String,
    /// Latest revision date.
    pub revision: Option<String>,
    /// Parent module name of a submodule.
    pub belongs_to: Option<String>,
    /// Bound parent module of a submodule.
    pub parent_module: Option<UnitId>,
    /// Source file.
    pub file: String,
    /// Imports in source order.
    pub imports: Vec<Import>,
    /// Includes in source order.
    pub includes: Vec<Include>,
    /// Link order key: strictly greater than every importer's.
    pub priority: u32,
    /// First root node.
    pub first_root: Option<NodeId>,
    /// Last root node.
    pub last_root: Option<NodeId>,
    /// Pending references by kind.
    pub pending: BTreeMap<EntityKind, Vec<EntityId>>,
    /// Deviation clone of this unit, set on first deviation touch.
    pub deviation_clone: Option<UnitId>,
    /// Original unit, if this is a deviation clone.
    pub clone_of: Option<UnitId>,
}

impl SchemaUnit {
    /// Create an empty unit. The id is assigned by the schema.
    #[must_use]
    pub fn new(id: UnitId, kind: UnitKind, name: &str, prefix: &str, file: &str) -> Self {
        Self {
            id,
            kind,
            name: String::from(name),
            namespace: None,
            prefix: String::from(prefix),
            revision: None,
            belongs_to: None,
            parent_module: None,
            file: String::from(file),
            imports: Vec::new(),
            includes: Vec::new(),
            priority: 0,
            first_root: None,
            last_root: None,
            pending: BTreeMap::new(),
            deviation_clone: None,
            clone_of: None,
        }
    }

    /// Whether this is a submodule.
    #[must_use]
    pub fn is_submodule(&self) -> bool {
        self.kind == UnitKind::Submodule
    }

    /// Whether this unit is a deviation clone.
    #[must_use]
    pub fn is_clone(&self) -> bool {
        self.clone_of.is_some()
    }

    /// Import bound to `prefix`.
    #[must_use]
    pub fn import_by_prefix(&self, prefix: &str) -> Option<&Import> {
        self.imports.iter().find(|i| i.prefix == prefix)
    }

    /// Import and include targets, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.imports
            .iter()
            .filter_map(|i| i.target)
            .chain(self.includes.iter().filter_map(|i| i.target))
    }

    /// Pending entities of one kind.
    #[must_use]
    pub fn pending(&self, kind: EntityKind) -> &[EntityId] {
        self.pending.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Location of the unit header.
    #[must_use]
    pub fn location(&self) -> Location {
        Location::new(&self.file, 1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> SchemaUnit {
        SchemaUnit::new(UnitId::from_raw(1).unwrap(), UnitKind::Module, "m", "m", "m.yang")
    }

    #[test]
    fn test_import_by_prefix() {
        let mut m = unit();
        m.imports.push(Import::new("ietf-inet-types", "inet", Location::default()));
        assert_eq!(m.import_by_prefix("inet").unwrap().module, "ietf-inet-types");
        assert!(m.import_by_prefix("yang").is_none());
    }

    #[test]
    fn test_dependencies_skip_unbound() {
        let mut m = unit();
        let mut import = Import::new("a", "a", Location::default());
        import.target = UnitId::from_raw(2);
        m.imports.push(import);
        m.includes.push(Include::new("m-sub", Location::default()));
        let deps: Vec<_> = m.dependencies().collect();
        assert_eq!(deps, [UnitId::from_raw(2).unwrap()]);
    }

    #[test]
    fn test_pending_defaults_to_empty() {
        assert!(unit().pending(EntityKind::Uses).is_empty());
    }
}
