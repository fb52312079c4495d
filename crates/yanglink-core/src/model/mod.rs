//! Schema data model.
//!
//! Every unit, node and entity lives in one arena, the [`Schema`], and is
//! addressed by a stable id. The parser (upstream of this crate) fills the
//! arena through the construction API in [`build`]; the linker then mutates
//! it in place; the emission stage reads the result.
//!
//! ```text
//! Parser → [Schema] → Linker → [Schema, resolved] → Emitter
//! ```
//!
//! Trees are doubly linked: each node records its owner, its previous and
//! next sibling and its first and last child. [`tree`] keeps those links
//! consistent across attach, detach and deep clone.

mod build;
mod entity;
mod ids;
mod location;
mod node;
mod path;
pub mod tree;
mod types;
mod unit;

pub use entity::{Entity, EntityKind, Reference, ResolutionRecord, ResolutionStatus};
pub use ids::{EntityId, NodeId, UnitId};
pub use location::Location;
pub use node::{Deviate, NodeKind, NodeProperties, Owner, SchemaNode};
pub use path::{check_identifier, validate_qname, PathPredicate, PathStep, SchemaPath};
pub use tree::{Children, CloneMap};
pub use types::{BuiltinType, QName, TypeSpec};
pub use unit::{Import, Include, SchemaUnit, UnitKind};

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// Arena of schema units, nodes and entities.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema {
    units: Vec<SchemaUnit>,
    nodes: Vec<SchemaNode>,
    entities: Vec<Entity>,
    /// original -> clone node maps, keyed by the original unit.
    deviation_maps: BTreeMap<UnitId, CloneMap>,
}

impl Schema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Units ===

    pub(crate) fn push_unit(&mut self, make: impl FnOnce(UnitId) -> SchemaUnit) -> UnitId {
        let id = UnitId::from_index(self.units.len()).expect("unit arena exhausted");
        self.units.push(make(id));
        id
    }

    /// Get a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> &SchemaUnit {
        &self.units[id.to_index()]
    }

    /// Get a unit mutably.
    pub fn unit_mut(&mut self, id: UnitId) -> &mut SchemaUnit {
        &mut self.units[id.to_index()]
    }

    /// Get a unit if the id belongs to this schema.
    #[must_use]
    pub fn get_unit(&self, id: UnitId) -> Option<&SchemaUnit> {
        self.units.get(id.to_index())
    }

    /// All units, clones included.
    pub fn units(&self) -> impl Iterator<Item = &SchemaUnit> {
        self.units.iter()
    }

    /// Ids of units that came from source files (no deviation clones).
    #[must_use]
    pub fn source_unit_ids(&self) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| !u.is_clone())
            .map(|u| u.id)
            .collect()
    }

    /// Number of units, clones included.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Find a source unit by name.
    #[must_use]
    pub fn find_unit(&self, name: &str) -> Option<UnitId> {
        self.units
            .iter()
            .find(|u| !u.is_clone() && u.name == name)
            .map(|u| u.id)
    }

    /// The module a unit belongs to: itself, or a submodule's parent.
    #[must_use]
    pub fn module_of(&self, unit: UnitId) -> UnitId {
        let u = self.unit(unit);
        let u = match u.clone_of {
            Some(original) => self.unit(original),
            None => u,
        };
        match u.parent_module {
            Some(parent) if u.is_submodule() => parent,
            _ => u.id,
        }
    }

    /// Namespace a unit's nodes live in.
    #[must_use]
    pub fn namespace_of(&self, unit: UnitId) -> Option<&str> {
        self.unit(self.module_of(unit)).namespace.as_deref()
    }

    /// Deviation clone of `unit`, if a deviation touched it.
    #[must_use]
    pub fn deviated(&self, unit: UnitId) -> Option<UnitId> {
        self.unit(unit).deviation_clone
    }

    /// Clone of `node` inside its unit's deviation clone.
    #[must_use]
    pub fn deviated_node(&self, node: NodeId) -> Option<NodeId> {
        let unit = self.node(node).unit;
        self.deviation_maps.get(&unit)?.get(&node).copied()
    }

    pub(crate) fn set_deviation_map(&mut self, unit: UnitId, map: CloneMap) {
        self.deviation_maps.insert(unit, map);
    }

    // === Nodes ===

    pub(crate) fn push_node(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId::from_index(self.nodes.len()).expect("node arena exhausted");
        self.nodes.push(node);
        id
    }

    /// Get a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.to_index()]
    }

    /// Get a node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.to_index()]
    }

    /// Get a node if the id belongs to this schema.
    #[must_use]
    pub fn get_node(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.to_index())
    }

    /// Number of nodes ever created (detached ones included).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Root nodes of a unit.
    #[must_use]
    pub fn roots(&self, unit: UnitId) -> Children<'_> {
        self.children(Owner::Unit(unit))
    }

    /// Child named `name` of an owner (any kind).
    #[must_use]
    pub fn child_by_name(&self, owner: Owner, name: &str) -> Option<NodeId> {
        self.children(owner).find(|&c| self.node(c).name == name)
    }

    /// Find a node by slash-separated names from a unit root, e.g. `c/x`.
    ///
    /// Plain name matching with no prefixes or augments; meant for callers
    /// inspecting a tree they built.
    #[must_use]
    pub fn find_node(&self, unit: UnitId, names: &str) -> Option<NodeId> {
        let mut owner = Owner::Unit(unit);
        let mut found = None;
        for name in names.split('/') {
            let id = self.child_by_name(owner, name)?;
            owner = Owner::Node(id);
            found = Some(id);
        }
        found
    }

    /// Ancestors from the parent upwards, stopping at the unit root.
    #[must_use]
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(node).parent();
        while let Some(id) = current {
            out.push(id);
            current = self.node(id).parent();
        }
        out
    }

    /// Whether `node` sits below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(node).contains(&ancestor)
    }

    /// Whether `node` sits inside a grouping or typedef definition.
    #[must_use]
    pub fn in_template(&self, node: NodeId) -> bool {
        self.node(node).kind.is_template()
            || self
                .ancestors(node)
                .iter()
                .any(|&a| self.node(a).kind.is_template())
    }

    // === Entities ===

    pub(crate) fn push_entity(&mut self, entity: Entity) -> EntityId {
        let id = EntityId::from_index(self.entities.len()).expect("entity arena exhausted");
        self.entities.push(entity);
        id
    }

    /// Get an entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.to_index()]
    }

    /// Get an entity mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.to_index()]
    }

    /// All entities with their ids.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .filter_map(|(idx, e)| EntityId::from_index(idx).map(|id| (id, e)))
    }

    /// Queue an entity on its holder's unit.
    ///
    /// The only way entities enter a pending list, so per-kind ordering is
    /// decided here and nowhere else.
    pub fn register_pending(&mut self, entity: Entity) -> EntityId {
        let unit = self.node(entity.holder).unit;
        let kind = entity.kind;
        let id = self.push_entity(entity);
        self.unit_mut(unit).pending.entry(kind).or_default().push(id);
        id
    }

    /// Built-in type a leaf, leaf-list or typedef ends up with.
    ///
    /// Follows resolved typedef chains; `None` while a link is missing.
    #[must_use]
    pub fn effective_builtin(&self, node: NodeId) -> Option<BuiltinType> {
        let mut spec = self.node(node).type_spec.as_ref()?;
        for _ in 0..=self.nodes.len() {
            if let Some(builtin) = spec.builtin {
                return Some(builtin);
            }
            let typedef = self.entity(spec.entity?).target?;
            spec = self.node(typedef).type_spec.as_ref()?;
        }
        None
    }
}
