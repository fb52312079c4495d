//! Construction API used by the parser to hand over per-file trees.
//!
//! Every reference the parser sees becomes a pending [`Entity`] through
//! [`Schema::register_pending`]; nothing here resolves anything.

use super::entity::{Entity, EntityKind, Reference};
use super::ids::{EntityId, NodeId, UnitId};
use super::location::Location;
use super::node::{Deviate, NodeKind, Owner, SchemaNode};
use super::path::SchemaPath;
use super::types::{QName, TypeSpec};
use super::unit::{Import, Include, SchemaUnit, UnitKind};
use super::Schema;
use alloc::string::String;
use alloc::vec::Vec;

impl Schema {
    /// Add a module.
    pub fn add_module(&mut self, name: &str, namespace: &str, prefix: &str, file: &str) -> UnitId {
        self.push_unit(|id| {
            let mut unit = SchemaUnit::new(id, UnitKind::Module, name, prefix, file);
            unit.namespace = Some(String::from(namespace));
            unit
        })
    }

    /// Add a submodule. `prefix` is the prefix from its belongs-to statement.
    pub fn add_submodule(&mut self, name: &str, belongs_to: &str, prefix: &str, file: &str) -> UnitId {
        self.push_unit(|id| {
            let mut unit = SchemaUnit::new(id, UnitKind::Submodule, name, prefix, file);
            unit.belongs_to = Some(String::from(belongs_to));
            unit
        })
    }

    /// Set a unit's revision date.
    pub fn set_revision(&mut self, unit: UnitId, revision: &str) {
        self.unit_mut(unit).revision = Some(String::from(revision));
    }

    /// Record an import.
    pub fn add_import(&mut self, unit: UnitId, import: Import) {
        self.unit_mut(unit).imports.push(import);
    }

    /// Record an include.
    pub fn add_include(&mut self, unit: UnitId, include: Include) {
        self.unit_mut(unit).includes.push(include);
    }

    /// Create a node and append it to `owner`.
    pub fn add_node(&mut self, owner: Owner, kind: NodeKind, name: &str, location: Location) -> NodeId {
        let unit = self.owner_unit(owner);
        let id = self.push_node(SchemaNode::new(kind, name, unit, location));
        self.append_child(owner, id);
        id
    }

    /// Add a key leaf name to a list.
    pub fn add_key(&mut self, list: NodeId, key: &str) {
        self.node_mut(list).keys.push(String::from(key));
    }

    /// Attach a `type` to a leaf, leaf-list or typedef and queue what it references.
    ///
    /// Returns the entities created, outermost first.
    pub fn set_type(&mut self, holder: NodeId, spec: TypeSpec) -> Vec<EntityId> {
        let location = self.node(holder).location.clone();
        self.set_type_at(holder, spec, &location)
    }

    /// [`set_type`](Self::set_type) with an explicit location for the `type` statement.
    pub fn set_type_at(&mut self, holder: NodeId, mut spec: TypeSpec, location: &Location) -> Vec<EntityId> {
        let context = self.node(holder).unit;
        let mut created = Vec::new();
        self.register_type_entities(&mut spec, holder, context, location, &mut created);
        self.node_mut(holder).type_spec = Some(spec);
        created
    }

    pub(crate) fn register_type_entities(
        &mut self,
        spec: &mut TypeSpec,
        holder: NodeId,
        context: UnitId,
        location: &Location,
        created: &mut Vec<EntityId>,
    ) {
        let entity = type_entity(spec, holder, context, location);
        if let Some(entity) = entity {
            let id = self.register_pending(entity);
            spec.entity = Some(id);
            created.push(id);
        }
        for member in &mut spec.members {
            self.register_type_entities(member, holder, context, location, created);
        }
    }

    /// Add a `uses` statement.
    pub fn add_uses(&mut self, owner: Owner, grouping: &str, location: Location) -> NodeId {
        let uses = self.add_node(owner, NodeKind::Uses, grouping, location.clone());
        self.hold(uses, EntityKind::Uses, Reference::Name(QName::parse(grouping)), location);
        uses
    }

    /// Add an `if-feature` to a node.
    pub fn add_if_feature(&mut self, node: NodeId, feature: &str, location: Location) -> EntityId {
        self.hold(node, EntityKind::IfFeature, Reference::Name(QName::parse(feature)), location)
    }

    /// Add a `base` to an identity.
    pub fn add_base(&mut self, identity: NodeId, base: &str, location: Location) -> EntityId {
        self.hold(identity, EntityKind::Base, Reference::Name(QName::parse(base)), location)
    }

    /// Add an `augment`. Under a `uses` it becomes a uses-augment.
    pub fn add_augment(&mut self, owner: Owner, path: SchemaPath, location: Location) -> NodeId {
        let kind = match owner {
            Owner::Node(parent) if self.node(parent).kind == NodeKind::Uses => EntityKind::UsesAugment,
            _ => EntityKind::Augment,
        };
        let name = alloc::format!("{path}");
        let augment = self.add_node(owner, NodeKind::Augment, &name, location.clone());
        self.hold(augment, kind, Reference::Path(path), location);
        augment
    }

    /// Add a top-level `deviation`.
    pub fn add_deviation(
        &mut self,
        unit: UnitId,
        path: SchemaPath,
        deviates: Vec<Deviate>,
        location: Location,
    ) -> NodeId {
        let name = alloc::format!("{path}");
        let deviation = self.add_node(Owner::Unit(unit), NodeKind::Deviation, &name, location.clone());
        self.node_mut(deviation).deviates = deviates;
        self.hold(deviation, EntityKind::Deviation, Reference::Path(path), location);
        deviation
    }

    /// Add a compiler annotation targeting `path`.
    pub fn add_annotation(&mut self, unit: UnitId, name: &str, path: SchemaPath, location: Location) -> NodeId {
        let annotation = self.add_node(Owner::Unit(unit), NodeKind::Annotation, name, location.clone());
        self.hold(annotation, EntityKind::CompilerAnnotation, Reference::Path(path), location);
        annotation
    }

    /// Add a `unique` statement to a list.
    pub fn add_unique(&mut self, list: NodeId, paths: Vec<SchemaPath>, location: Location) -> EntityId {
        self.hold(list, EntityKind::Unique, Reference::Paths(paths), location)
    }

    fn hold(&mut self, holder: NodeId, kind: EntityKind, reference: Reference, location: Location) -> EntityId {
        let context = self.node(holder).unit;
        let id = self.register_pending(Entity::new(kind, reference, holder, context, location));
        self.node_mut(holder).entities.push(id);
        id
    }

    fn owner_unit(&self, owner: Owner) -> UnitId {
        match owner {
            Owner::Unit(unit) => unit,
            Owner::Node(node) => self.node(node).unit,
        }
    }
}

/// Entity a type spec needs, if any.
fn type_entity(spec: &TypeSpec, holder: NodeId, context: UnitId, location: &Location) -> Option<Entity> {
    use super::types::BuiltinType;
    let (kind, reference) = match spec.builtin {
        None => (EntityKind::DerivedType, Reference::Name(spec.name.clone())),
        Some(BuiltinType::Leafref) => (EntityKind::Leafref, Reference::Path(spec.path.clone()?)),
        Some(BuiltinType::IdentityRef) => (EntityKind::IdentityRef, Reference::Name(spec.base.clone()?)),
        Some(BuiltinType::Union) if spec.members.iter().any(needs_entity) => (EntityKind::Union, Reference::None),
        Some(_) => return None,
    };
    Some(Entity::new(kind, reference, holder, context, location.clone()))
}

fn needs_entity(spec: &TypeSpec) -> bool {
    use super::types::BuiltinType;
    match spec.builtin {
        None | Some(BuiltinType::Leafref | BuiltinType::IdentityRef) => true,
        Some(BuiltinType::Union) => spec.members.iter().any(needs_entity),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResolutionStatus;

    fn loc() -> Location {
        Location::new("m.yang", 4, 2)
    }

    #[test]
    fn test_union_registers_members() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let leaf = schema.add_node(Owner::Unit(m), NodeKind::Leaf, "x", loc());
        let created = schema.set_type(
            leaf,
            TypeSpec::union(alloc::vec![TypeSpec::named("int8"), TypeSpec::named("t")]),
        );
        assert_eq!(created.len(), 2);
        assert_eq!(schema.entity(created[0]).kind, EntityKind::Union);
        assert_eq!(schema.entity(created[1]).kind, EntityKind::DerivedType);
        assert_eq!(schema.entity(created[1]).status, ResolutionStatus::Unresolved);
    }

    #[test]
    fn test_builtin_needs_nothing() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let leaf = schema.add_node(Owner::Unit(m), NodeKind::Leaf, "x", loc());
        assert!(schema.set_type(leaf, TypeSpec::named("string")).is_empty());
        let union = schema.add_node(Owner::Unit(m), NodeKind::Leaf, "y", loc());
        let plain = TypeSpec::union(alloc::vec![TypeSpec::named("int8"), TypeSpec::named("string")]);
        assert!(schema.set_type(union, plain).is_empty());
    }

    #[test]
    fn test_augment_under_uses_is_uses_augment() {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let uses = schema.add_uses(Owner::Unit(m), "g", loc());
        let path = SchemaPath::parse("c", &loc()).unwrap();
        let augment = schema.add_augment(Owner::Node(uses), path, loc());
        let entity = schema.node(augment).entities[0];
        assert_eq!(schema.entity(entity).kind, EntityKind::UsesAugment);
        assert_eq!(schema.unit(m).pending(EntityKind::UsesAugment), [entity]);
    }
}
