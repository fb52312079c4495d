//! Qualified names and type specifications.

use super::ids::EntityId;
use super::path::SchemaPath;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// An optionally prefixed identifier, e.g. `if:interface-ref`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QName {
    /// Module prefix, if written.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
}

impl QName {
    /// Create a qualified name.
    #[must_use]
    pub fn new(prefix: Option<&str>, name: &str) -> Self {
        Self {
            prefix: prefix.map(String::from),
            name: String::from(name),
        }
    }

    /// Create an unprefixed name.
    #[must_use]
    pub fn local(name: &str) -> Self {
        Self::new(None, name)
    }

    /// Split `prefix:name` at the first colon.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((prefix, name)) => Self::new(Some(prefix.trim()), name.trim()),
            None => Self::local(text.trim()),
        }
    }

    /// The prefix as a string slice.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// YANG built-in types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BuiltinType {
    Binary,
    Bits,
    Boolean,
    Decimal64,
    Empty,
    Enumeration,
    IdentityRef,
    InstanceIdentifier,
    Int8,
    Int16,
    Int32,
    Int64,
    Leafref,
    String,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Union,
}

impl BuiltinType {
    const ALL: [BuiltinType; 19] = [
        Self::Binary,
        Self::Bits,
        Self::Boolean,
        Self::Decimal64,
        Self::Empty,
        Self::Enumeration,
        Self::IdentityRef,
        Self::InstanceIdentifier,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Leafref,
        Self::String,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Union,
    ];

    /// Keyword used in source text.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Bits => "bits",
            Self::Boolean => "boolean",
            Self::Decimal64 => "decimal64",
            Self::Empty => "empty",
            Self::Enumeration => "enumeration",
            Self::IdentityRef => "identityref",
            Self::InstanceIdentifier => "instance-identifier",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Leafref => "leafref",
            Self::String => "string",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Union => "union",
        }
    }

    /// Look up a built-in by keyword.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `type` statement of a leaf, leaf-list or typedef.
///
/// Built-in types resolve immediately. Everything else gets an entity when
/// the type is attached through [`Schema::set_type`](super::Schema::set_type):
/// a derived type, a leafref path, an identityref base or a union.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeSpec {
    /// Name as written.
    pub name: QName,
    /// Set when `name` is an unprefixed built-in keyword.
    pub builtin: Option<BuiltinType>,
    /// Entity registered for this type, if it needs resolving.
    pub entity: Option<EntityId>,
    /// Leafref path.
    pub path: Option<SchemaPath>,
    /// Identityref base.
    pub base: Option<QName>,
    /// Union member types.
    pub members: Vec<TypeSpec>,
    /// Leafref or identityref re-queued at this holder through a typedef chain.
    pub effective: Option<EntityId>,
}

impl TypeSpec {
    /// A built-in or derived type by name.
    #[must_use]
    pub fn named(text: &str) -> Self {
        let name = QName::parse(text);
        let builtin = match name.prefix {
            None => BuiltinType::from_name(&name.name),
            Some(_) => None,
        };
        Self {
            name,
            builtin,
            entity: None,
            path: None,
            base: None,
            members: Vec::new(),
            effective: None,
        }
    }

    /// `type leafref { path ...; }`
    #[must_use]
    pub fn leafref(path: SchemaPath) -> Self {
        Self {
            path: Some(path),
            ..Self::named("leafref")
        }
    }

    /// `type identityref { base ...; }`
    #[must_use]
    pub fn identityref(base: &str) -> Self {
        Self {
            base: Some(QName::parse(base)),
            ..Self::named("identityref")
        }
    }

    /// `type union { ... }`
    #[must_use]
    pub fn union(members: Vec<TypeSpec>) -> Self {
        Self {
            members,
            ..Self::named("union")
        }
    }

    /// Whether this spec names a typedef rather than a built-in.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        self.builtin.is_none()
    }

    /// Find the (possibly nested union member) spec that owns `entity`.
    #[must_use]
    pub fn find(&self, entity: EntityId) -> Option<&TypeSpec> {
        if self.entity == Some(entity) || self.effective == Some(entity) {
            return Some(self);
        }
        self.members.iter().find_map(|m| m.find(entity))
    }

    /// Mutable counterpart of [`find`](Self::find).
    pub fn find_mut(&mut self, entity: EntityId) -> Option<&mut TypeSpec> {
        if self.entity == Some(entity) || self.effective == Some(entity) {
            return Some(self);
        }
        self.members.iter_mut().find_map(|m| m.find_mut(entity))
    }

    /// Visit this spec and every nested member, outermost first.
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut TypeSpec)) {
        visit_inner(self, f);
    }

    /// Entities registered for this spec and its members.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack: Vec<&TypeSpec> = alloc::vec![self];
        while let Some(spec) = stack.pop() {
            out.extend(spec.entity);
            out.extend(spec.effective);
            stack.extend(spec.members.iter().rev());
        }
        out
    }
}

fn visit_inner(spec: &mut TypeSpec, f: &mut dyn FnMut(&mut TypeSpec)) {
    f(spec);
    for member in &mut spec.members {
        visit_inner(member, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_parse() {
        let q = QName::parse("if:interface-ref");
        assert_eq!(q.prefix(), Some("if"));
        assert_eq!(q.name, "interface-ref");
        assert_eq!(QName::parse("name").prefix(), None);
    }

    #[test]
    fn test_builtin_detection() {
        assert_eq!(TypeSpec::named("string").builtin, Some(BuiltinType::String));
        assert!(TypeSpec::named("t1").is_derived());
        // A prefixed name is never a built-in, even if the local part matches one.
        assert!(TypeSpec::named("x:string").is_derived());
    }

    #[test]
    fn test_union_members_are_visited() {
        let mut spec = TypeSpec::union(alloc::vec![
            TypeSpec::named("int8"),
            TypeSpec::named("t"),
        ]);
        let mut names = Vec::new();
        spec.visit_mut(&mut |s| names.push(s.name.name.clone()));
        assert_eq!(names, ["union", "int8", "t"]);
    }
}
