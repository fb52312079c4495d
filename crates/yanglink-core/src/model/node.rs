//! Schema tree nodes.

use super::ids::{EntityId, NodeId, UnitId};
use super::location::Location;
use super::types::TypeSpec;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Statement a node was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
    Choice,
    Case,
    AnyData,
    AnyXml,
    Grouping,
    Typedef,
    Identity,
    Feature,
    Rpc,
    Action,
    Input,
    Output,
    Notification,
    Augment,
    Uses,
    Deviation,
    Annotation,
}

impl NodeKind {
    /// Nodes addressable by a schema node identifier.
    #[must_use]
    pub fn is_schema_node(self) -> bool {
        matches!(
            self,
            Self::Container
                | Self::List
                | Self::Leaf
                | Self::LeafList
                | Self::Choice
                | Self::Case
                | Self::AnyData
                | Self::AnyXml
                | Self::Rpc
                | Self::Action
                | Self::Input
                | Self::Output
                | Self::Notification
        )
    }

    /// Choice and case do not appear in data paths.
    #[must_use]
    pub fn is_data_transparent(self) -> bool {
        matches!(self, Self::Choice | Self::Case)
    }

    /// Leaf or leaf-list.
    #[must_use]
    pub fn is_leaf_like(self) -> bool {
        matches!(self, Self::Leaf | Self::LeafList)
    }

    /// Definitions that are only instantiated elsewhere.
    #[must_use]
    pub fn is_template(self) -> bool {
        matches!(self, Self::Grouping | Self::Typedef)
    }

    /// Statement keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::List => "list",
            Self::Leaf => "leaf",
            Self::LeafList => "leaf-list",
            Self::Choice => "choice",
            Self::Case => "case",
            Self::AnyData => "anydata",
            Self::AnyXml => "anyxml",
            Self::Grouping => "grouping",
            Self::Typedef => "typedef",
            Self::Identity => "identity",
            Self::Feature => "feature",
            Self::Rpc => "rpc",
            Self::Action => "action",
            Self::Input => "input",
            Self::Output => "output",
            Self::Notification => "notification",
            Self::Augment => "augment",
            Self::Uses => "uses",
            Self::Deviation => "deviation",
            Self::Annotation => "annotation",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Who owns a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Owner {
    /// Root-level node of a unit.
    Unit(UnitId),
    /// Child of another node.
    Node(NodeId),
}

/// Constraint properties that deviations edit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeProperties {
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub default: Option<String>,
    pub units: Option<String>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<u32>,
    pub must: Vec<String>,
}

/// One `deviate` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Deviate {
    /// Remove the target.
    NotSupported,
    /// Add properties that must not exist yet.
    Add(NodeProperties),
    /// Delete properties that must exist with the same value.
    Delete(NodeProperties),
    /// Overwrite properties.
    Replace(NodeProperties),
}

/// A node in a schema unit's tree.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaNode {
    /// Statement kind.
    pub kind: NodeKind,
    /// Identifier (argument of the statement).
    pub name: String,
    /// Source location.
    pub location: Location,
    /// Unit the node belongs to (the use site for grouping clones).
    pub unit: UnitId,

    /// Owner, `None` while detached.
    pub owner: Option<Owner>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,

    /// `type` of a leaf, leaf-list or typedef.
    pub type_spec: Option<TypeSpec>,
    /// List keys.
    pub keys: Vec<String>,
    /// Deviable properties.
    pub properties: NodeProperties,
    /// Entities this node holds (if-feature, base, uses, augment, ...).
    pub entities: Vec<EntityId>,

    /// Augments applied to this node.
    pub augments: Vec<NodeId>,
    /// Node an augment was applied to.
    pub augment_target: Option<NodeId>,
    /// Clone roots a `uses` produced.
    pub instances: Vec<NodeId>,
    /// Identities deriving (transitively) from this one.
    pub derived_identities: Vec<NodeId>,
    /// Compiler annotations attached to this node.
    pub annotations: Vec<NodeId>,
    /// Deviate statements of a deviation.
    pub deviates: Vec<Deviate>,
    /// Node this one was cloned from.
    pub origin: Option<NodeId>,
}

impl SchemaNode {
    /// Create a detached node.
    #[must_use]
    pub fn new(kind: NodeKind, name: &str, unit: UnitId, location: Location) -> Self {
        Self {
            kind,
            name: String::from(name),
            location,
            unit,
            owner: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
            type_spec: None,
            keys: Vec::new(),
            properties: NodeProperties::default(),
            entities: Vec::new(),
            augments: Vec::new(),
            augment_target: None,
            instances: Vec::new(),
            derived_identities: Vec::new(),
            annotations: Vec::new(),
            deviates: Vec::new(),
            origin: None,
        }
    }

    /// Parent node, `None` for roots and detached nodes.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        match self.owner {
            Some(Owner::Node(parent)) => Some(parent),
            _ => None,
        }
    }

    /// Whether the node hangs in a tree.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.owner.is_some()
    }

    /// Whether a path step with `name` addresses this node.
    ///
    /// `input` and `output` match by keyword, ignoring case and declared name.
    #[must_use]
    pub fn matches_step(&self, name: &str) -> bool {
        match self.kind {
            NodeKind::Input | NodeKind::Output => self.kind.keyword().eq_ignore_ascii_case(name),
            kind => kind.is_schema_node() && self.name == name,
        }
    }
}
