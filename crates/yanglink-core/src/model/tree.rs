//! Tree surgery on the arena.
//!
//! All link updates go through here so the owner / sibling / child links
//! always describe one consistent doubly-linked list per owner.

use super::ids::{NodeId, UnitId};
use super::node::{Owner, SchemaNode};
use super::Schema;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// Original node -> clone node.
pub type CloneMap = BTreeMap<NodeId, NodeId>;

/// Iterator over an owner's children, first to last.
pub struct Children<'a> {
    schema: &'a Schema,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.schema.node(current).next_sibling;
        Some(current)
    }
}

impl Schema {
    /// Iterate an owner's children.
    #[must_use]
    pub fn children(&self, owner: Owner) -> Children<'_> {
        let next = match owner {
            Owner::Unit(unit) => self.unit(unit).first_root,
            Owner::Node(node) => self.node(node).first_child,
        };
        Children { schema: self, next }
    }

    fn first_last(&self, owner: Owner) -> (Option<NodeId>, Option<NodeId>) {
        match owner {
            Owner::Unit(unit) => {
                let u = self.unit(unit);
                (u.first_root, u.last_root)
            }
            Owner::Node(node) => {
                let n = self.node(node);
                (n.first_child, n.last_child)
            }
        }
    }

    fn set_first(&mut self, owner: Owner, first: Option<NodeId>) {
        match owner {
            Owner::Unit(unit) => self.unit_mut(unit).first_root = first,
            Owner::Node(node) => self.node_mut(node).first_child = first,
        }
    }

    fn set_last(&mut self, owner: Owner, last: Option<NodeId>) {
        match owner {
            Owner::Unit(unit) => self.unit_mut(unit).last_root = last,
            Owner::Node(node) => self.node_mut(node).last_child = last,
        }
    }

    /// Append a detached node as the owner's last child.
    ///
    /// # Panics
    ///
    /// Panics if `child` is still attached somewhere.
    pub fn append_child(&mut self, owner: Owner, child: NodeId) {
        assert!(!self.node(child).is_attached(), "{child} is still attached");
        let (first, last) = self.first_last(owner);
        {
            let node = self.node_mut(child);
            node.owner = Some(owner);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(last) => self.node_mut(last).next_sibling = Some(child),
            None => debug_assert!(first.is_none()),
        }
        if first.is_none() {
            self.set_first(owner, Some(child));
        }
        self.set_last(owner, Some(child));
    }

    /// Insert a detached node right after `anchor`, under the same owner.
    ///
    /// # Panics
    ///
    /// Panics if `anchor` is detached or `child` is attached.
    pub fn insert_after(&mut self, anchor: NodeId, child: NodeId) {
        assert!(!self.node(child).is_attached(), "{child} is still attached");
        let owner = self.node(anchor).owner.expect("anchor must be attached");
        let next = self.node(anchor).next_sibling;
        {
            let node = self.node_mut(child);
            node.owner = Some(owner);
            node.prev_sibling = Some(anchor);
            node.next_sibling = next;
        }
        self.node_mut(anchor).next_sibling = Some(child);
        match next {
            Some(next) => self.node_mut(next).prev_sibling = Some(child),
            None => self.set_last(owner, Some(child)),
        }
    }

    /// Unlink a node from its owner, splicing its neighbours together.
    ///
    /// The node keeps its own children. Detaching a detached node is a no-op.
    pub fn detach(&mut self, node: NodeId) {
        let (owner, prev, next) = {
            let n = self.node(node);
            match n.owner {
                Some(owner) => (owner, n.prev_sibling, n.next_sibling),
                None => return,
            }
        };
        match prev {
            Some(prev) => self.node_mut(prev).next_sibling = next,
            None => self.set_first(owner, next),
        }
        match next {
            Some(next) => self.node_mut(next).prev_sibling = prev,
            None => self.set_last(owner, prev),
        }
        let n = self.node_mut(node);
        n.owner = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    /// Deep-copy the subtree at `root` into fresh nodes owned by `unit`.
    ///
    /// The copy comes back detached. Subtrees whose root satisfies `skip` are
    /// left out. Field values are copied verbatim (entity ids included); the
    /// returned map lets callers rewrite whatever must point into the clone.
    pub fn deep_clone(
        &mut self,
        root: NodeId,
        unit: UnitId,
        skip: &dyn Fn(&SchemaNode) -> bool,
    ) -> (NodeId, CloneMap) {
        let mut map = CloneMap::new();
        let new_root = self.clone_one(root, unit, &mut map);
        // (original, clone) pairs whose children still need copying.
        let mut stack = alloc::vec![(root, new_root)];
        while let Some((original, copy)) = stack.pop() {
            let kids: Vec<NodeId> = self.children(Owner::Node(original)).collect();
            for kid in kids {
                if skip(self.node(kid)) {
                    continue;
                }
                let kid_copy = self.clone_one(kid, unit, &mut map);
                self.append_child(Owner::Node(copy), kid_copy);
                stack.push((kid, kid_copy));
            }
        }
        (new_root, map)
    }

    fn clone_one(&mut self, original: NodeId, unit: UnitId, map: &mut CloneMap) -> NodeId {
        let mut node = self.node(original).clone();
        node.unit = unit;
        node.owner = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        node.first_child = None;
        node.last_child = None;
        node.origin = Some(original);
        let id = self.push_node(node);
        map.insert(original, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, NodeKind};

    fn setup() -> (Schema, UnitId, NodeId) {
        let mut schema = Schema::new();
        let m = schema.add_module("m", "urn:m", "m", "m.yang");
        let c = schema.add_node(Owner::Unit(m), NodeKind::Container, "c", Location::default());
        for name in ["a", "b", "c"] {
            schema.add_node(Owner::Node(c), NodeKind::Leaf, name, Location::default());
        }
        (schema, m, c)
    }

    fn names(schema: &Schema, owner: Owner) -> Vec<&str> {
        schema.children(owner).map(|c| schema.node(c).name.as_str()).collect()
    }

    fn check_links(schema: &Schema, owner: Owner) {
        let kids: Vec<_> = schema.children(owner).collect();
        for (i, &kid) in kids.iter().enumerate() {
            let n = schema.node(kid);
            assert_eq!(n.owner, Some(owner));
            assert_eq!(n.prev_sibling, i.checked_sub(1).map(|p| kids[p]));
            assert_eq!(n.next_sibling, kids.get(i + 1).copied());
        }
    }

    #[test]
    fn test_detach_middle_splices_neighbours() {
        let (mut schema, _, c) = setup();
        let b = schema.child_by_name(Owner::Node(c), "b").unwrap();
        schema.detach(b);
        assert_eq!(names(&schema, Owner::Node(c)), ["a", "c"]);
        check_links(&schema, Owner::Node(c));
        let n = schema.node(b);
        assert!(n.owner.is_none() && n.prev_sibling.is_none() && n.next_sibling.is_none());
    }

    #[test]
    fn test_detach_ends_and_reattach() {
        let (mut schema, _, c) = setup();
        let a = schema.child_by_name(Owner::Node(c), "a").unwrap();
        let last = schema.child_by_name(Owner::Node(c), "c").unwrap();
        schema.detach(a);
        schema.detach(last);
        assert_eq!(names(&schema, Owner::Node(c)), ["b"]);
        schema.append_child(Owner::Node(c), a);
        let b = schema.child_by_name(Owner::Node(c), "b").unwrap();
        schema.insert_after(b, last);
        assert_eq!(names(&schema, Owner::Node(c)), ["b", "c", "a"]);
        check_links(&schema, Owner::Node(c));
    }

    #[test]
    fn test_deep_clone_copies_structure() {
        let (mut schema, m, c) = setup();
        let (copy, map) = schema.deep_clone(c, m, &|n| n.name == "b");
        assert!(!schema.node(copy).is_attached());
        assert_eq!(names(&schema, Owner::Node(copy)), ["a", "c"]);
        check_links(&schema, Owner::Node(copy));
        assert_eq!(map.len(), 3);
        assert_eq!(schema.node(map[&c]).origin, Some(c));
        // The original is untouched.
        assert_eq!(names(&schema, Owner::Node(c)), ["a", "b", "c"]);
    }
}
