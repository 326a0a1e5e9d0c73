//! Mounted tree - the live element tree retained between passes.
//!
//! After each pass the node description tree and the live element tree are
//! structurally congruent: same shape, same keys at the same positions.
//! `MountedNode` is that merged view: the latest description for one node,
//! the element handle backing it, its committed frame, and its coordinator
//! binding.

use rustc_hash::FxHashMap;

use crate::engine::element::ElementId;
use crate::engine::registry::CoordinatorBinding;
use crate::node::Node;
use crate::types::{ElementType, Rect, Size};

/// One node of the merged node/element tree.
pub struct MountedNode {
    /// Latest description for this node. Children live in `children`
    /// below, not in the description, to avoid duplicating subtrees.
    pub(crate) node: Node,
    pub(crate) element: ElementId,
    /// Committed frame, relative to the parent element.
    pub(crate) frame: Rect,
    pub(crate) binding: Option<CoordinatorBinding>,
    pub(crate) children: Vec<MountedNode>,
}

impl MountedNode {
    pub fn element_type(&self) -> ElementType {
        self.node.element_type
    }

    pub fn key(&self) -> Option<&str> {
        self.node.key.as_deref()
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn children(&self) -> &[MountedNode] {
        &self.children
    }

    /// Depth-first traversal, parents before children.
    pub(crate) fn for_each(&self, f: &mut impl FnMut(&MountedNode)) {
        f(self);
        for child in &self.children {
            child.for_each(f);
        }
    }

    /// Committed sizes of every keyed node in this subtree.
    pub(crate) fn collect_keyed_sizes(&self, out: &mut FxHashMap<String, Size>) {
        self.for_each(&mut |mounted| {
            if let Some(key) = mounted.key() {
                out.insert(key.to_string(), mounted.frame.size);
            }
        });
    }

    /// Reconstruct the full description tree, children included. Used to
    /// re-run a coalesced pass over the retained tree.
    pub(crate) fn to_node(&self) -> Node {
        let mut node = self.node.clone();
        node.children = self
            .children
            .iter()
            .map(MountedNode::to_node)
            .collect::<Vec<Node>>();
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::node;

    fn leaf(key: &str, size: Size) -> MountedNode {
        MountedNode {
            node: node("label").with_key(key).build().unwrap(),
            element: ElementId(0),
            frame: Rect {
                origin: crate::types::Point::ZERO,
                size,
            },
            binding: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_collect_keyed_sizes() {
        let mut root = leaf("root", Size::new(100.0, 50.0));
        root.children.push(leaf("a", Size::new(10.0, 10.0)));
        root.children.push(MountedNode {
            node: node("label").build().unwrap(),
            element: ElementId(1),
            frame: Rect::new(0.0, 0.0, 5.0, 5.0),
            binding: None,
            children: Vec::new(),
        });

        let mut sizes = FxHashMap::default();
        root.collect_keyed_sizes(&mut sizes);
        assert_eq!(sizes.len(), 2, "unkeyed nodes have no stable identity");
        assert_eq!(sizes["a"], Size::new(10.0, 10.0));
    }

    #[test]
    fn test_to_node_rebuilds_children() {
        let mut root = leaf("root", Size::ZERO);
        root.children.push(leaf("a", Size::ZERO));
        root.children.push(leaf("b", Size::ZERO));

        let rebuilt = root.to_node();
        assert_eq!(rebuilt.children().len(), 2);
        assert_eq!(rebuilt.children()[1].key(), Some("b"));
    }
}
