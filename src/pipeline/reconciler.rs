//! Reconciler - diffs a node description tree against the mounted tree.
//!
//! Matching rules per sibling list:
//! - A keyed node matches the previous sibling with the same key and the
//!   same element type, wherever it sat in the old list.
//! - An unkeyed node matches the previous unkeyed sibling at the same
//!   position with the same element type.
//! - Everything else is a create; unmatched previous siblings are
//!   destroyed, children first.
//!
//! Duplicate keys within one sibling list are a description bug: the first
//! occurrence wins the match, later ones are logged and mounted fresh so
//! the pass stays deterministic.

use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::engine::element::{ElementHost, ElementId};
use crate::engine::registry::CoordinatorRegistry;
use crate::engine::tree::MountedNode;
use crate::error::ReconcileError;
use crate::node::Node;
use crate::types::Rect;

bitflags! {
    /// What a reconciliation pass did to the element tree.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChangeFlags: u8 {
        /// At least one element was created.
        const CREATED = 1 << 0;
        /// At least one element was destroyed.
        const DESTROYED = 1 << 1;
        /// At least one sibling list changed order.
        const REORDERED = 1 << 2;
        /// Props or layout style changed on a surviving element.
        const CONTENT = 1 << 3;

        /// Changes that alter the shape of the tree as seen from outside.
        const STRUCTURAL = Self::CREATED.bits() | Self::DESTROYED.bits() | Self::REORDERED.bits();
    }
}

/// Result of one diff: the new mounted tree plus what changed.
pub(crate) struct ReconcileOutcome {
    pub(crate) root: MountedNode,
    pub(crate) flags: ChangeFlags,
    pub(crate) created: usize,
    pub(crate) destroyed: usize,
    pub(crate) updated: usize,
}

/// Check a description tree before any mutation happens.
///
/// A stateful coordinator or a custom view initializer without a usable
/// key would make the node untrackable across passes, so the whole pass
/// is refused up front and the mounted tree stays as it was.
pub(crate) fn validate_tree(node: &Node) -> Result<(), ReconcileError> {
    let key_usable = node.key.as_deref().is_some_and(|k| !k.is_empty());

    if let Some(descriptor) = &node.coordinator
        && !descriptor.is_stateless()
        && !key_usable
    {
        return Err(ReconcileError::MissingKey {
            element_type: node.element_type.0,
            requirement: "stateful coordinator",
        });
    }
    if node.view_init.is_some() && !key_usable {
        return Err(ReconcileError::MissingKey {
            element_type: node.element_type.0,
            requirement: "custom view initializer",
        });
    }

    for child in &node.children {
        validate_tree(child)?;
    }
    Ok(())
}

pub(crate) struct Reconciler<'a> {
    host: &'a mut dyn ElementHost,
    registry: &'a mut CoordinatorRegistry,
    flags: ChangeFlags,
    created: usize,
    destroyed: usize,
    updated: usize,
}

impl<'a> Reconciler<'a> {
    /// Diff `next` against the retained tree and commit the element
    /// mutations to the host. Frames are not touched here; layout runs
    /// over the returned tree afterwards.
    pub(crate) fn run(
        host: &'a mut dyn ElementHost,
        registry: &'a mut CoordinatorRegistry,
        previous: Option<MountedNode>,
        next: Node,
    ) -> ReconcileOutcome {
        let mut reconciler = Reconciler {
            host,
            registry,
            flags: ChangeFlags::empty(),
            created: 0,
            destroyed: 0,
            updated: 0,
        };

        let root = match previous {
            Some(prev) if nodes_match(&prev, &next) => reconciler.update_node(prev, next),
            Some(prev) => {
                reconciler.destroy_subtree(prev);
                reconciler.mount_node(next)
            }
            None => reconciler.mount_node(next),
        };

        debug!(
            created = reconciler.created,
            destroyed = reconciler.destroyed,
            updated = reconciler.updated,
            flags = ?reconciler.flags,
            "reconciliation diff complete"
        );

        ReconcileOutcome {
            root,
            flags: reconciler.flags,
            created: reconciler.created,
            destroyed: reconciler.destroyed,
            updated: reconciler.updated,
        }
    }

    // =========================================================================
    // Node handling
    // =========================================================================

    /// Reuse a matched element: refresh props, coordinator binding, and
    /// children, keeping the element handle.
    fn update_node(&mut self, prev: MountedNode, mut next: Node) -> MountedNode {
        let element = prev.element;

        if next.props != prev.node.props {
            self.host.apply_props(element, &next.props);
            self.flags |= ChangeFlags::CONTENT;
            self.updated += 1;
        } else if next.layout != prev.node.layout {
            self.flags |= ChangeFlags::CONTENT;
            self.updated += 1;
        }

        let binding = next
            .coordinator
            .as_ref()
            .and_then(|descriptor| self.registry.lookup_or_create(descriptor));

        let next_children = std::mem::take(&mut next.children);
        let children = self.reconcile_children(element, prev.children, next_children);

        MountedNode {
            node: next,
            element,
            frame: prev.frame,
            binding,
            children,
        }
    }

    /// Create a fresh element subtree for an unmatched description.
    fn mount_node(&mut self, mut next: Node) -> MountedNode {
        let element = self.host.create_element(
            next.element_type,
            next.reuse_identifier.as_deref(),
            next.view_init.as_ref(),
        );
        if !next.props.is_empty() {
            self.host.apply_props(element, &next.props);
        }
        self.flags |= ChangeFlags::CREATED;
        self.created += 1;

        let binding = next
            .coordinator
            .as_ref()
            .and_then(|descriptor| self.registry.lookup_or_create(descriptor));

        let children: Vec<MountedNode> = std::mem::take(&mut next.children)
            .into_iter()
            .map(|child| self.mount_node(child))
            .collect();
        let ids: Vec<ElementId> = children.iter().map(|c| c.element).collect();
        self.host.set_children(Some(element), &ids);

        MountedNode {
            node: next,
            element,
            frame: Rect::ZERO,
            binding,
            children,
        }
    }

    /// Destroy an element subtree, children first. Coordinator eviction
    /// is not done here; the end-of-pass key sweep owns it.
    fn destroy_subtree(&mut self, mounted: MountedNode) {
        for child in mounted.children {
            self.destroy_subtree(child);
        }
        self.host.destroy_element(mounted.element);
        self.flags |= ChangeFlags::DESTROYED;
        self.destroyed += 1;
    }

    // =========================================================================
    // Sibling diff
    // =========================================================================

    fn reconcile_children(
        &mut self,
        parent: ElementId,
        prev_children: Vec<MountedNode>,
        next_children: impl IntoIterator<Item = Node>,
    ) -> Vec<MountedNode> {
        // First occurrence wins when the old list itself repeats a key.
        let mut by_key: FxHashMap<String, usize> = FxHashMap::default();
        for (index, prev) in prev_children.iter().enumerate() {
            if let Some(key) = prev.key() {
                by_key.entry(key.to_string()).or_insert(index);
            }
        }

        let mut remaining: Vec<Option<MountedNode>> =
            prev_children.into_iter().map(Some).collect();
        let mut seen_keys: FxHashSet<String> = FxHashSet::default();
        let mut children = Vec::new();

        for (position, next) in next_children.into_iter().enumerate() {
            let matched = match next.key.as_deref() {
                Some(key) => {
                    if !seen_keys.insert(key.to_string()) {
                        warn!(
                            key,
                            element_type = next.element_type.0,
                            "duplicate key in sibling list, mounting a fresh element"
                        );
                        None
                    } else {
                        self.take_keyed_match(&by_key, &mut remaining, key, &next, position)
                    }
                }
                None => self.take_positional_match(&mut remaining, &next, position),
            };

            let child = match matched {
                Some(prev) => self.update_node(prev, next),
                None => self.mount_node(next),
            };
            children.push(child);
        }

        for prev in remaining.into_iter().flatten() {
            self.destroy_subtree(prev);
        }

        let ids: Vec<ElementId> = children.iter().map(|c| c.element).collect();
        self.host.set_children(Some(parent), &ids);
        children
    }

    fn take_keyed_match(
        &mut self,
        by_key: &FxHashMap<String, usize>,
        remaining: &mut Vec<Option<MountedNode>>,
        key: &str,
        next: &Node,
        position: usize,
    ) -> Option<MountedNode> {
        let index = *by_key.get(key)?;
        let candidate = remaining[index].as_ref()?;
        if candidate.node.element_type != next.element_type {
            // The key survived but the element kind did not; treat it as a
            // brand new node and let the leftover sweep destroy the old one.
            return None;
        }
        if index != position {
            self.flags |= ChangeFlags::REORDERED;
        }
        remaining[index].take()
    }

    fn take_positional_match(
        &mut self,
        remaining: &mut [Option<MountedNode>],
        next: &Node,
        position: usize,
    ) -> Option<MountedNode> {
        let candidate = remaining.get(position)?.as_ref()?;
        if candidate.key().is_some() || candidate.node.element_type != next.element_type {
            return None;
        }
        remaining[position].take()
    }
}

fn nodes_match(prev: &MountedNode, next: &Node) -> bool {
    prev.node.element_type == next.element_type && prev.node.key.as_deref() == next.key.as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::element::VirtualHost;
    use crate::node::node;

    fn diff(
        host: &mut VirtualHost,
        registry: &mut CoordinatorRegistry,
        previous: Option<MountedNode>,
        next: Node,
    ) -> ReconcileOutcome {
        registry.begin_pass();
        Reconciler::run(host, registry, previous, next)
    }

    fn keyed(key: &str) -> Node {
        node("view").with_key(key).build().unwrap()
    }

    fn list(keys: &[&str]) -> Node {
        node("list")
            .with_children(keys.iter().map(|k| keyed(k)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_initial_mount_creates_everything() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let outcome = diff(&mut host, &mut registry, None, list(&["a", "b", "c"]));

        assert_eq!(outcome.created, 4);
        assert_eq!(outcome.destroyed, 0);
        assert!(outcome.flags.contains(ChangeFlags::CREATED));
        assert_eq!(outcome.root.children.len(), 3);
    }

    #[test]
    fn test_identical_tree_is_a_no_op() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let first = diff(&mut host, &mut registry, None, list(&["a", "b"]));
        let second = diff(&mut host, &mut registry, Some(first.root), list(&["a", "b"]));

        assert_eq!(second.flags, ChangeFlags::empty());
        assert_eq!(second.created, 0);
        assert_eq!(second.destroyed, 0);
    }

    #[test]
    fn test_keyed_reorder_preserves_elements() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let first = diff(&mut host, &mut registry, None, list(&["a", "b", "c"]));
        let id_a = first.root.children[0].element;
        let id_c = first.root.children[2].element;

        let second = diff(&mut host, &mut registry, Some(first.root), list(&["c", "b", "a"]));

        assert!(second.flags.contains(ChangeFlags::REORDERED));
        assert_eq!(second.created, 0);
        assert_eq!(second.destroyed, 0);
        assert_eq!(second.root.children[0].element, id_c);
        assert_eq!(second.root.children[2].element, id_a);
    }

    #[test]
    fn test_removed_key_destroys_subtree() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let first = diff(&mut host, &mut registry, None, list(&["a", "b", "c"]));
        let second = diff(&mut host, &mut registry, Some(first.root), list(&["a", "c"]));

        assert!(second.flags.contains(ChangeFlags::DESTROYED));
        assert_eq!(second.destroyed, 1);
        assert_eq!(host.destroyed, 1);
        assert_eq!(second.root.children.len(), 2);
    }

    #[test]
    fn test_changed_element_type_replaces_even_with_same_key() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let first = diff(&mut host, &mut registry, None, list(&["a"]));
        let old_id = first.root.children[0].element;

        let next = node("list")
            .with_children([node("label").with_key("a").build().unwrap()])
            .build()
            .unwrap();
        let second = diff(&mut host, &mut registry, Some(first.root), next);

        assert_eq!(second.created, 1);
        assert_eq!(second.destroyed, 1);
        assert_ne!(second.root.children[0].element, old_id);
    }

    #[test]
    fn test_duplicate_keys_first_wins() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let first = diff(&mut host, &mut registry, None, list(&["a"]));
        let id_a = first.root.children[0].element;

        let second = diff(&mut host, &mut registry, Some(first.root), list(&["a", "a"]));

        // The first occurrence reuses the element, the duplicate mounts fresh.
        assert_eq!(second.root.children[0].element, id_a);
        assert_ne!(second.root.children[1].element, id_a);
        assert_eq!(second.created, 1);
    }

    #[test]
    fn test_unkeyed_match_is_positional() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let plain = || {
            node("list")
                .with_children([
                    node("view").build().unwrap(),
                    node("view").build().unwrap(),
                ])
                .build()
                .unwrap()
        };

        let first = diff(&mut host, &mut registry, None, plain());
        let ids: Vec<ElementId> = first.root.children.iter().map(|c| c.element).collect();

        let second = diff(&mut host, &mut registry, Some(first.root), plain());
        let ids_after: Vec<ElementId> = second.root.children.iter().map(|c| c.element).collect();

        assert_eq!(ids, ids_after);
        assert_eq!(second.flags, ChangeFlags::empty());
    }

    #[test]
    fn test_keyed_never_matches_unkeyed() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let first = diff(
            &mut host,
            &mut registry,
            None,
            node("list")
                .with_children([node("view").build().unwrap()])
                .build()
                .unwrap(),
        );
        let old_id = first.root.children[0].element;

        let second = diff(&mut host, &mut registry, Some(first.root), list(&["a"]));

        assert_ne!(second.root.children[0].element, old_id);
        assert_eq!(second.destroyed, 1);
    }

    #[test]
    fn test_root_replacement_on_type_change() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let first = diff(&mut host, &mut registry, None, list(&["a", "b"]));
        let second = diff(
            &mut host,
            &mut registry,
            Some(first.root),
            node("panel").build().unwrap(),
        );

        // Old root and both children go away.
        assert_eq!(second.destroyed, 3);
        assert_eq!(second.created, 1);
    }

    #[test]
    fn test_props_change_sets_content_flag() {
        let mut host = VirtualHost::new();
        let mut registry = CoordinatorRegistry::new();

        let with_text = |text: &str| {
            node("label")
                .with_props(crate::types::Props::new().with("text", text.to_string()))
                .build()
                .unwrap()
        };

        let first = diff(&mut host, &mut registry, None, with_text("hello"));
        let second = diff(&mut host, &mut registry, Some(first.root), with_text("bye"));

        assert_eq!(second.flags, ChangeFlags::CONTENT);
        assert!(!second.flags.intersects(ChangeFlags::STRUCTURAL));
    }

    #[test]
    fn test_validate_accepts_well_formed_trees() {
        assert!(validate_tree(&list(&["a", "b"])).is_ok());
        assert!(validate_tree(&node("view").build().unwrap()).is_ok());
    }

    #[test]
    fn test_validate_rejects_stateful_coordinator_without_key() {
        use crate::engine::coordinator::{Coordinator, CoordinatorDescriptor};
        use std::any::Any;

        #[derive(Default)]
        struct Probe;
        impl Coordinator for Probe {
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        // The builder adopts the descriptor key, so strip it afterwards to
        // model a tree assembled by hand.
        let mut bad = node("view")
            .with_coordinator(CoordinatorDescriptor::stateful("probe", Probe::default))
            .build()
            .unwrap();
        bad.key = None;

        let parent = node("list").add_child(bad).build().unwrap();
        assert!(matches!(
            validate_tree(&parent),
            Err(ReconcileError::MissingKey { .. })
        ));
    }
}
