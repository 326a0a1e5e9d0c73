//! Element subsystem seam - live-hierarchy mutation primitives.
//!
//! The reconciliation core never touches concrete widgets. It drives an
//! [`ElementHost`], the narrow contract behind which the real view toolkit
//! lives. Host operations are atomic, synchronous, and always succeed;
//! a failing toolkit is a fatal environment error outside this model.
//!
//! [`VirtualHost`] is the in-memory implementation used by tests and by
//! embedders that want to inspect the merged tree without real bindings.

use rustc_hash::FxHashMap;

use crate::node::ViewInit;
use crate::types::{ElementType, LayoutAnimator, Props, Rect};

/// Handle to one live element. Meaningful only to the host that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// The live-hierarchy mutation primitives the reconciler emits against.
pub trait ElementHost {
    /// Instantiate a live element, via `view_init` when supplied, else the
    /// host's default factory for `element_type`/`reuse_identifier`.
    fn create_element(
        &mut self,
        element_type: ElementType,
        reuse_identifier: Option<&str>,
        view_init: Option<&ViewInit>,
    ) -> ElementId;

    /// Detach and release a live element. The host releases the whole
    /// backing view; the reconciler still calls this per handle so hosts
    /// with flat storage stay consistent.
    fn destroy_element(&mut self, id: ElementId);

    /// Replace the element's externally supplied properties.
    fn apply_props(&mut self, id: ElementId, props: &Props);

    /// Commit a computed frame, optionally inside an animation context.
    fn apply_frame(&mut self, id: ElementId, frame: Rect, animator: Option<&LayoutAnimator>);

    /// Set the ordered children of `parent` (`None` for the root level).
    /// This is how insertions, removals, and reorders reach the hierarchy.
    fn set_children(&mut self, parent: Option<ElementId>, children: &[ElementId]);

    /// Whether the element is currently attached to the visible hierarchy.
    fn is_attached(&self, id: ElementId) -> bool;
}

// =============================================================================
// Virtual host
// =============================================================================

/// One element inside a [`VirtualHost`].
#[derive(Debug, Default)]
pub struct VirtualElement {
    pub element_type: &'static str,
    pub reuse_identifier: Option<String>,
    pub props: Props,
    pub frame: Rect,
    pub children: Vec<ElementId>,
    pub parent: Option<ElementId>,
    /// Set when the element came from a custom view-init factory.
    pub custom_view: bool,
    /// Animator in effect when the last frame was committed.
    pub last_animator: Option<LayoutAnimator>,
}

/// In-memory element hierarchy.
#[derive(Debug, Default)]
pub struct VirtualHost {
    elements: FxHashMap<ElementId, VirtualElement>,
    roots: Vec<ElementId>,
    next_id: u64,
    /// Total elements ever created; never decremented.
    pub created: usize,
    /// Total elements ever destroyed; never decremented.
    pub destroyed: usize,
}

impl VirtualHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&self, id: ElementId) -> Option<&VirtualElement> {
        self.elements.get(&id)
    }

    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ElementHost for VirtualHost {
    fn create_element(
        &mut self,
        element_type: ElementType,
        reuse_identifier: Option<&str>,
        view_init: Option<&ViewInit>,
    ) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.created += 1;

        // The factory output itself is host-specific; the virtual host only
        // records that a custom factory ran.
        let custom_view = match view_init {
            Some(init) => {
                let _view = init(reuse_identifier);
                true
            }
            None => false,
        };

        self.elements.insert(
            id,
            VirtualElement {
                element_type: element_type.name(),
                reuse_identifier: reuse_identifier.map(str::to_string),
                custom_view,
                ..VirtualElement::default()
            },
        );
        id
    }

    fn destroy_element(&mut self, id: ElementId) {
        if let Some(element) = self.elements.remove(&id) {
            self.destroyed += 1;
            if let Some(parent) = element.parent
                && let Some(parent_element) = self.elements.get_mut(&parent)
            {
                parent_element.children.retain(|child| *child != id);
            }
            self.roots.retain(|root| *root != id);
        }
    }

    fn apply_props(&mut self, id: ElementId, props: &Props) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.props = props.clone();
        }
    }

    fn apply_frame(&mut self, id: ElementId, frame: Rect, animator: Option<&LayoutAnimator>) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.frame = frame;
            element.last_animator = animator.cloned();
        }
    }

    fn set_children(&mut self, parent: Option<ElementId>, children: &[ElementId]) {
        match parent {
            Some(parent_id) => {
                if let Some(parent_element) = self.elements.get_mut(&parent_id) {
                    parent_element.children = children.to_vec();
                }
            }
            None => {
                self.roots = children.to_vec();
            }
        }
        for &child in children {
            if let Some(child_element) = self.elements.get_mut(&child) {
                child_element.parent = parent;
            }
        }
    }

    fn is_attached(&self, id: ElementId) -> bool {
        let mut current = id;
        loop {
            if self.roots.contains(&current) {
                return true;
            }
            match self.elements.get(&current).and_then(|e| e.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::ElementType;

    #[test]
    fn test_create_and_destroy() {
        let mut host = VirtualHost::new();
        let id = host.create_element(ElementType("view"), None, None);
        assert_eq!(host.len(), 1);
        assert_eq!(host.created, 1);

        host.destroy_element(id);
        assert!(host.is_empty());
        assert_eq!(host.destroyed, 1);
    }

    #[test]
    fn test_attachment_through_parent_chain() {
        let mut host = VirtualHost::new();
        let root = host.create_element(ElementType("view"), None, None);
        let child = host.create_element(ElementType("label"), None, None);
        let orphan = host.create_element(ElementType("label"), None, None);

        host.set_children(None, &[root]);
        host.set_children(Some(root), &[child]);

        assert!(host.is_attached(root));
        assert!(host.is_attached(child));
        assert!(!host.is_attached(orphan));
    }

    #[test]
    fn test_set_children_reorders() {
        let mut host = VirtualHost::new();
        let root = host.create_element(ElementType("view"), None, None);
        let a = host.create_element(ElementType("label"), None, None);
        let b = host.create_element(ElementType("label"), None, None);

        host.set_children(None, &[root]);
        host.set_children(Some(root), &[a, b]);
        assert_eq!(host.element(root).unwrap().children, vec![a, b]);

        host.set_children(Some(root), &[b, a]);
        assert_eq!(host.element(root).unwrap().children, vec![b, a]);
    }

    #[test]
    fn test_custom_view_init() {
        let mut host = VirtualHost::new();
        let init: ViewInit = Arc::new(|reuse| Box::new(reuse.map(str::to_string)));
        let id = host.create_element(ElementType("badge"), Some("badge-reuse"), Some(&init));

        let element = host.element(id).unwrap();
        assert!(element.custom_view);
        assert_eq!(element.reuse_identifier.as_deref(), Some("badge-reuse"));
    }
}
