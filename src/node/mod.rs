//! Node - immutable description of one desired UI element.
//!
//! Application code produces a fresh `Node` tree every reconciliation pass
//! via [`NodeBuilder`]; the tree is a value, never mutated once built, and
//! safe to construct off the UI thread and hand over by ownership transfer.
//!
//! Key invariant: a node requesting a stateful coordinator or a custom
//! view-init factory must carry a non-empty key. [`NodeBuilder::build`]
//! rejects such trees up front rather than degrading silently.

mod builder;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::engine::coordinator::CoordinatorDescriptor;
use crate::layout::LayoutStyle;
use crate::types::{ElementType, Props};

pub use builder::{NodeBuilder, node};

/// Custom element factory: receives the node's reuse identifier and returns
/// the host-specific backing view object.
pub type ViewInit = Arc<dyn Fn(Option<&str>) -> Box<dyn Any + Send> + Send + Sync>;

/// Immutable description of one desired UI element and its subtree.
#[derive(Clone)]
pub struct Node {
    pub(crate) element_type: ElementType,
    pub(crate) key: Option<String>,
    pub(crate) reuse_identifier: Option<String>,
    pub(crate) coordinator: Option<CoordinatorDescriptor>,
    pub(crate) layout: LayoutStyle,
    pub(crate) props: Props,
    pub(crate) view_init: Option<ViewInit>,
    pub(crate) children: Vec<Node>,
}

impl Node {
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Identity across reconciliations; unique among siblings when present.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Pooling hint for the host's default element factory, independent of
    /// `key`.
    pub fn reuse_identifier(&self) -> Option<&str> {
        self.reuse_identifier.as_deref()
    }

    pub fn coordinator(&self) -> Option<&CoordinatorDescriptor> {
        self.coordinator.as_ref()
    }

    pub fn layout(&self) -> &LayoutStyle {
        &self.layout
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("element_type", &self.element_type)
            .field("key", &self.key)
            .field("reuse_identifier", &self.reuse_identifier)
            .field("coordinator", &self.coordinator)
            .field("props", &self.props)
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Node>();
    }
}
