//! Fluent node construction.
//!
//! A pure convenience layer: the builder is an ordinary owned-`self` chain
//! producing an immutable [`Node`] value. `build` is where the key
//! invariant is enforced.

use crate::engine::coordinator::{Coordinator, CoordinatorDescriptor};
use crate::error::NodeError;
use crate::layout::LayoutStyle;
use crate::types::{ElementType, Props};

use super::{Node, ViewInit};

/// Start a builder for an element of the given type.
///
/// # Example
///
/// ```
/// use reflow_ui::{node, LayoutStyle, Dimension};
///
/// let tree = node("stack")
///     .with_layout(LayoutStyle {
///         width: Dimension::Points(100.0),
///         ..LayoutStyle::default()
///     })
///     .add_child(node("label").with_key("title").build().unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(tree.children().len(), 1);
/// ```
pub fn node(element_type: impl Into<ElementType>) -> NodeBuilder {
    NodeBuilder::new(element_type)
}

/// Fluent builder for [`Node`] values.
pub struct NodeBuilder {
    element_type: ElementType,
    key: Option<String>,
    reuse_identifier: Option<String>,
    coordinator: Option<CoordinatorDescriptor>,
    layout: LayoutStyle,
    props: Props,
    view_init: Option<ViewInit>,
    children: Vec<Node>,
}

impl NodeBuilder {
    pub fn new(element_type: impl Into<ElementType>) -> Self {
        Self {
            element_type: element_type.into(),
            key: None,
            reuse_identifier: None,
            coordinator: None,
            layout: LayoutStyle::default(),
            props: Props::new(),
            view_init: None,
            children: Vec::new(),
        }
    }

    /// Unique node key (required for stateful coordinators and custom
    /// view factories).
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Optional reuse identifier for the host's element pool.
    pub fn with_reuse_identifier(mut self, reuse_identifier: impl Into<String>) -> Self {
        self.reuse_identifier = Some(reuse_identifier.into());
        self
    }

    /// Associate a coordinator with this node. If the descriptor is keyed
    /// and the node has no key yet, the node adopts the descriptor's key.
    pub fn with_coordinator(mut self, descriptor: CoordinatorDescriptor) -> Self {
        self.coordinator = Some(descriptor);
        self
    }

    /// Shorthand for a keyed coordinator of a `Default`-constructible
    /// type. Equivalent to passing the descriptor explicitly.
    pub fn with_coordinator_of<C>(self, key: impl Into<String>) -> Self
    where
        C: Coordinator + Default,
    {
        self.with_coordinator(CoordinatorDescriptor::stateful(key, C::default))
    }

    /// Shorthand for a pooled stateless coordinator.
    pub fn with_stateless_coordinator<C>(self) -> Self
    where
        C: Coordinator + Default,
    {
        self.with_coordinator(CoordinatorDescriptor::stateless::<C>())
    }

    /// Flexbox styling directives consumed by the layout pass.
    pub fn with_layout(mut self, layout: LayoutStyle) -> Self {
        self.layout = layout;
        self
    }

    /// Externally defined props, applied to the element every pass.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Custom element creation closure. Requires a key.
    pub fn with_view_init(mut self, view_init: ViewInit) -> Self {
        self.view_init = Some(view_init);
        self
    }

    /// Replace the children list.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    /// Append one child.
    pub fn add_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Assemble the immutable node, enforcing the key invariant.
    pub fn build(mut self) -> Result<Node, NodeError> {
        if let Some(descriptor) = &self.coordinator
            && !descriptor.is_stateless()
        {
            match &self.key {
                None => self.key = Some(descriptor.key().to_string()),
                Some(key) if key != descriptor.key() => {
                    return Err(NodeError::KeyMismatch {
                        element_type: self.element_type.name(),
                        node_key: key.clone(),
                        coordinator_key: descriptor.key().to_string(),
                    });
                }
                Some(_) => {}
            }
            if self.key.as_deref().is_none_or(str::is_empty) {
                return Err(NodeError::MissingKey {
                    element_type: self.element_type.name(),
                    requirement: "stateful coordinator",
                });
            }
        }

        if self.view_init.is_some() && self.key.as_deref().is_none_or(str::is_empty) {
            return Err(NodeError::MissingKey {
                element_type: self.element_type.name(),
                requirement: "custom view factory",
            });
        }

        Ok(Node {
            element_type: self.element_type,
            key: self.key,
            reuse_identifier: self.reuse_identifier,
            coordinator: self.coordinator,
            layout: self.layout,
            props: self.props,
            view_init: self.view_init,
            children: self.children,
        })
    }
}
