//! # reflow-ui
//!
//! Declarative view reconciliation engine with flexbox layout.
//!
//! A UI is described as an immutable tree of [`Node`]s. Each pass the
//! [`Context`] diffs the new description against the retained mounted tree,
//! reusing live elements by key (or by position for unkeyed siblings),
//! creating and destroying the rest, then runs one flexbox layout pass and
//! commits frames to the [`ElementHost`].
//!
//! Per-node state lives in [`Coordinator`]s, registered by `(type, key)`
//! and retained for exactly as long as some node references them; the
//! end-of-pass sweep evicts the rest.
//!
//! ## Modules
//!
//! - [`types`] - Core geometry, flexbox enums, props
//! - [`node`] - Node descriptions and the builder
//! - [`engine`] - Coordinators, registry, element host, mounted tree
//! - [`layout`] - Flexbox style model and the Taffy bridge
//! - [`pipeline`] - Context, reconciler, pass summaries
//!
//! ## Example
//!
//! ```
//! use reflow_ui::{node, Context, LayoutStyle, Size, VirtualHost};
//!
//! let mut cx = Context::new(VirtualHost::new());
//! cx.set_viewport(Size::new(80.0, 24.0));
//!
//! let tree = node("root")
//!     .with_layout(LayoutStyle::sized(80.0, 24.0))
//!     .add_child(node("label").with_key("title").build().unwrap())
//!     .build()
//!     .unwrap();
//!
//! cx.reconcile(tree).unwrap();
//! assert_eq!(cx.host().len(), 2);
//! ```

pub mod engine;
pub mod error;
pub mod layout;
pub mod node;
pub mod pipeline;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use engine::{
    Coordinator, CoordinatorCx, CoordinatorDescriptor, CoordinatorProvider, CoordinatorRegistry,
    ElementHost, ElementId, MountedNode, VirtualElement, VirtualHost, STATELESS_KEY,
};

pub use error::{NodeError, ReconcileError};

pub use layout::{Inset, LayoutStyle};

pub use node::{node, Node, NodeBuilder, ViewInit};

pub use pipeline::{ChangeFlags, Context, ContextDelegate, Reconciliation, ReconciliationInfo};
