//! Engine - coordinator lifecycle and the live element tree.
//!
//! - [`coordinator`] - the coordinator capability, descriptors, providers
//! - [`registry`] - keyed/pooled coordinator ownership and eviction
//! - [`element`] - the element-host seam and the in-memory `VirtualHost`
//! - [`tree`] - the merged node/element tree retained between passes

pub mod coordinator;
pub mod element;
pub mod registry;
pub mod tree;

pub use coordinator::{
    Coordinator, CoordinatorCx, CoordinatorDescriptor, CoordinatorProvider, STATELESS_KEY,
};
pub use element::{ElementHost, ElementId, VirtualElement, VirtualHost};
pub use registry::CoordinatorRegistry;
pub use tree::MountedNode;
