//! Layout - flexbox style model and the Taffy bridge.
//!
//! `LayoutStyle` is the declarative flexbox surface attached to every node
//! description. The bridge converts the mounted tree to Taffy, computes one
//! layout pass, and writes frames back.

mod style;
mod taffy_bridge;

pub use style::{Inset, LayoutStyle};
pub(crate) use taffy_bridge::compute_layout;
