//! Error types.
//!
//! Only identity-invariant violations escalate as errors. Local structural
//! anomalies (duplicate sibling keys, coordinator capability mismatches)
//! resolve through documented tie-breaks and surface on the `tracing`
//! diagnostic channel instead.

use thiserror::Error;

/// Contract violations raised while assembling a [`Node`](crate::Node).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// A stateful coordinator or a custom view-init factory was requested
    /// on a node without a non-empty key.
    #[error("node `{element_type}` requires a non-empty key ({requirement})")]
    MissingKey {
        element_type: &'static str,
        requirement: &'static str,
    },

    /// The node's key and its coordinator descriptor's key disagree.
    #[error("node `{element_type}` key `{node_key}` does not match coordinator key `{coordinator_key}`")]
    KeyMismatch {
        element_type: &'static str,
        node_key: String,
        coordinator_key: String,
    },
}

/// Failures that abort a whole reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// A node in the new tree requires a key it does not carry. The tree
    /// shape cannot be trusted, so the pass is rejected before any live
    /// mutation happens.
    #[error("node `{element_type}` requires a non-empty key for its {requirement}")]
    MissingKey {
        element_type: &'static str,
        requirement: &'static str,
    },
}
