//! Reconciliation summary handed to context delegates.

use std::collections::BTreeSet;

use crate::types::LayoutAnimator;

/// Summary of one reconciliation pass.
///
/// Delegates receive this before the pass starts (with the post-layout
/// fields still empty) and again after it commits.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationInfo {
    /// True when the pass created, destroyed, or reordered elements, so a
    /// host embedding the root in an outer layout should re-measure it.
    pub must_invalidate_layout: bool,
    /// Keys of keyed nodes whose committed size changed in this pass,
    /// in sorted order. Unkeyed nodes are never reported.
    pub keys_for_nodes_with_mutated_size: BTreeSet<String>,
    /// Animator the host should apply to frame changes in this pass.
    pub layout_animator: Option<LayoutAnimator>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_info_is_empty() {
        let info = ReconciliationInfo::default();
        assert!(!info.must_invalidate_layout);
        assert!(info.keys_for_nodes_with_mutated_size.is_empty());
        assert!(info.layout_animator.is_none());
    }

    #[test]
    fn test_mutated_size_keys_iterate_sorted() {
        let mut info = ReconciliationInfo::default();
        info.keys_for_nodes_with_mutated_size.insert("b".into());
        info.keys_for_nodes_with_mutated_size.insert("a".into());

        let keys: Vec<&str> = info
            .keys_for_nodes_with_mutated_size
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
