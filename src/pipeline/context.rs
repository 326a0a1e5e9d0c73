//! Context - owns the host, the coordinator registry, and the retained
//! mounted tree, and drives reconciliation passes over them.
//!
//! A pass is synchronous and exclusive: `reconcile` takes `&mut self`, so
//! delegates observing a pass (they only ever see `&ReconciliationInfo`)
//! cannot start another one from inside it. Coordinators instead call
//! [`CoordinatorCx::request_reconcile`], which queues one coalesced
//! follow-up pass over the retained tree, drained before `reconcile`
//! returns.
//!
//! [`CoordinatorCx::request_reconcile`]: crate::engine::CoordinatorCx::request_reconcile

use std::collections::BTreeSet;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::engine::coordinator::{Coordinator, CoordinatorProvider};
use crate::engine::element::ElementHost;
use crate::engine::registry::CoordinatorRegistry;
use crate::engine::tree::MountedNode;
use crate::error::ReconcileError;
use crate::layout::compute_layout;
use crate::node::Node;
use crate::pipeline::info::ReconciliationInfo;
use crate::pipeline::reconciler::{validate_tree, ChangeFlags, Reconciler};
use crate::types::{LayoutAnimator, Size};

/// Follow-up passes are coalesced, but a coordinator that requests a new
/// pass on every pass would spin forever. Bail out after this many chained
/// passes in one `reconcile` call.
const MAX_CHAINED_PASSES: usize = 32;

/// Observer of reconciliation passes.
///
/// Both hooks receive a shared summary: the pre-pass one with the
/// post-layout fields still empty, the post-pass one fully populated.
pub trait ContextDelegate {
    fn will_reconcile(&self, _info: &ReconciliationInfo) {}
    fn did_reconcile(&self, _info: &ReconciliationInfo) {}
}

/// How a `reconcile` request was handled.
#[derive(Debug)]
pub enum Reconciliation {
    /// The pass (and any coalesced follow-ups) ran to completion.
    Completed(ReconciliationInfo),
    /// A pass was already in flight; this tree replaced the queued one and
    /// will run when the in-flight pass finishes.
    Queued,
}

pub struct Context<H: ElementHost> {
    host: H,
    registry: CoordinatorRegistry,
    previous: Option<MountedNode>,
    delegates: Vec<Rc<dyn ContextDelegate>>,
    layout_animator: Option<LayoutAnimator>,
    viewport: Size,
    preserve_origin: bool,
    reconciling: bool,
    pending: Option<Node>,
}

impl<H: ElementHost> Context<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            registry: CoordinatorRegistry::new(),
            previous: None,
            delegates: Vec::new(),
            layout_animator: None,
            viewport: Size::ZERO,
            preserve_origin: false,
            reconciling: false,
            pending: None,
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Available space handed to the layout engine each pass.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Keep the root's committed origin across passes instead of resetting
    /// it to zero. Useful when the host positions the root itself.
    pub fn set_preserve_origin(&mut self, preserve: bool) {
        self.preserve_origin = preserve;
    }

    /// Animator reported to the host with every frame change until unset.
    pub fn set_layout_animator(&mut self, animator: Option<LayoutAnimator>) {
        self.layout_animator = animator;
    }

    pub fn add_delegate(&mut self, delegate: Rc<dyn ContextDelegate>) {
        if !self.delegates.iter().any(|d| Rc::ptr_eq(d, &delegate)) {
            self.delegates.push(delegate);
        }
    }

    pub fn remove_delegate(&mut self, delegate: &Rc<dyn ContextDelegate>) {
        self.delegates.retain(|d| !Rc::ptr_eq(d, delegate));
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn registry(&self) -> &CoordinatorRegistry {
        &self.registry
    }

    /// Root of the retained mounted tree, if a pass has committed one.
    pub fn root(&self) -> Option<&MountedNode> {
        self.previous.as_ref()
    }

    /// Handle for retrieving a keyed coordinator later without holding a
    /// borrow of the registry. Resolves to `None` once the coordinator is
    /// evicted.
    pub fn coordinator_provider<C: Coordinator>(
        &self,
        key: impl Into<String>,
    ) -> CoordinatorProvider<C> {
        CoordinatorProvider::new(key)
    }

    pub fn coordinator<C: Coordinator>(&self, key: &str) -> Option<&C> {
        self.registry.get::<C>(key)
    }

    pub fn coordinator_mut<C: Coordinator>(&mut self, key: &str) -> Option<&mut C> {
        self.registry.get_mut::<C>(key)
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Run a reconciliation pass for `tree`.
    ///
    /// Fails without touching the mounted tree when the description is
    /// invalid. Otherwise diffs, lays out, commits frames, dispatches
    /// coordinator hooks, sweeps evicted coordinators, and drains any
    /// coalesced follow-up passes before returning.
    pub fn reconcile(&mut self, tree: Node) -> Result<Reconciliation, ReconcileError> {
        validate_tree(&tree)?;

        if self.reconciling {
            self.pending = Some(tree);
            return Ok(Reconciliation::Queued);
        }
        self.reconciling = true;

        let mut info = self.run_pass(tree);

        let mut passes = 1;
        while let Some(next) = self.take_pending() {
            passes += 1;
            if passes > MAX_CHAINED_PASSES {
                warn!(
                    passes,
                    "coalesced reconciliation did not settle, giving up"
                );
                break;
            }
            info = self.run_pass(next);
        }

        self.reconciling = false;
        Ok(Reconciliation::Completed(info))
    }

    fn take_pending(&mut self) -> Option<Node> {
        if let Some(tree) = self.pending.take() {
            return Some(tree);
        }
        if self.registry.take_needs_reconcile() {
            // Re-run the retained tree so coordinator-driven changes get
            // picked up without the caller rebuilding the description.
            return self.previous.as_ref().map(MountedNode::to_node);
        }
        None
    }

    fn run_pass(&mut self, tree: Node) -> ReconciliationInfo {
        let provisional = ReconciliationInfo {
            layout_animator: self.layout_animator.clone(),
            ..ReconciliationInfo::default()
        };
        for delegate in &self.delegates {
            delegate.will_reconcile(&provisional);
        }

        let mut sizes_before = FxHashMap::default();
        if let Some(previous) = &self.previous {
            previous.collect_keyed_sizes(&mut sizes_before);
        }

        self.registry.begin_pass();
        let outcome = Reconciler::run(&mut self.host, &mut self.registry, self.previous.take(), tree);
        let mut root = outcome.root;

        compute_layout(&mut root, self.viewport, self.preserve_origin);
        self.commit_frames(&root);
        self.host.set_children(None, &[root.element()]);

        let mutated = mutated_size_keys(&sizes_before, &root);
        self.dispatch_hooks(&root);
        self.registry.sweep();
        self.previous = Some(root);

        debug!(
            created = outcome.created,
            destroyed = outcome.destroyed,
            updated = outcome.updated,
            mutated_sizes = mutated.len(),
            "reconciliation pass committed"
        );

        let info = ReconciliationInfo {
            must_invalidate_layout: outcome.flags.intersects(ChangeFlags::STRUCTURAL),
            keys_for_nodes_with_mutated_size: mutated,
            layout_animator: self.layout_animator.clone(),
        };
        for delegate in &self.delegates {
            delegate.did_reconcile(&info);
        }
        info
    }

    /// Push every committed frame to the host, with the pass animator.
    fn commit_frames(&mut self, root: &MountedNode) {
        let animator = self.layout_animator.clone();
        let host = &mut self.host;
        root.for_each(&mut |mounted| {
            host.apply_frame(mounted.element(), mounted.frame(), animator.as_ref());
        });
    }

    /// Mount and layout notifications, parents first. Runs before the
    /// sweep so pooled coordinator slots claimed this pass are still valid.
    fn dispatch_hooks(&mut self, root: &MountedNode) {
        let host = &self.host;
        let registry = &mut self.registry;
        root.for_each(&mut |mounted| {
            if let Some(binding) = &mounted.binding {
                if host.is_attached(mounted.element()) {
                    registry.notify_mount(binding);
                }
                registry.notify_layout(binding, mounted.frame());
            }
        });
    }
}

/// Keys of keyed nodes present both before and after the pass whose
/// committed size changed. Unkeyed nodes are never reported.
fn mutated_size_keys(
    sizes_before: &FxHashMap<String, Size>,
    root: &MountedNode,
) -> BTreeSet<String> {
    let mut mutated = BTreeSet::new();
    root.for_each(&mut |mounted| {
        if let Some(key) = mounted.key()
            && let Some(before) = sizes_before.get(key)
            && *before != mounted.frame().size
        {
            mutated.insert(key.to_string());
        }
    });
    mutated
}
