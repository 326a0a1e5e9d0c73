//! Coordinator Registry - keyed coordinator ownership and lifecycle.
//!
//! The registry is the sole owner of coordinator lifetime within a context:
//! - `(type, key)` table for stateful coordinators
//! - availability pool per type for stateless coordinators
//! - per-pass touched-key tracking
//! - end-of-pass sweep that evicts untouched entries (teardown hook first)
//!
//! At most one live coordinator exists per `(type, key)` at any time.

use std::any::TypeId;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::engine::coordinator::{
    Coordinator, CoordinatorCx, CoordinatorDescriptor, STATELESS_KEY,
};
use crate::types::Rect;

// =============================================================================
// Bindings
// =============================================================================

/// Where a bound coordinator lives inside the registry.
///
/// Pooled slots are only valid within the pass that produced them; the
/// reconciler refreshes every binding on every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CoordinatorSlot {
    Keyed(String),
    Pooled(usize),
}

/// Identity of the coordinator a mounted node is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CoordinatorBinding {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) slot: CoordinatorSlot,
}

// =============================================================================
// Entries
// =============================================================================

struct KeyedEntry {
    coordinator: Box<dyn Coordinator>,
    type_name: &'static str,
    mounted: bool,
}

struct PoolEntry {
    coordinator: Box<dyn Coordinator>,
    mounted: bool,
    /// Claimed by a node during the current pass.
    in_use: bool,
    /// Referenced at least once during the current pass; unused entries
    /// are dropped by the sweep.
    used_this_pass: bool,
}

// =============================================================================
// Registry
// =============================================================================

/// Process-local-to-context coordinator table.
///
/// Exclusively owned and mutated by its [`Context`](crate::Context); no
/// operation here is safe to share across threads.
#[derive(Default)]
pub struct CoordinatorRegistry {
    keyed: FxHashMap<(TypeId, String), KeyedEntry>,
    pools: FxHashMap<TypeId, Vec<PoolEntry>>,
    touched: FxHashSet<(TypeId, String)>,
    needs_reconcile: bool,
}

impl CoordinatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a reconciliation pass: clear touch tracking and release all
    /// pooled instances back to availability.
    pub(crate) fn begin_pass(&mut self) {
        self.touched.clear();
        self.needs_reconcile = false;
        for pool in self.pools.values_mut() {
            for entry in pool.iter_mut() {
                entry.in_use = false;
                entry.used_this_pass = false;
            }
        }
    }

    /// Look up the coordinator for `descriptor`, creating it on a miss.
    ///
    /// On a hit, fresh props are merged in (replacing outright; state is
    /// left untouched). On a miss the instance is constructed, props
    /// applied, `on_init` invoked, and the entry registered.
    ///
    /// Returns `None` when the request fails the capability contract: a
    /// stateful lookup with an empty key, or a caller-supplied key that
    /// collides with the stateless sentinel.
    pub(crate) fn lookup_or_create(
        &mut self,
        descriptor: &CoordinatorDescriptor,
    ) -> Option<CoordinatorBinding> {
        if descriptor.is_stateless() {
            return Some(self.lookup_or_create_pooled(descriptor));
        }

        let key = descriptor.key();
        if key.is_empty() || key == STATELESS_KEY {
            warn!(
                coordinator = descriptor.type_name,
                key, "rejecting stateful coordinator lookup with invalid key"
            );
            return None;
        }

        let table_key = (descriptor.type_id, key.to_string());
        self.touched.insert(table_key.clone());

        if let Some(entry) = self.keyed.get_mut(&table_key) {
            entry.coordinator.update_props(&descriptor.props);
        } else {
            let mut coordinator = (descriptor.construct)();
            coordinator.update_props(&descriptor.props);
            let mut cx = CoordinatorCx {
                key,
                needs_reconcile: &mut self.needs_reconcile,
            };
            coordinator.on_init(&mut cx);
            self.keyed.insert(
                table_key,
                KeyedEntry {
                    coordinator,
                    type_name: descriptor.type_name,
                    mounted: false,
                },
            );
        }

        Some(CoordinatorBinding {
            type_id: descriptor.type_id,
            type_name: descriptor.type_name,
            slot: CoordinatorSlot::Keyed(key.to_string()),
        })
    }

    /// Stateless flavor: claim an available pooled instance for this pass,
    /// or construct a new one. Instances are chosen by availability and
    /// are not stable across passes.
    fn lookup_or_create_pooled(&mut self, descriptor: &CoordinatorDescriptor) -> CoordinatorBinding {
        let needs_reconcile = &mut self.needs_reconcile;
        let pool = self.pools.entry(descriptor.type_id).or_default();

        let index = match pool.iter().position(|entry| !entry.in_use) {
            Some(index) => {
                let entry = &mut pool[index];
                entry.in_use = true;
                entry.used_this_pass = true;
                entry.coordinator.update_props(&descriptor.props);
                index
            }
            None => {
                let mut coordinator = (descriptor.construct)();
                coordinator.update_props(&descriptor.props);
                let mut cx = CoordinatorCx {
                    key: STATELESS_KEY,
                    needs_reconcile,
                };
                coordinator.on_init(&mut cx);
                pool.push(PoolEntry {
                    coordinator,
                    mounted: false,
                    in_use: true,
                    used_this_pass: true,
                });
                pool.len() - 1
            }
        };

        CoordinatorBinding {
            type_id: descriptor.type_id,
            type_name: descriptor.type_name,
            slot: CoordinatorSlot::Pooled(index),
        }
    }

    /// Evict every keyed entry whose key was not touched during this pass,
    /// and every pooled instance that went unused. The teardown hook runs
    /// before removal; eviction releases state.
    pub(crate) fn sweep(&mut self) {
        let dead: Vec<(TypeId, String)> = self
            .keyed
            .keys()
            .filter(|key| !self.touched.contains(*key))
            .cloned()
            .collect();

        for table_key in dead {
            if let Some(mut entry) = self.keyed.remove(&table_key) {
                debug!(
                    coordinator = entry.type_name,
                    key = %table_key.1,
                    "evicting coordinator"
                );
                entry.coordinator.on_teardown();
            }
        }

        for pool in self.pools.values_mut() {
            for entry in pool.iter_mut().filter(|e| !e.used_this_pass) {
                entry.coordinator.on_teardown();
            }
            pool.retain(|entry| entry.used_this_pass);
        }
        self.pools.retain(|_, pool| !pool.is_empty());
    }

    /// Fire `on_mount` once, the first time the bound element is attached.
    pub(crate) fn notify_mount(&mut self, binding: &CoordinatorBinding) {
        let needs_reconcile = &mut self.needs_reconcile;
        match &binding.slot {
            CoordinatorSlot::Keyed(key) => {
                let table_key = (binding.type_id, key.clone());
                if let Some(entry) = self.keyed.get_mut(&table_key)
                    && !entry.mounted
                {
                    entry.mounted = true;
                    let mut cx = CoordinatorCx {
                        key,
                        needs_reconcile,
                    };
                    entry.coordinator.on_mount(&mut cx);
                }
            }
            CoordinatorSlot::Pooled(index) => {
                if let Some(entry) = self
                    .pools
                    .get_mut(&binding.type_id)
                    .and_then(|pool| pool.get_mut(*index))
                    && !entry.mounted
                {
                    entry.mounted = true;
                    let mut cx = CoordinatorCx {
                        key: STATELESS_KEY,
                        needs_reconcile,
                    };
                    entry.coordinator.on_mount(&mut cx);
                }
            }
        }
    }

    /// Frame committed for the bound element this pass.
    pub(crate) fn notify_layout(&mut self, binding: &CoordinatorBinding, frame: Rect) {
        match &binding.slot {
            CoordinatorSlot::Keyed(key) => {
                let table_key = (binding.type_id, key.clone());
                if let Some(entry) = self.keyed.get_mut(&table_key) {
                    entry.coordinator.did_layout(frame);
                }
            }
            CoordinatorSlot::Pooled(index) => {
                if let Some(entry) = self
                    .pools
                    .get_mut(&binding.type_id)
                    .and_then(|pool| pool.get_mut(*index))
                {
                    entry.coordinator.did_layout(frame);
                }
            }
        }
    }

    /// Typed access to a keyed coordinator. `None` after eviction.
    pub fn get<C: Coordinator>(&self, key: &str) -> Option<&C> {
        self.keyed
            .get(&(TypeId::of::<C>(), key.to_string()))
            .and_then(|entry| entry.coordinator.downcast_ref())
    }

    /// Typed mutable access to a keyed coordinator. `None` after eviction.
    pub fn get_mut<C: Coordinator>(&mut self, key: &str) -> Option<&mut C> {
        self.keyed
            .get_mut(&(TypeId::of::<C>(), key.to_string()))
            .and_then(|entry| entry.coordinator.downcast_mut())
    }

    /// Number of live coordinators (keyed and pooled).
    pub fn len(&self) -> usize {
        self.keyed.len() + self.pools.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A coordinator hook requested another pass; reading resets the flag.
    pub(crate) fn take_needs_reconcile(&mut self) -> bool {
        std::mem::take(&mut self.needs_reconcile)
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::types::Props;

    #[derive(Default)]
    struct Counter {
        count: i64,
        inits: usize,
        label: String,
        torn_down: Option<Arc<AtomicBool>>,
    }

    impl Coordinator for Counter {
        fn on_init(&mut self, _cx: &mut CoordinatorCx<'_>) {
            self.inits += 1;
        }

        fn update_props(&mut self, props: &Props) {
            if let Some(crate::types::PropValue::Text(label)) = props.get("label") {
                self.label = label.clone();
            }
        }

        fn on_teardown(&mut self) {
            if let Some(flag) = &self.torn_down {
                flag.store(true, Ordering::Relaxed);
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_lookup_creates_then_reuses() {
        let mut registry = CoordinatorRegistry::new();
        let desc = CoordinatorDescriptor::stateful("counter", Counter::default);

        registry.begin_pass();
        registry.lookup_or_create(&desc).unwrap();
        registry.get_mut::<Counter>("counter").unwrap().count = 5;

        registry.begin_pass();
        registry.lookup_or_create(&desc).unwrap();

        let counter = registry.get::<Counter>("counter").unwrap();
        assert_eq!(counter.count, 5, "state survives across passes");
        assert_eq!(counter.inits, 1, "on_init fires exactly once");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_props_replaced_state_untouched() {
        let mut registry = CoordinatorRegistry::new();
        registry.begin_pass();
        registry
            .lookup_or_create(
                &CoordinatorDescriptor::stateful("c", Counter::default)
                    .with_props(Props::new().with("label", "first")),
            )
            .unwrap();
        registry.get_mut::<Counter>("c").unwrap().count = 3;

        registry.begin_pass();
        registry
            .lookup_or_create(
                &CoordinatorDescriptor::stateful("c", Counter::default)
                    .with_props(Props::new().with("label", "second")),
            )
            .unwrap();

        let counter = registry.get::<Counter>("c").unwrap();
        assert_eq!(counter.label, "second");
        assert_eq!(counter.count, 3);
    }

    #[test]
    fn test_sweep_evicts_untouched_keys() {
        let torn = Arc::new(AtomicBool::new(false));
        let torn_clone = torn.clone();

        let mut registry = CoordinatorRegistry::new();
        registry.begin_pass();
        registry
            .lookup_or_create(&CoordinatorDescriptor::stateful("gone", move || Counter {
                torn_down: Some(torn_clone.clone()),
                ..Counter::default()
            }))
            .unwrap();
        registry.sweep();
        assert!(!torn.load(Ordering::Relaxed));

        // Next pass references nothing; the sweep must evict.
        registry.begin_pass();
        registry.sweep();
        assert!(
            torn.load(Ordering::Relaxed),
            "teardown hook invoked before removal"
        );
        assert!(registry.get::<Counter>("gone").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_recreate_after_eviction_reapplies_initial_state() {
        let mut registry = CoordinatorRegistry::new();
        let desc = CoordinatorDescriptor::stateful("c", || Counter {
            count: 10,
            ..Counter::default()
        });

        registry.begin_pass();
        registry.lookup_or_create(&desc).unwrap();
        registry.get_mut::<Counter>("c").unwrap().count = 99;

        registry.begin_pass();
        registry.sweep();

        registry.begin_pass();
        registry.lookup_or_create(&desc).unwrap();
        assert_eq!(
            registry.get::<Counter>("c").unwrap().count,
            10,
            "brand-new instance starts from initial state"
        );
    }

    #[test]
    fn test_stateless_pooling_by_availability() {
        let mut registry = CoordinatorRegistry::new();
        let desc = CoordinatorDescriptor::stateless::<Counter>();

        registry.begin_pass();
        let a = registry.lookup_or_create(&desc).unwrap();
        let b = registry.lookup_or_create(&desc).unwrap();
        assert_ne!(a.slot, b.slot, "claimed instances are distinct within a pass");
        assert_eq!(registry.len(), 2);

        // Next pass claims only one; the sweep drops the spare.
        registry.begin_pass();
        registry.lookup_or_create(&desc).unwrap();
        registry.sweep();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let mut registry = CoordinatorRegistry::new();
        registry.begin_pass();

        let empty = CoordinatorDescriptor::stateful("", Counter::default);
        assert!(registry.lookup_or_create(&empty).is_none());

        let sentinel = CoordinatorDescriptor::stateful(STATELESS_KEY, Counter::default);
        assert!(registry.lookup_or_create(&sentinel).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mount_fires_once() {
        struct Mounting {
            mounts: usize,
        }
        impl Coordinator for Mounting {
            fn on_mount(&mut self, _cx: &mut CoordinatorCx<'_>) {
                self.mounts += 1;
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        let mut registry = CoordinatorRegistry::new();
        registry.begin_pass();
        let binding = registry
            .lookup_or_create(&CoordinatorDescriptor::stateful("m", || Mounting {
                mounts: 0,
            }))
            .unwrap();

        registry.notify_mount(&binding);
        registry.notify_mount(&binding);
        assert_eq!(registry.get::<Mounting>("m").unwrap().mounts, 1);
    }
}
