//! Coordinator capability - per-node controllers that survive across passes.
//!
//! A coordinator owns internal `state` and externally supplied `props`.
//! Keyed (stateful) coordinators persist in the registry for as long as a
//! node references their key; stateless coordinators are pooled and reused
//! opportunistically within a pass under a reserved sentinel key.
//!
//! Lifecycle hooks, in order:
//! - `on_init` - exactly once, when the registry constructs the instance.
//! - `on_mount` - exactly once, the first time the bound element is
//!   attached to the visible hierarchy.
//! - `update_props` - every pass in which a node references the key.
//! - `did_layout` - every pass, after frames have been committed.
//! - `on_teardown` - once, when the end-of-pass sweep evicts the entry.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::engine::registry::CoordinatorRegistry;
use crate::types::{Props, Rect};

/// Reserved key under which stateless coordinators are pooled.
///
/// Caller-supplied keys must never collide with this value; it is not a
/// valid key for a stateful coordinator.
pub const STATELESS_KEY: &str = "<stateless>";

// =============================================================================
// Capability trait
// =============================================================================

/// The coordinator capability contract.
///
/// All hooks have default no-op implementations; implementors override the
/// ones they care about. `as_any`/`as_any_mut` enable typed access through
/// [`CoordinatorProvider`] and the registry accessors.
pub trait Coordinator: Any {
    /// Called exactly once when the registry constructs this instance.
    fn on_init(&mut self, _cx: &mut CoordinatorCx<'_>) {}

    /// Called exactly once, the first time the bound element becomes
    /// attached to the visible hierarchy.
    fn on_mount(&mut self, _cx: &mut CoordinatorCx<'_>) {}

    /// Fresh props for this pass. Props replace the previous set outright;
    /// internal state is untouched.
    fn update_props(&mut self, _props: &Props) {}

    /// The bound element's frame was just committed.
    fn did_layout(&mut self, _frame: Rect) {}

    /// The registry is about to evict this instance. State is released
    /// after this returns.
    fn on_teardown(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Coordinator {
    /// Typed downcast.
    pub fn downcast_ref<C: Coordinator>(&self) -> Option<&C> {
        self.as_any().downcast_ref()
    }

    /// Typed mutable downcast.
    pub fn downcast_mut<C: Coordinator>(&mut self) -> Option<&mut C> {
        self.as_any_mut().downcast_mut()
    }
}

// =============================================================================
// Hook context
// =============================================================================

/// Context handed to coordinator lifecycle hooks.
///
/// A reconciliation request raised here is coalesced: the owning context
/// runs one follow-up pass over the retained tree after the current pass
/// completes, never re-entering mid-pass.
pub struct CoordinatorCx<'a> {
    pub(crate) key: &'a str,
    pub(crate) needs_reconcile: &'a mut bool,
}

impl CoordinatorCx<'_> {
    /// The key this coordinator is registered under.
    pub fn key(&self) -> &str {
        self.key
    }

    /// Request another reconciliation pass once the current one completes.
    pub fn request_reconcile(&mut self) {
        *self.needs_reconcile = true;
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Identifies a coordinator by `(type, key)` plus the factory and props to
/// apply if one must be created.
///
/// The factory closure captures the initial state: a brand-new instance
/// constructed after an eviction starts from the same initial state again.
/// Stateless descriptors carry no key and resolve through the pooled
/// [`STATELESS_KEY`] flavor.
#[derive(Clone)]
pub struct CoordinatorDescriptor {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) key: Option<String>,
    pub(crate) construct: Arc<dyn Fn() -> Box<dyn Coordinator> + Send + Sync>,
    pub(crate) props: Props,
}

impl CoordinatorDescriptor {
    /// Descriptor for a keyed, stateful coordinator. `init` produces the
    /// instance (embedding its initial state) when the registry misses.
    pub fn stateful<C, F>(key: impl Into<String>, init: F) -> Self
    where
        C: Coordinator,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            key: Some(key.into()),
            construct: Arc::new(move || Box::new(init())),
            props: Props::new(),
        }
    }

    /// Descriptor for a pooled, stateless coordinator.
    pub fn stateless<C>() -> Self
    where
        C: Coordinator + Default,
    {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            key: None,
            construct: Arc::new(|| Box::new(C::default())),
            props: Props::new(),
        }
    }

    /// Props applied (replacing the previous set) every pass a node
    /// references this coordinator.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// The registration key: the caller's key for stateful coordinators,
    /// [`STATELESS_KEY`] for stateless ones.
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(STATELESS_KEY)
    }

    pub fn is_stateless(&self) -> bool {
        self.key.is_none()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for CoordinatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorDescriptor")
            .field("type", &self.type_name)
            .field("key", &self.key())
            .field("props", &self.props)
            .finish()
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Non-owning, typed handle to a keyed coordinator.
///
/// Providers hold only the `(type, key)` identity; they resolve through
/// the registry at access time and return `None` once the coordinator has
/// been evicted. This is the weak back-reference model: handles go absent,
/// they never dangle.
pub struct CoordinatorProvider<C> {
    key: String,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Coordinator> CoordinatorProvider<C> {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolve against the registry. `None` after eviction.
    pub fn get<'a>(&self, registry: &'a CoordinatorRegistry) -> Option<&'a C> {
        registry.get::<C>(&self.key)
    }

    /// Mutable resolve against the registry. `None` after eviction.
    pub fn get_mut<'a>(&self, registry: &'a mut CoordinatorRegistry) -> Option<&'a mut C> {
        registry.get_mut::<C>(&self.key)
    }
}

impl<C> fmt::Debug for CoordinatorProvider<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorProvider")
            .field("type", &std::any::type_name::<C>())
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        inits: usize,
    }

    impl Coordinator for Probe {
        fn on_init(&mut self, _cx: &mut CoordinatorCx<'_>) {
            self.inits += 1;
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_descriptor_keys() {
        let keyed = CoordinatorDescriptor::stateful("counter", Probe::default);
        assert_eq!(keyed.key(), "counter");
        assert!(!keyed.is_stateless());

        let pooled = CoordinatorDescriptor::stateless::<Probe>();
        assert_eq!(pooled.key(), STATELESS_KEY);
        assert!(pooled.is_stateless());
    }

    #[test]
    fn test_descriptor_factory_reconstructs_initial_state() {
        let desc = CoordinatorDescriptor::stateful("p", || Probe { inits: 7 });
        let a = (desc.construct)();
        let b = (desc.construct)();
        assert_eq!(a.downcast_ref::<Probe>().unwrap().inits, 7);
        assert_eq!(b.downcast_ref::<Probe>().unwrap().inits, 7);
    }

    #[test]
    fn test_dyn_downcast() {
        let mut boxed: Box<dyn Coordinator> = Box::new(Probe::default());
        assert!(boxed.downcast_ref::<Probe>().is_some());
        boxed.downcast_mut::<Probe>().unwrap().inits = 3;
        assert_eq!(boxed.downcast_ref::<Probe>().unwrap().inits, 3);
    }

    #[test]
    fn test_descriptor_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CoordinatorDescriptor>();
    }
}
