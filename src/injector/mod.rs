//! # Injector: a type-keyed dependency-injection container.
//!
//! The [`Injector`] builds and caches one instance per `(type, instance id)`
//! key, lazily, from registered recipes. Resolution for `get::<T>(id)`:
//!
//! 1. `T` is `Injector` → a handle sharing this container's state.
//! 2. A cached instance exists → a clone of its `Arc<T>`.
//! 3. An interface binding exists for `T` → route to the bound
//!    implementation, which stays cached under its own key.
//! 4. Otherwise run the concrete recipe, cache the result, and record the
//!    key so teardown can run in reverse construction order.
//!
//! Trait objects resolve through [`Injector::get_impl`] and are bound with
//! [`bind_impl!`]:
//!
//! ```
//! use gantry::{bind_impl, Injector, LogSink, MemorySink};
//!
//! let injector = Injector::new();
//! injector.add_default_recipe::<MemorySink>()?;
//! bind_impl!(injector, MemorySink => dyn LogSink)?;
//!
//! let sink = injector.get_impl::<dyn LogSink>()?;
//! sink.info("wired");
//! # Ok::<(), gantry::InjectError>(())
//! ```
//!
//! Recipes may recursively resolve their own dependencies: they run outside
//! the container's lock, and a per-thread in-flight set turns construction
//! cycles into [`InjectError::DependencyCycle`] instead of deadlock or
//! unbounded recursion.

mod recipe;

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::defer::defer;
use crate::error::{InjectError, MapError};
use crate::sync_cell::SyncCell;
use crate::type_key::TypeKey;
use crate::type_map::{InstanceId, TypeMap};

pub use recipe::{FromInjector, RecipeKind};
use recipe::{ConcreteRecipe, InterfaceRecipe, RecipeEntry};

thread_local! {
    // Types currently under construction on this thread, per container, so
    // concurrent resolution of disjoint graphs never cross-contaminates.
    static IN_FLIGHT: RefCell<HashMap<usize, HashSet<u32>>> = RefCell::new(HashMap::new());
}

#[derive(Default)]
struct State {
    instances: TypeMap,
    recipes: HashMap<u32, RecipeEntry>,
    // Insertion order of cached instances; replayed in reverse on teardown
    // so dependents are released before their dependencies.
    order: Vec<(u32, InstanceId)>,
}

struct Shared {
    state: SyncCell<State>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        let order = std::mem::take(&mut state.order);
        for (hash, id) in order.into_iter().rev() {
            state.instances.remove(hash, id);
        }
    }
}

/// Dependency-injection container. Handles are cheap clones sharing one
/// underlying store.
#[derive(Clone)]
pub struct Injector {
    shared: Arc<Shared>,
}

impl Injector {
    /// An empty container: no recipes, no cached instances.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: SyncCell::new(State::default()),
            }),
        }
    }

    /// Registers a concrete recipe producing `T`.
    ///
    /// The recipe runs on first [`Injector::get`] for `T` and on every
    /// [`Injector::create`]; it receives this injector and the instance id
    /// being resolved, and may recursively resolve its own dependencies.
    ///
    /// Fails with [`InjectError::RecipeExists`] if any recipe for `T` is
    /// already registered.
    pub fn add_recipe<T, F>(&self, recipe: F) -> Result<(), InjectError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector, InstanceId) -> Result<T, InjectError> + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let mut state = self.shared.state.lock();
        if state.recipes.contains_key(&key.hash()) {
            return Err(InjectError::RecipeExists {
                type_name: key.name(),
            });
        }
        state.recipes.insert(
            key.hash(),
            RecipeEntry {
                kind: RecipeKind::Concrete,
                type_name: key.name(),
                func: Box::new(ConcreteRecipe::<T>(Arc::new(recipe))),
            },
        );
        Ok(())
    }

    /// Registers `T::default` as the recipe for `T`.
    ///
    /// Default-constructible types declare it here once instead of writing a
    /// closure.
    pub fn add_default_recipe<T: Default + Send + Sync + 'static>(
        &self,
    ) -> Result<(), InjectError> {
        self.add_recipe(|_, _| Ok(T::default()))
    }

    /// Registers `T::from_injector` as the recipe for `T`.
    pub fn add_ctor_recipe<T: FromInjector + Send + Sync + 'static>(
        &self,
    ) -> Result<(), InjectError> {
        self.add_recipe(T::from_injector)
    }

    /// Binds interface type `T` (usually `dyn Trait`) to implementation `I`.
    ///
    /// Requests for `T` resolve `I` under the same instance id and hand back
    /// the coerced handle, so `get_impl::<dyn Trait>()` and `get::<I>()`
    /// share one instance. `coerce` is the unsizing step the call site can
    /// spell and a generic body cannot; the [`bind_impl!`] macro writes it.
    ///
    /// Fails with [`InjectError::RecipeExists`] if `T` already has a recipe.
    pub fn bind_impl<I, T>(&self, coerce: fn(Arc<I>) -> Arc<T>) -> Result<(), InjectError>
    where
        I: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let mut state = self.shared.state.lock();
        if state.recipes.contains_key(&key.hash()) {
            return Err(InjectError::RecipeExists {
                type_name: key.name(),
            });
        }
        state.recipes.insert(
            key.hash(),
            RecipeEntry {
                kind: RecipeKind::Interface,
                type_name: key.name(),
                func: Box::new(InterfaceRecipe::<T>(Arc::new(
                    move |injector: &Injector, id: InstanceId| {
                        Ok(coerce(injector.get_keyed::<I>(id)?))
                    },
                ))),
            },
        );
        Ok(())
    }

    /// Produces a fresh, uncached `T` from its concrete recipe.
    ///
    /// The recipe runs on every call. Fails with
    /// [`InjectError::NotConstructible`] when no recipe exists and
    /// [`InjectError::RecipeKindMismatch`] when only an interface binding
    /// does.
    pub fn create<T: Send + Sync + 'static>(&self) -> Result<T, InjectError> {
        self.construct(InstanceId::DEFAULT)
    }

    /// The cached `T` in the default slot, constructed on first use.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectError> {
        self.get_keyed(InstanceId::DEFAULT)
    }

    /// The cached `T` under `id`, constructed on first use.
    ///
    /// Repeated calls with the same `id` return handles to the same
    /// instance; distinct ids hold distinct instances.
    pub fn get_keyed<T: Send + Sync + 'static>(
        &self,
        id: InstanceId,
    ) -> Result<Arc<T>, InjectError> {
        let key = TypeKey::of::<T>();

        // Asking for the container is an identity request.
        if TypeId::of::<T>() == TypeId::of::<Injector>() {
            let handle: Box<dyn Any> = Box::new(Arc::new(self.clone()));
            if let Ok(me) = handle.downcast::<Arc<T>>() {
                return Ok(*me);
            }
        }

        let routed = {
            let state = self.shared.state.lock();
            if let Some(cached) = state.instances.find_keyed::<Arc<T>>(key, id) {
                return Ok(Arc::clone(cached));
            }
            match state.recipes.get(&key.hash()) {
                Some(entry) if entry.kind == RecipeKind::Interface => Some((
                    entry.func.downcast_ref::<InterfaceRecipe<T>>().cloned(),
                    entry.type_name,
                )),
                _ => None,
            }
        };

        // A sized type can still be the target of a binding; route through
        // it so the instance stays cached under the implementation's key.
        if let Some((route, stored_name)) = routed {
            let route = route.ok_or(MapError::IdentityMismatch {
                expected: key.name(),
                found: stored_name,
                id,
            })?;
            self.enter_in_flight(key)?;
            let _leave = defer(|| self.leave_in_flight(key));
            return (route.0)(self, id);
        }

        let instance = Arc::new(self.construct::<T>(id)?);

        let mut state = self.shared.state.lock();
        // A racing resolver may have published first; defer to the cache.
        if let Some(cached) = state.instances.find_keyed::<Arc<T>>(key, id) {
            return Ok(Arc::clone(cached));
        }
        state.instances.insert_keyed(key, Arc::clone(&instance), id)?;
        state.order.push((key.hash(), id));
        Ok(instance)
    }

    /// Resolves interface type `T` through its binding, default slot.
    pub fn get_impl<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectError> {
        self.get_impl_keyed(InstanceId::DEFAULT)
    }

    /// Resolves interface type `T` through its binding, under `id`.
    ///
    /// The id propagates to the implementation, so per-instance wiring works
    /// through bindings. Fails with [`InjectError::UnboundInterface`] when
    /// nothing is bound and [`InjectError::RecipeKindMismatch`] when `T` has
    /// a concrete recipe instead.
    pub fn get_impl_keyed<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: InstanceId,
    ) -> Result<Arc<T>, InjectError> {
        let key = TypeKey::of::<T>();
        let (route, stored_name) = {
            let state = self.shared.state.lock();
            match state.recipes.get(&key.hash()) {
                None => {
                    return Err(InjectError::UnboundInterface {
                        type_name: key.name(),
                    })
                }
                Some(entry) if entry.kind == RecipeKind::Concrete => {
                    return Err(InjectError::RecipeKindMismatch {
                        type_name: key.name(),
                        expected: RecipeKind::Interface,
                        found: RecipeKind::Concrete,
                    })
                }
                Some(entry) => (
                    entry.func.downcast_ref::<InterfaceRecipe<T>>().cloned(),
                    entry.type_name,
                ),
            }
        };
        let route = route.ok_or(MapError::IdentityMismatch {
            expected: key.name(),
            found: stored_name,
            id,
        })?;
        self.enter_in_flight(key)?;
        let _leave = defer(|| self.leave_in_flight(key));
        (route.0)(self, id)
    }

    /// Runs the concrete construction path for `T` under the cycle guard.
    fn construct<T: Send + Sync + 'static>(&self, id: InstanceId) -> Result<T, InjectError> {
        let key = TypeKey::of::<T>();
        self.enter_in_flight(key)?;
        let _leave = defer(|| self.leave_in_flight(key));

        let found = {
            let state = self.shared.state.lock();
            match state.recipes.get(&key.hash()) {
                None => None,
                Some(entry) if entry.kind == RecipeKind::Interface => {
                    return Err(InjectError::RecipeKindMismatch {
                        type_name: key.name(),
                        expected: RecipeKind::Concrete,
                        found: RecipeKind::Interface,
                    })
                }
                Some(entry) => Some((
                    entry.func.downcast_ref::<ConcreteRecipe<T>>().cloned(),
                    entry.type_name,
                )),
            }
        };

        match found {
            None => Err(InjectError::NotConstructible {
                type_name: key.name(),
            }),
            Some((None, stored_name)) => Err(MapError::IdentityMismatch {
                expected: key.name(),
                found: stored_name,
                id,
            }
            .into()),
            Some((Some(recipe), _)) => (recipe.0)(self, id),
        }
    }

    fn store_token(&self) -> usize {
        Arc::as_ptr(&self.shared) as usize
    }

    fn enter_in_flight(&self, key: TypeKey) -> Result<(), InjectError> {
        IN_FLIGHT.with(|in_flight| {
            let mut per_store = in_flight.borrow_mut();
            if per_store.entry(self.store_token()).or_default().insert(key.hash()) {
                Ok(())
            } else {
                Err(InjectError::DependencyCycle {
                    type_name: key.name(),
                })
            }
        })
    }

    fn leave_in_flight(&self, key: TypeKey) {
        IN_FLIGHT.with(|in_flight| {
            let mut per_store = in_flight.borrow_mut();
            if let Some(entries) = per_store.get_mut(&self.store_token()) {
                entries.remove(&key.hash());
                if entries.is_empty() {
                    per_store.remove(&self.store_token());
                }
            }
        });
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

/// Binds an implementation type to an interface type on an [`Injector`].
///
/// `bind_impl!(injector, Impl => dyn Iface)` expands to
/// [`Injector::bind_impl`] with the `Arc<Impl> → Arc<dyn Iface>` coercion
/// spelled out.
#[macro_export]
macro_rules! bind_impl {
    ($injector:expr, $implementation:ty => $interface:ty) => {
        $injector.bind_impl::<$implementation, $interface>(
            |instance| -> ::std::sync::Arc<$interface> { instance },
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn data_ptr<T: ?Sized>(arc: &Arc<T>) -> *const u8 {
        Arc::as_ptr(arc) as *const u8
    }

    trait Speak: Send + Sync {
        fn word(&self) -> &'static str;
    }

    #[derive(Default)]
    struct English;

    impl Speak for English {
        fn word(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn get_returns_the_same_instance_every_time() {
        let injector = Injector::new();
        injector.add_default_recipe::<English>().unwrap();

        let first = injector.get::<English>().unwrap();
        let second = injector.get::<English>().unwrap();
        assert_eq!(data_ptr(&first), data_ptr(&second));
    }

    #[test]
    fn create_runs_the_recipe_every_time_and_get_only_once() {
        let injector = Injector::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        injector
            .add_recipe(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(42u32)
            })
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 0, "recipes are lazy");

        assert_eq!(*injector.get::<u32>().unwrap(), 42);
        injector.get::<u32>().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        injector.create::<u32>().unwrap();
        injector.create::<u32>().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let injector = Injector::new();
        injector.add_default_recipe::<English>().unwrap();

        assert!(matches!(
            injector.add_default_recipe::<English>(),
            Err(InjectError::RecipeExists { .. })
        ));
        assert!(matches!(
            bind_impl!(injector, English => English),
            Err(InjectError::RecipeExists { .. })
        ));
    }

    #[test]
    fn unregistered_type_is_not_constructible() {
        struct Orphan;
        let injector = Injector::new();
        assert!(matches!(
            injector.get::<Orphan>(),
            Err(InjectError::NotConstructible { .. })
        ));
    }

    #[test]
    fn binding_routes_interface_to_the_cached_implementation() {
        let injector = Injector::new();
        injector.add_default_recipe::<English>().unwrap();
        bind_impl!(injector, English => dyn Speak).unwrap();

        let spoken = injector.get_impl::<dyn Speak>().unwrap();
        let concrete = injector.get::<English>().unwrap();

        assert_eq!(spoken.word(), "hello");
        assert_eq!(data_ptr(&spoken), data_ptr(&concrete));
    }

    #[test]
    fn unbound_interface_is_reported() {
        let injector = Injector::new();
        assert!(matches!(
            injector.get_impl::<dyn Speak>(),
            Err(InjectError::UnboundInterface { .. })
        ));
    }

    #[test]
    fn concrete_recipe_does_not_satisfy_an_interface_request() {
        let injector = Injector::new();
        injector.add_default_recipe::<English>().unwrap();
        assert!(matches!(
            injector.get_impl_keyed::<English>(InstanceId::DEFAULT),
            Err(InjectError::RecipeKindMismatch { .. })
        ));
    }

    #[test]
    fn create_rejects_interface_bindings() {
        let injector = Injector::new();
        bind_impl!(injector, English => English).unwrap();

        assert!(matches!(
            injector.create::<English>(),
            Err(InjectError::RecipeKindMismatch { .. })
        ));
        // Resolving a self-binding would recurse forever; the cycle guard
        // reports it instead.
        assert!(matches!(
            injector.get::<English>(),
            Err(InjectError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn dependency_cycles_are_detected() {
        struct Alpha;
        struct Beta;

        let injector = Injector::new();
        injector
            .add_recipe(|injector, _| {
                injector.get::<Beta>()?;
                Ok(Alpha)
            })
            .unwrap();
        injector
            .add_recipe(|injector, _| {
                injector.get::<Alpha>()?;
                Ok(Beta)
            })
            .unwrap();

        assert!(matches!(
            injector.get::<Alpha>(),
            Err(InjectError::DependencyCycle { .. })
        ));
        assert!(matches!(
            injector.get::<Beta>(),
            Err(InjectError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn nested_dependency_cycles_are_detected() {
        struct A;
        struct B;
        struct C;

        let injector = Injector::new();
        injector
            .add_recipe(|injector, _| {
                injector.get::<C>()?;
                Ok(A)
            })
            .unwrap();
        injector
            .add_recipe(|injector, _| {
                injector.get::<A>()?;
                Ok(B)
            })
            .unwrap();
        injector
            .add_recipe(|injector, _| {
                injector.get::<B>()?;
                Ok(C)
            })
            .unwrap();

        assert!(matches!(
            injector.get::<A>(),
            Err(InjectError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn failed_construction_caches_nothing() {
        let injector = Injector::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&attempts);
        injector
            .add_recipe(move |_, _| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(InjectError::NotConstructible {
                        type_name: "warming up",
                    })
                } else {
                    Ok(English)
                }
            })
            .unwrap();

        assert!(injector.get::<English>().is_err());
        assert!(injector.get::<English>().is_ok());
        injector.get::<English>().unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2, "one failure, one cached build");
    }

    #[test]
    fn instance_ids_hold_distinct_instances() {
        let injector = Injector::new();
        injector.add_default_recipe::<English>().unwrap();

        let default = injector.get::<English>().unwrap();
        let zero_a = injector.get_keyed::<English>(InstanceId::new(0)).unwrap();
        let zero_b = injector.get_keyed::<English>(InstanceId::new(0)).unwrap();
        let one = injector.get_keyed::<English>(InstanceId::new(1)).unwrap();

        assert_ne!(data_ptr(&default), data_ptr(&zero_a));
        assert_ne!(data_ptr(&default), data_ptr(&one));
        assert_ne!(data_ptr(&zero_a), data_ptr(&one));
        assert_eq!(data_ptr(&zero_a), data_ptr(&zero_b));
    }

    #[test]
    fn bindings_propagate_instance_ids() {
        let injector = Injector::new();
        injector.add_default_recipe::<English>().unwrap();
        bind_impl!(injector, English => dyn Speak).unwrap();

        let default_iface = injector.get_impl::<dyn Speak>().unwrap();
        let zero_iface = injector
            .get_impl_keyed::<dyn Speak>(InstanceId::new(0))
            .unwrap();
        let zero_concrete = injector.get_keyed::<English>(InstanceId::new(0)).unwrap();

        assert_ne!(data_ptr(&default_iface), data_ptr(&zero_iface));
        assert_eq!(data_ptr(&zero_iface), data_ptr(&zero_concrete));
    }

    #[test]
    fn ctor_recipes_pull_their_dependencies() {
        struct Service {
            clock: Arc<dyn Clock>,
        }

        impl FromInjector for Service {
            fn from_injector(injector: &Injector, _id: InstanceId) -> Result<Self, InjectError> {
                Ok(Self {
                    clock: injector.get_impl::<dyn Clock>()?,
                })
            }
        }

        let injector = Injector::new();
        injector.add_default_recipe::<ManualClock>().unwrap();
        bind_impl!(injector, ManualClock => dyn Clock).unwrap();
        injector.add_ctor_recipe::<Service>().unwrap();

        let service = injector.get::<Service>().unwrap();
        let clock = injector.get::<ManualClock>().unwrap();
        assert_eq!(data_ptr(&service.clock), data_ptr(&clock));
    }

    #[test]
    fn requesting_the_injector_returns_a_shared_handle() {
        let injector = Injector::new();
        let handle = injector.get::<Injector>().unwrap();

        handle.add_default_recipe::<English>().unwrap();
        assert!(injector.get::<English>().is_ok(), "handles share one store");
    }

    #[test]
    fn teardown_runs_in_reverse_construction_order() {
        struct Probe<const N: usize> {
            log: Arc<Mutex<Vec<usize>>>,
        }

        impl<const N: usize> Drop for Probe<N> {
            fn drop(&mut self) {
                self.log.lock().push(N);
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let injector = Injector::new();
            for_probe::<0>(&injector, &log);
            for_probe::<1>(&injector, &log);
            for_probe::<2>(&injector, &log);

            let _ = injector.get::<Probe<0>>().unwrap();
            let _ = injector.get::<Probe<1>>().unwrap();
            let _ = injector.get::<Probe<2>>().unwrap();
        }
        assert_eq!(*log.lock(), [2, 1, 0]);

        fn for_probe<const N: usize>(injector: &Injector, log: &Arc<Mutex<Vec<usize>>>) {
            let log = Arc::clone(log);
            injector
                .add_recipe(move |_, _| {
                    Ok(Probe::<N> {
                        log: Arc::clone(&log),
                    })
                })
                .unwrap();
        }
    }
}
