//! Recipe bookkeeping for the [`Injector`].
//!
//! A recipe is a user-registered function that produces (or routes to) an
//! instance of one type. Two kinds exist and may not be mixed per type:
//!
//! - *concrete* recipes build a fresh `T`;
//! - *interface* recipes return a shared handle to an implementation that is
//!   cached under its own key; this is the resolution path for trait objects.
//!
//! Recipes are stored type-erased behind `dyn Any`; the typed wrappers here
//! are what the erasure round-trips through.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::InjectError;
use crate::injector::Injector;
use crate::type_map::InstanceId;

/// Which kind of recipe is registered for a type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipeKind {
    /// Builds a fresh value.
    Concrete,
    /// Routes to a cached implementation.
    Interface,
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeKind::Concrete => f.write_str("a concrete recipe"),
            RecipeKind::Interface => f.write_str("an interface binding"),
        }
    }
}

/// Typed wrapper around a concrete recipe, shared so it can be invoked
/// outside the injector's lock.
pub(crate) struct ConcreteRecipe<T>(
    pub(crate) Arc<dyn Fn(&Injector, InstanceId) -> Result<T, InjectError> + Send + Sync>,
);

impl<T> Clone for ConcreteRecipe<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Typed wrapper around an interface recipe. `T` is usually a trait object.
pub(crate) struct InterfaceRecipe<T: ?Sized>(
    pub(crate) Arc<dyn Fn(&Injector, InstanceId) -> Result<Arc<T>, InjectError> + Send + Sync>,
);

impl<T: ?Sized> Clone for InterfaceRecipe<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// One registered recipe, type-erased for heterogeneous storage.
pub(crate) struct RecipeEntry {
    pub(crate) kind: RecipeKind,
    pub(crate) type_name: &'static str,
    pub(crate) func: Box<dyn Any + Send + Sync>,
}

/// Constructor seam for [`Injector::add_ctor_recipe`].
///
/// The impl states explicitly which dependencies are shared and which are
/// fresh, in place of the parameter-qualifier dispatch a reflective language
/// would do:
///
/// ```
/// use std::sync::Arc;
/// use gantry::{Clock, FromInjector, InjectError, Injector, InstanceId};
///
/// struct Heartbeat {
///     clock: Arc<dyn Clock>,
/// }
///
/// impl FromInjector for Heartbeat {
///     fn from_injector(injector: &Injector, _id: InstanceId) -> Result<Self, InjectError> {
///         Ok(Self {
///             clock: injector.get_impl::<dyn Clock>()?,
///         })
///     }
/// }
/// ```
pub trait FromInjector: Sized {
    /// Builds `Self`, pulling dependencies from `injector`.
    ///
    /// `id` is the instance id the recipe was resolved under, so ctor
    /// recipes can fan per-instance wiring out to their dependencies.
    fn from_injector(injector: &Injector, id: InstanceId) -> Result<Self, InjectError>;
}
