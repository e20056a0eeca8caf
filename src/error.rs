//! # Error types for the injector, type map, and queue hive.
//!
//! Three enums, one per subsystem:
//!
//! - [`InjectError`]: failures while registering recipes or resolving
//!   dependencies.
//! - [`MapError`]: failures of the underlying type-keyed storage.
//! - [`HiveError`]: channel/type conflicts in the queue hive.
//!
//! [`MapError`] and [`HiveError`] convert into [`InjectError`], since
//! recipes routinely touch both. Every variant carries the type names
//! involved; each enum provides `as_label` for stable log/metric labels.
//!
//! The scheduler deliberately has no error type: a cancelled-but-missing job
//! is logged, and a panicking job is contained and logged, never propagated.

use thiserror::Error;

use crate::injector::RecipeKind;
use crate::type_map::InstanceId;

/// Errors produced while registering or resolving dependencies.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InjectError {
    /// A recipe for the type is already registered.
    #[error("a recipe for `{type_name}` is already registered")]
    RecipeExists {
        /// The type the duplicate registration targeted.
        type_name: &'static str,
    },

    /// An interface type was requested but no implementation is bound.
    #[error("`{type_name}` has no bound implementation; bind one with `bind_impl!`")]
    UnboundInterface {
        /// The interface type requested.
        type_name: &'static str,
    },

    /// Construction re-entered a type that is already being constructed.
    #[error("dependency cycle detected while constructing `{type_name}`")]
    DependencyCycle {
        /// The type whose construction closed the cycle.
        type_name: &'static str,
    },

    /// No recipe is registered and the type cannot be produced.
    #[error(
        "cannot construct `{type_name}`: no recipe registered; \
         use `add_recipe`, `add_ctor_recipe`, or `add_default_recipe`"
    )]
    NotConstructible {
        /// The type that could not be produced.
        type_name: &'static str,
    },

    /// The registered recipe is of the wrong kind for the request.
    #[error("the recipe for `{type_name}` is {found}, but {expected} was required")]
    RecipeKindMismatch {
        /// The type whose recipe was consulted.
        type_name: &'static str,
        /// The kind the operation needed.
        expected: RecipeKind,
        /// The kind actually registered.
        found: RecipeKind,
    },

    /// A storage-level failure surfaced during resolution.
    #[error(transparent)]
    Map(#[from] MapError),

    /// A queue-hive failure surfaced inside a recipe.
    #[error(transparent)]
    Hive(#[from] HiveError),
}

impl InjectError {
    /// Short stable label (snake_case) for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            InjectError::RecipeExists { .. } => "inject_recipe_exists",
            InjectError::UnboundInterface { .. } => "inject_unbound_interface",
            InjectError::DependencyCycle { .. } => "inject_dependency_cycle",
            InjectError::NotConstructible { .. } => "inject_not_constructible",
            InjectError::RecipeKindMismatch { .. } => "inject_recipe_kind_mismatch",
            InjectError::Map(e) => e.as_label(),
            InjectError::Hive(e) => e.as_label(),
        }
    }
}

/// Errors produced by [`TypeMap`](crate::type_map::TypeMap) operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MapError {
    /// The `(type, instance)` slot is already occupied.
    #[error("an entry for `{type_name}` (instance {id}) is already present")]
    AlreadyPresent {
        type_name: &'static str,
        id: InstanceId,
    },

    /// No entry exists under the `(type, instance)` slot.
    #[error("no entry for `{type_name}` (instance {id})")]
    NotFound {
        type_name: &'static str,
        id: InstanceId,
    },

    /// The slot exists but holds a value of a different type.
    #[error("entry at instance {id} holds `{found}`, not the requested `{expected}`")]
    IdentityMismatch {
        expected: &'static str,
        found: &'static str,
        id: InstanceId,
    },
}

impl MapError {
    /// Short stable label (snake_case) for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            MapError::AlreadyPresent { .. } => "map_already_present",
            MapError::NotFound { .. } => "map_not_found",
            MapError::IdentityMismatch { .. } => "map_identity_mismatch",
        }
    }
}

/// Errors produced by [`QueueHive`](crate::events::QueueHive).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HiveError {
    /// A channel id was reopened with a different message type.
    #[error("channel {id} already carries `{stored}`; cannot reopen it as `{requested}`")]
    TypeMismatch {
        /// The contested channel id.
        id: u64,
        /// Message type the channel was created with.
        stored: &'static str,
        /// Message type of the rejected request.
        requested: &'static str,
    },
}

impl HiveError {
    /// Short stable label (snake_case) for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HiveError::TypeMismatch { .. } => "hive_type_mismatch",
        }
    }
}
