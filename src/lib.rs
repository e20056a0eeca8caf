//! # gantry
//!
//! **Gantry** is a small application framework built around two pieces: a
//! timer-queue [`Scheduler`] driven by a pluggable [`Clock`], and a
//! type-keyed dependency [`Injector`]. Around them sit the supporting cast a
//! real program needs: typed in-process message queues, a logging seam, and
//! the locking substrate they all share.
//!
//! | Area            | Description                                                       | Key types / traits                        |
//! |-----------------|-------------------------------------------------------------------|-------------------------------------------|
//! | **Scheduling**  | One-shot, immediate, and recurring jobs on a single worker.       | [`Scheduler`], [`JobId`]                  |
//! | **Injection**   | Lazy, cached, cycle-checked construction of components.           | [`Injector`], [`FromInjector`], [`bind_impl!`] |
//! | **Messaging**   | Typed MPMC queues multiplexed by channel id.                      | [`QueueHive`], [`EventWriter`], [`EventReader`] |
//! | **Time**        | Monotonic clock abstraction with a scripted test double.          | [`Clock`], [`SystemClock`], [`ManualClock`] |
//! | **Logging**     | Seven-level sink seam over any backend.                           | [`LogSink`], [`TracingSink`], [`MemorySink`] |
//! | **Primitives**  | Lock-and-state cell, scope guard, type identity, typed storage.   | [`SyncCell`], [`Defer`], [`TypeKey`], [`TypeMap`] |
//! | **Errors**      | Typed failures for injection, storage, and channel conflicts.     | [`InjectError`], [`MapError`], [`HiveError`] |
//!
//! ```no_run
//! use std::time::Duration;
//! use gantry::{bind_impl, Clock, Injector, LogSink, Scheduler, SystemClock, TracingSink};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let injector = Injector::new();
//!     injector.add_default_recipe::<SystemClock>()?;
//!     injector.add_default_recipe::<TracingSink>()?;
//!     bind_impl!(injector, SystemClock => dyn Clock)?;
//!     bind_impl!(injector, TracingSink => dyn LogSink)?;
//!     injector.add_ctor_recipe::<Scheduler>()?;
//!
//!     let log = injector.get_impl::<dyn LogSink>()?;
//!     let scheduler = injector.get::<Scheduler>()?;
//!
//!     scheduler.set_interval(Duration::from_secs(1), move || log.info("tick"), "ticker");
//!     scheduler.run(); // blocks until request_stop()
//!     Ok(())
//! }
//! ```
//!
//! ---

mod clock;
mod defer;
mod error;
mod events;
mod injector;
mod log;
mod scheduler;
mod sync_cell;
mod type_key;
mod type_map;

// ---- Public re-exports ----

pub use clock::{Clock, ManualClock, MonoTime, SystemClock};
pub use defer::{defer, Defer};
pub use error::{HiveError, InjectError, MapError};
pub use events::{EventReader, EventWriter, MessageQueue, QueueHive};
pub use injector::{FromInjector, Injector, RecipeKind};
pub use log::{LogLevel, LogSink, MemorySink, TracingSink};
pub use scheduler::{JobId, Scheduler};
pub use sync_cell::SyncCell;
pub use type_key::{fnv1a_32, TypeKey};
pub use type_map::{InstanceId, TypeMap};
