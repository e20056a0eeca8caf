//! In-process message plumbing: typed queues, endpoints, and the hive.
//!
//! ## Contents
//! - [`MessageQueue`] unbounded MPMC FIFO with a drop-time residual warning
//! - [`EventWriter`] / [`EventReader`] write- and read-only endpoints
//! - [`QueueHive`] channel-id → queue multiplexer with type-mismatch
//!   detection
//!
//! ## Quick reference
//! - **Producers** obtain an [`EventWriter`] from the hive and `write` /
//!   `write_bulk` from any thread.
//! - **Consumers** obtain an [`EventReader`] and `drain` on their own
//!   schedule (typically from a scheduler job).

mod endpoints;
mod hive;
mod queue;

pub use endpoints::{EventReader, EventWriter};
pub use hive::QueueHive;
pub use queue::MessageQueue;
