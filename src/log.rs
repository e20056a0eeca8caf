//! # Logging seam consumed by the framework.
//!
//! The framework never talks to a logging backend directly; it holds an
//! `Arc<dyn LogSink>` and emits rendered strings at one of seven levels.
//! Which backend sits behind the seam is the embedder's choice:
//!
//! - [`TracingSink`] forwards to [`tracing`] events (the production sink).
//! - [`MemorySink`] records entries for inspection (tests, probes).
//!
//! Internally only `error`, `warn`, and `info` are used.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::sync_cell::SyncCell;

/// Severity levels, least verbose first.
///
/// A sink set to level `L` emits messages at severities up to and including
/// `L`; [`LogLevel::Off`] silences everything.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Off = 0,
    Critical = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
    Debug = 5,
    Trace = 6,
}

impl LogLevel {
    /// Maps a raw level index back to a `LogLevel`, saturating at `Trace`.
    pub fn from_u8(raw: u8) -> LogLevel {
        match raw {
            0 => LogLevel::Off,
            1 => LogLevel::Critical,
            2 => LogLevel::Error,
            3 => LogLevel::Warn,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Destination for rendered log lines.
///
/// Implementations provide [`LogSink::log`] and [`LogSink::set_level`]; the
/// per-level helpers are derived.
pub trait LogSink: Send + Sync {
    /// Emits `msg` at `level`, subject to the sink's current level.
    fn log(&self, level: LogLevel, msg: &str);

    /// Adjusts the sink's verbosity threshold.
    fn set_level(&self, level: LogLevel);

    fn critical(&self, msg: &str) {
        self.log(LogLevel::Critical, msg);
    }

    fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }

    fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    fn trace(&self, msg: &str) {
        self.log(LogLevel::Trace, msg);
    }
}

/// Production sink forwarding to [`tracing`] events.
///
/// `Critical` maps onto `tracing::error!` (tracing has no higher level);
/// the rest map one-to-one. The level gate is an atomic so
/// `set_level` is callable from any thread.
pub struct TracingSink {
    level: AtomicU8,
}

impl TracingSink {
    pub fn new(initial: LogLevel) -> Self {
        Self {
            level: AtomicU8::new(initial as u8),
        }
    }

    fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, msg: &str) {
        if !self.enabled(level) {
            return;
        }
        match level {
            LogLevel::Critical | LogLevel::Error => tracing::error!("{msg}"),
            LogLevel::Warn => tracing::warn!("{msg}"),
            LogLevel::Info => tracing::info!("{msg}"),
            LogLevel::Debug => tracing::debug!("{msg}"),
            LogLevel::Trace => tracing::trace!("{msg}"),
            LogLevel::Off => {}
        }
    }

    fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }
}

/// Recording sink: keeps every emitted line for later assertions.
pub struct MemorySink {
    level: AtomicU8,
    entries: SyncCell<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    /// A sink recording everything up to `Trace`.
    pub fn new() -> Self {
        Self {
            level: AtomicU8::new(LogLevel::Trace as u8),
            entries: SyncCell::new(Vec::new()),
        }
    }

    /// Snapshot of the recorded entries, oldest first.
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().clone()
    }

    /// Whether any entry at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }

    /// Drops all recorded entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, msg: &str) {
        if level == LogLevel::Off || level as u8 > self.level.load(Ordering::Relaxed) {
            return;
        }
        self.entries.lock().push((level, msg.to_owned()));
    }

    fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }
}
