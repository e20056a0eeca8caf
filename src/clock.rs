//! # Monotonic time and the pluggable clock source.
//!
//! Everything time-related in the framework goes through [`Clock`], so real
//! time can be swapped for scripted time in tests:
//!
//! - [`SystemClock`] reads the platform monotonic clock, anchored at
//!   construction.
//! - [`ManualClock`] is driven explicitly with [`ManualClock::set_now`] /
//!   [`ManualClock::advance`], and its `sleep_until` parks callers on a
//!   barrier released by [`ManualClock::wake_sleepers`].
//!
//! [`MonoTime`] is a point in a monotonically non-decreasing time domain,
//! represented as the offset from the clock's epoch. A plain `Instant`
//! cannot play this role: its values cannot be fabricated, which is exactly
//! what a scripted clock has to do.

use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Condvar;

use crate::sync_cell::SyncCell;

/// A point in monotonic time, as the offset from the clock's epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonoTime(Duration);

impl MonoTime {
    /// The clock epoch itself.
    pub const ZERO: MonoTime = MonoTime(Duration::ZERO);

    pub const fn from_millis(millis: u64) -> Self {
        MonoTime(Duration::from_millis(millis))
    }

    pub const fn from_secs(secs: u64) -> Self {
        MonoTime(Duration::from_secs(secs))
    }

    /// Offset from the epoch.
    pub const fn since_epoch(&self) -> Duration {
        self.0
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: MonoTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for MonoTime {
    type Output = MonoTime;

    fn add(self, rhs: Duration) -> MonoTime {
        MonoTime(self.0 + rhs)
    }
}

impl AddAssign<Duration> for MonoTime {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs;
    }
}

impl From<Duration> for MonoTime {
    fn from(offset: Duration) -> Self {
        MonoTime(offset)
    }
}

/// Abstract monotonic time source.
///
/// The scheduler only ever calls [`Clock::now`]; [`Clock::sleep_until`] is a
/// separate capability for clients that want a blocking wait in the same
/// time domain.
pub trait Clock: Send + Sync {
    /// The current time point. Never decreases.
    fn now(&self) -> MonoTime;

    /// Blocks the calling thread until `deadline`.
    fn sleep_until(&self, deadline: MonoTime);
}

/// Production clock over the platform monotonic source.
///
/// The epoch is the moment of construction.
pub struct SystemClock {
    origin: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> MonoTime {
        MonoTime(self.origin.elapsed())
    }

    fn sleep_until(&self, deadline: MonoTime) {
        let remaining = deadline.saturating_since(self.now());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}

struct ManualState {
    now: MonoTime,
    generation: u64,
}

/// Scripted clock for deterministic tests.
///
/// Time only moves when told to. `sleep_until` ignores its argument and
/// parks the caller until the next [`ManualClock::wake_sleepers`], or
/// returns immediately once blocking is disabled via
/// [`ManualClock::set_should_block`].
pub struct ManualClock {
    state: SyncCell<ManualState>,
    wake: Condvar,
    should_block: AtomicBool,
}

impl ManualClock {
    pub fn new(initial: MonoTime) -> Self {
        Self {
            state: SyncCell::new(ManualState {
                now: initial,
                generation: 0,
            }),
            wake: Condvar::new(),
            should_block: AtomicBool::new(true),
        }
    }

    /// Jumps the clock to `now`.
    pub fn set_now(&self, now: MonoTime) {
        self.state.lock().now = now;
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.state.lock().now += delta;
    }

    /// When `false`, `sleep_until` returns immediately.
    pub fn set_should_block(&self, should_block: bool) {
        self.should_block.store(should_block, Ordering::SeqCst);
    }

    /// Releases every thread currently parked in `sleep_until`.
    ///
    /// May be called repeatedly to release successive waves of sleepers.
    pub fn wake_sleepers(&self) {
        self.state.lock().generation += 1;
        self.wake.notify_all();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(MonoTime::ZERO)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> MonoTime {
        self.state.lock().now
    }

    fn sleep_until(&self, _deadline: MonoTime) {
        if !self.should_block.load(Ordering::SeqCst) {
            return;
        }
        let parked_at = self.state.lock().generation;
        self.state
            .cv_wait(&self.wake, |state| state.generation != parked_at);
    }
}
