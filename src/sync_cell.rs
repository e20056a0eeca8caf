//! # SyncCell: a value and the mutex that guards it, as one unit.
//!
//! [`SyncCell`] pairs a `T` with a [`parking_lot::Mutex`] so that the state
//! and its lock cannot drift apart. Access always goes through a scoped
//! guard ([`SyncCell::lock`]) or a one-shot closure ([`SyncCell::transact`]).
//!
//! Condition-variable waits need the lock that guards the state they are
//! predicated on, but handing the raw mutex out would defeat the
//! abstraction. Instead the cell accepts an external [`Condvar`] and passes
//! its own lock to it ([`SyncCell::cv_wait`], [`SyncCell::cv_wait_for`]);
//! predicates run only while the lock is held and spurious wakeups are
//! absorbed by the wait loop.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Owned value behind a mutex, with condition-variable helpers.
pub struct SyncCell<T> {
    inner: Mutex<T>,
}

impl<T> SyncCell<T> {
    /// Wraps `value` behind a fresh mutex.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Acquires the lock and returns a guard that dereferences to the value.
    ///
    /// The lock is released when the guard goes out of scope, on every exit
    /// path.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the value and returns its result.
    ///
    /// The result type cannot borrow out of the guarded value: the closure's
    /// argument lifetime ends when `transact` returns.
    pub fn transact<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    /// Blocks on `cv` until `ready` returns true.
    ///
    /// The predicate is evaluated with the lock held, and re-evaluated after
    /// every wakeup, so spurious wakeups are invisible to callers.
    pub fn cv_wait(&self, cv: &Condvar, mut ready: impl FnMut(&mut T) -> bool) {
        let mut guard = self.inner.lock();
        while !ready(&mut guard) {
            cv.wait(&mut guard);
        }
    }

    /// Bounded variant of [`SyncCell::cv_wait`].
    ///
    /// Returns whether the predicate became true before `timeout` elapsed.
    pub fn cv_wait_for(
        &self,
        cv: &Condvar,
        timeout: Duration,
        mut ready: impl FnMut(&mut T) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock();
        while !ready(&mut guard) {
            if cv.wait_until(&mut guard, deadline).timed_out() {
                return ready(&mut guard);
            }
        }
        true
    }

    /// Consumes the cell and returns the value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Clone> Clone for SyncCell<T> {
    /// Locks the source cell while copying; the clone gets a fresh mutex.
    fn clone(&self) -> Self {
        Self::new(self.inner.lock().clone())
    }
}

impl<T: Default> Default for SyncCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SyncCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(guard) => f.debug_tuple("SyncCell").field(&*guard).finish(),
            None => f.write_str("SyncCell(<locked>)"),
        }
    }
}
