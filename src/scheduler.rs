//! # Scheduler: a timer-queue worker over a pluggable clock.
//!
//! Jobs are closures with an absolute deadline and an optional repeat
//! interval, ordered by `(deadline, id)` so equal deadlines run in
//! submission order. One worker thread (whoever calls [`Scheduler::run`])
//! drains the queue; submissions and cancellation are accepted from any
//! thread at any time, including from inside a running job.
//!
//! ```text
//!   do_now / set_timeout / set_interval ──► [ (deadline, id) → job ]
//!                                                   │
//!                        cv notify ──► run(): wait until front is due
//!                                                   │
//!                                        pop, unlock, invoke, re-arm
//! ```
//!
//! The worker never sleeps against wall time directly: it computes its wait
//! budget from the clock it was constructed with and parks on a condition
//! variable. A scripted [`ManualClock`](crate::clock::ManualClock) therefore
//! drives it deterministically: jump the clock through
//! [`Scheduler::with_clock`] and the worker re-reads it under the same lock
//! its wait predicate uses.
//!
//! A recurring job whose next deadline is already in the past when it
//! re-arms (the clock jumped, or the job ran long) is coalesced to
//! `now + interval`: expired recurrences never pile up into a burst.
//!
//! Panics inside a job are contained: the worker logs
//! `job {id} ({desc}) panicked` and moves on.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Condvar;

use crate::clock::{Clock, MonoTime};
use crate::error::InjectError;
use crate::injector::{FromInjector, Injector};
use crate::log::LogSink;
use crate::sync_cell::SyncCell;
use crate::type_map::InstanceId;

/// Opaque handle to a submitted job, valid until it executes or is
/// cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type JobFn = Box<dyn FnMut() + Send>;

struct Job {
    id: JobId,
    // Zero means one-shot; the deadline lives in the queue key.
    interval: Duration,
    func: JobFn,
    desc: String,
}

struct SchedulerState {
    // The wait predicate reads the clock, so clock access shares this lock
    // with the rest of the state (a test clock may jump under it).
    clock: Arc<dyn Clock>,
    running: bool,
    next_id: u32,
    queue: BTreeMap<(MonoTime, JobId), Job>,
}

/// Single-worker timer-queue scheduler.
pub struct Scheduler {
    log: Arc<dyn LogSink>,
    state: SyncCell<SchedulerState>,
    cv: Condvar,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, log: Arc<dyn LogSink>) -> Self {
        Self {
            log,
            state: SyncCell::new(SchedulerState {
                clock,
                running: false,
                next_id: 1,
                queue: BTreeMap::new(),
            }),
            cv: Condvar::new(),
        }
    }

    /// Schedules `func` to run as soon as the worker gets to it.
    ///
    /// The job's deadline is the submission instant.
    pub fn do_now(&self, func: impl FnMut() + Send + 'static, desc: impl Into<String>) -> JobId {
        self.schedule(Duration::ZERO, Box::new(func), false, desc.into())
    }

    /// Schedules `func` to run once at now + `delay`.
    pub fn set_timeout(
        &self,
        delay: Duration,
        func: impl FnMut() + Send + 'static,
        desc: impl Into<String>,
    ) -> JobId {
        self.schedule(delay, Box::new(func), false, desc.into())
    }

    /// Schedules `func` to run every `delay`, first firing at now + `delay`.
    pub fn set_interval(
        &self,
        delay: Duration,
        func: impl FnMut() + Send + 'static,
        desc: impl Into<String>,
    ) -> JobId {
        self.schedule(delay, Box::new(func), true, desc.into())
    }

    /// Removes a pending job.
    ///
    /// A job already handed to the worker can no longer be cancelled; an
    /// unknown id is logged at error level and otherwise ignored.
    pub fn cancel_job(&self, id: JobId) {
        let mut state = self.state.lock();
        let key = state.queue.keys().copied().find(|&(_, job_id)| job_id == id);
        match key {
            Some(key) => {
                state.queue.remove(&key);
            }
            None => self.log.error(&format!("no job found with id {id}")),
        }
    }

    /// Runs `f` against the scheduler's clock while holding the state lock,
    /// then wakes the worker.
    ///
    /// This is how tests jump a scripted clock without racing the wait
    /// predicate.
    pub fn with_clock<R>(&self, f: impl FnOnce(&Arc<dyn Clock>) -> R) -> R {
        let result = {
            let state = self.state.lock();
            f(&state.clock)
        };
        self.cv.notify_all();
        result
    }

    /// The worker loop. Blocks the calling thread until
    /// [`Scheduler::request_stop`].
    pub fn run(&self) {
        self.state.lock().running = true;

        loop {
            let front = {
                let state = self.state.lock();
                if !state.running {
                    break;
                }
                state.queue.keys().next().copied()
            };

            let Some((next_deadline, _)) = front else {
                self.state
                    .cv_wait(&self.cv, |state| !state.running || !state.queue.is_empty());
                continue;
            };

            // Park until the front job is due, measuring the budget against
            // the scheduler's own clock. Wake early on stop, on the front
            // entry changing, or on the front becoming ready; the predicate
            // re-reads the clock under the lock because a test double may
            // jump it there.
            let budget = self
                .state
                .transact(|state| next_deadline.saturating_since(state.clock.now()));
            if !budget.is_zero() {
                self.state.cv_wait_for(&self.cv, budget, |state| {
                    if !state.running {
                        return true;
                    }
                    match state.queue.keys().next() {
                        Some(&(front_deadline, _)) => {
                            front_deadline != next_deadline
                                || front_deadline <= state.clock.now()
                        }
                        None => true,
                    }
                });
            }

            self.drain_ready();
        }
    }

    /// Stops the worker. Safe from any thread, including from inside a job;
    /// the job that is currently executing runs to completion.
    pub fn request_stop(&self) {
        self.state.lock().running = false;
        self.cv.notify_all();
    }

    /// Executes every job whose deadline has passed, re-arming recurring
    /// ones.
    fn drain_ready(&self) {
        loop {
            let (deadline, mut job) = {
                let mut state = self.state.lock();
                if !state.running {
                    break;
                }
                let now = state.clock.now();
                let Some(&(deadline, id)) = state.queue.keys().next() else {
                    break;
                };
                if deadline > now {
                    break;
                }
                let Some(job) = state.queue.remove(&(deadline, id)) else {
                    break;
                };
                (deadline, job)
            };

            // The lock is not held while the job runs; jobs may freely
            // submit, cancel, or stop the scheduler.
            if catch_unwind(AssertUnwindSafe(|| (job.func)())).is_err() {
                self.log
                    .error(&format!("job {} ({}) panicked", job.id, job.desc));
            }

            if !job.interval.is_zero() {
                let mut state = self.state.lock();
                let now = state.clock.now();
                let mut next = deadline + job.interval;
                // Clock-jump coalescing: an already-expired recurrence fires
                // once relative to now instead of replaying every missed
                // interval.
                if next <= now {
                    next = now + job.interval;
                }
                state.queue.insert((next, job.id), job);
            }
        }
    }

    fn schedule(&self, delay: Duration, func: JobFn, repeat: bool, desc: String) -> JobId {
        let id = {
            let mut state = self.state.lock();
            let id = JobId(state.next_id);
            state.next_id += 1;

            let deadline = state.clock.now() + delay;
            let interval = if repeat { delay } else { Duration::ZERO };
            state.queue.insert(
                (deadline, id),
                Job {
                    id,
                    interval,
                    func,
                    desc,
                },
            );
            id
        };
        self.cv.notify_one();
        id
    }
}

impl Drop for Scheduler {
    /// Stops the worker. Does not join it; the owner joins.
    fn drop(&mut self) {
        self.request_stop();
    }
}

impl FromInjector for Scheduler {
    fn from_injector(injector: &Injector, _id: InstanceId) -> Result<Self, InjectError> {
        Ok(Scheduler::new(
            injector.get_impl::<dyn Clock>()?,
            injector.get_impl::<dyn LogSink>()?,
        ))
    }
}
