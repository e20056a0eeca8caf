//! Scheduler scenarios against scripted time, with the worker on its own
//! thread.
//!
//! The coordination pattern: a job signals the test over a channel and, when
//! the test must not race the worker, a follow-up job blocks the worker
//! until the test releases it. Clock jumps always go through
//! `Scheduler::with_clock` so the wait predicate observes them under its own
//! lock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use gantry::{ManualClock, MemorySink, MonoTime, Scheduler};

const WAIT: Duration = Duration::from_secs(5);

fn fixture(start_ms: u64) -> (Arc<ManualClock>, Arc<Scheduler>) {
    let clock = Arc::new(ManualClock::new(MonoTime::from_millis(start_ms)));
    let sink = Arc::new(MemorySink::new());
    let scheduler = Arc::new(Scheduler::new(clock.clone(), sink));
    (clock, scheduler)
}

#[test]
fn a_timeout_fires_once_the_clock_passes_its_deadline() {
    let (clock, scheduler) = fixture(0);

    let (fired_tx, fired_rx) = mpsc::channel();
    scheduler.set_timeout(
        Duration::from_millis(100),
        move || {
            let _ = fired_tx.send(());
        },
        "one-shot",
    );

    thread::scope(|scope| {
        scope.spawn(|| scheduler.run());

        // The deadline has not passed; nothing may fire yet.
        assert!(fired_rx.recv_timeout(Duration::from_millis(50)).is_err());

        scheduler.with_clock(|_| clock.set_now(MonoTime::from_millis(500)));
        fired_rx.recv_timeout(WAIT).expect("fires after the jump");

        scheduler.request_stop();
    });
}

#[test]
fn a_cancelled_timeout_never_fires() {
    let (clock, scheduler) = fixture(0);

    let (doomed_tx, doomed_rx) = mpsc::channel();
    let doomed = scheduler.set_timeout(
        Duration::from_millis(100),
        move || {
            let _ = doomed_tx.send(());
        },
        "doomed",
    );
    scheduler.cancel_job(doomed);

    // A later sentinel proves the worker got past the cancelled deadline.
    let (sentinel_tx, sentinel_rx) = mpsc::channel();
    scheduler.set_timeout(
        Duration::from_millis(200),
        move || {
            let _ = sentinel_tx.send(());
        },
        "sentinel",
    );

    thread::scope(|scope| {
        scope.spawn(|| scheduler.run());

        scheduler.with_clock(|_| clock.set_now(MonoTime::from_millis(500)));
        sentinel_rx.recv_timeout(WAIT).expect("sentinel fires");

        scheduler.request_stop();
    });

    assert!(doomed_rx.try_recv().is_err(), "cancelled job must not fire");
}

#[test]
fn an_interval_fires_once_per_elapsed_step() {
    let (clock, scheduler) = fixture(100);

    let fires = Arc::new(AtomicU32::new(0));
    let (reached_tx, reached_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Arc::new(Mutex::new(release_rx));

    {
        let fires = Arc::clone(&fires);
        let worker = Arc::clone(&scheduler);
        scheduler.set_interval(
            Duration::from_millis(50),
            move || {
                let fire = fires.fetch_add(1, Ordering::SeqCst);
                if fire < 3 {
                    let reached_tx = reached_tx.clone();
                    let release_rx = Arc::clone(&release_rx);
                    // Park the worker in a follow-up job: the next interval
                    // is then re-armed before the test advances the clock,
                    // so no step can be skipped or double-counted.
                    worker.do_now(
                        move || {
                            let _ = reached_tx.send(());
                            let _ = release_rx.lock().unwrap().recv();
                        },
                        "handshake",
                    );
                }
            },
            "interval",
        );
    }

    thread::scope(|scope| {
        scheduler.with_clock(|_| clock.set_now(MonoTime::from_millis(150)));
        scope.spawn(|| scheduler.run());

        reached_rx.recv_timeout(WAIT).expect("first fire");
        scheduler.with_clock(|_| clock.set_now(MonoTime::from_millis(200)));
        release_tx.send(()).unwrap();

        reached_rx.recv_timeout(WAIT).expect("second fire");
        scheduler.with_clock(|_| clock.set_now(MonoTime::from_millis(250)));
        release_tx.send(()).unwrap();

        reached_rx.recv_timeout(WAIT).expect("third fire");
        scheduler.request_stop();
        release_tx.send(()).unwrap();
    });

    assert_eq!(fires.load(Ordering::SeqCst), 3);
}

#[test]
fn submissions_are_accepted_while_the_worker_is_live() {
    let (clock, scheduler) = fixture(0);

    thread::scope(|scope| {
        scope.spawn(|| scheduler.run());

        // Submitted after run() started; observed on the next loop turn.
        let (fired_tx, fired_rx) = mpsc::channel();
        scheduler.set_timeout(
            Duration::from_millis(10),
            move || {
                let _ = fired_tx.send(());
            },
            "late submission",
        );

        scheduler.with_clock(|_| clock.set_now(MonoTime::from_millis(100)));
        fired_rx.recv_timeout(WAIT).expect("late submission fires");

        scheduler.request_stop();
    });
}
