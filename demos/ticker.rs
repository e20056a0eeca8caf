//! Minimal wiring demo: bind a real clock and a tracing sink, build the
//! scheduler through the injector, and log a tick once a second.
//!
//! Run with `cargo run --example ticker`; stop with ctrl-c.

use std::time::Duration;

use gantry::{bind_impl, Clock, Injector, LogSink, Scheduler, SystemClock, TracingSink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let injector = Injector::new();
    injector.add_default_recipe::<SystemClock>()?;
    injector.add_default_recipe::<TracingSink>()?;
    bind_impl!(injector, SystemClock => dyn Clock)?;
    bind_impl!(injector, TracingSink => dyn LogSink)?;
    injector.add_ctor_recipe::<Scheduler>()?;

    let log = injector.get_impl::<dyn LogSink>()?;
    let scheduler = injector.get::<Scheduler>()?;

    scheduler.set_interval(Duration::from_secs(1), move || log.info("tick"), "ticker");
    scheduler.run();
    Ok(())
}
