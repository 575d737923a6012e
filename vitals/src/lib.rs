//! This crate provides the `vitals` metrics toolkit: a statsd-flavored
//! metrics client plus, behind the `monitor` feature, runtime
//! monitoring with per-thread statistics and an adaptive sampling
//! profiler.
//!
//! The most convenient way to use this library is the [`init`]
//! function, which creates the client and starts its emitter thread.
//! It returns a guard that flushes queued measurements when dropped:
//!
//! ```
//! use vitals::MetricSink;
//!
//! let vitals = vitals::init(vitals::ClientOptions {
//!     addr: "127.0.0.1:8125".into(),
//!     prefix: "app".into(),
//!     ..Default::default()
//! });
//!
//! vitals.count("requests", 1, &vitals::Tags::of("path", "/login"));
//! vitals.time("render", 183, &vitals::Tags::new());
//! ```
//!
//! # Metrics
//!
//! Measurements go through the [`MetricSink`] trait: counters, gauges,
//! histograms, timings and set members. Each call queues one line in
//! the statsd dialect, for example `app.requests:1|c|#path:login`; a
//! dedicated thread packs lines into UDP-sized packets and hands them
//! to the transport. Nothing here blocks the measuring thread.
//!
//! # Monitoring
//!
//! With the `monitor` feature the [`monitor`] module adds periodic
//! recording on top of any sink. A [`Monitor`](monitor::Monitor) polls
//! registered [`Recordable`](monitor::Recordable)s at a fixed interval
//! and, when the runtime can enumerate its threads, records per-thread
//! cpu and allocation statistics and profiles the threads that stay
//! busy:
//!
//! ```
//! # #[cfg(feature = "monitor")]
//! # fn example() -> Result<(), vitals::Error> {
//! use std::sync::Arc;
//! use vitals::monitor::{Monitor, MonitorOptions, NoopIntrospector};
//!
//! let vitals = vitals::init("127.0.0.1:8125");
//! let mut monitor = Monitor::new(
//!     vitals.client(),
//!     Arc::new(NoopIntrospector),
//!     MonitorOptions::default(),
//! );
//! monitor.register("queue", |sink: &dyn vitals::MetricSink| {
//!     sink.gauge("queue.depth", 42, &Default::default());
//!     anyhow::Ok(())
//! })?;
//! monitor.start()?;
//! # monitor.stop();
//! # Ok(())
//! # }
//! # #[cfg(feature = "monitor")] example().unwrap();
//! ```
//!
//! Wire up a [`ThreadIntrospector`](monitor::ThreadIntrospector) for
//! your runtime to get the thread statistics and the profiler; the
//! `NoopIntrospector` above keeps just the scheduler.
//!
//! # Features
//!
//! - `monitor` (default): the runtime monitoring layer.
//! - `test`: a capturing transport for asserting on emitted lines.
//! - `debug-logs`: routes internal diagnostics through the `log` crate.

#![warn(missing_docs)]

mod defaults;
mod init;

pub mod transports;

// public api from other crates
pub use vitals_core::*;
#[cfg(feature = "monitor")]
pub use vitals_monitor as monitor;

// public api from this crate
pub use crate::defaults::apply_defaults;
pub use crate::init::{init, InitGuard};
