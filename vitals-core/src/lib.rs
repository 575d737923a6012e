//! This crate provides the core of the `vitals` metrics toolkit: tag
//! sets, the statsd-style line protocol and the non-blocking emitter
//! that batches lines into UDP-sized packets.
//!
//! `vitals-core` is meant for transport authors and for libraries that
//! want to emit measurements without pulling in the monitoring layer.
//! Applications should instead use the [`vitals`] crate, which comes
//! with a UDP transport and the recorder scheduler, thread load
//! estimator and sampling profiler built on top of this one.
//!
//! # Core Concepts
//!
//! Measurements enter through the [`MetricSink`] trait, implemented by
//! [`Client`]. A client renders nothing on the caller's thread: each
//! measurement is queued and a dedicated emitter thread renders it into
//! a line such as `app.requests:1|c|#path:login`, packs lines into
//! packets of at most [`ClientOptions::packet_size`] bytes and hands
//! them to a [`Transport`]. The queue is the only coupling between
//! callers and I/O; a slow or failing transport never blocks the code
//! being measured.
//!
//! Delivery failures are routed to the [`ErrorHandler`] configured in
//! [`ClientOptions`], never returned to the measuring call site.
//!
//! # Features
//!
//! - `test`: exposes the [`test`] module with a capturing transport.
//! - `debug-logs`: routes internal diagnostics through the `log` crate
//!   instead of stderr.
//!
//! [`vitals`]: https://docs.rs/vitals

#![warn(missing_docs)]

mod macros;

mod client;
mod error;
mod options;
mod packet;
mod protocol;
mod sink;
mod tags;
mod transport;
mod worker;

pub use crate::client::Client;
pub use crate::error::{Error, ErrorHandler};
pub use crate::options::ClientOptions;
pub use crate::protocol::{MetricKind, MetricValue, ParseMetricKindError};
pub use crate::sink::{MetricSink, NoopSink};
pub use crate::tags::Tags;
pub use crate::transport::{Transport, TransportFactory};

#[cfg(feature = "debug-logs")]
#[doc(hidden)]
pub use log as __log;
