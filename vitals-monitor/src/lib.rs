//! Runtime monitoring for the `vitals` metrics toolkit: periodic
//! recording, per-thread load statistics and an adaptive sampling
//! profiler.
//!
//! The building blocks:
//!
//! - [`Recordable`]: a measurement source polled once per interval.
//! - [`Scheduler`]: the thread that polls registered recordables.
//! - [`ThreadIntrospector`]: the runtime's view of thread counters,
//!   identities and call stacks. Implement it for your runtime, or
//!   pass [`NoopIntrospector`] where none of that is available.
//! - [`ThreadStats`]: cpu and allocation statistics per live thread;
//!   marks busy threads for profiling.
//! - [`profiler`]: samples the stacks of marked threads and reports
//!   where they spend their time.
//! - [`TaskContext`]: measures individual closures instead of whole
//!   threads.
//!
//! [`Monitor`] assembles all of the above behind one surface; most
//! applications construct it through the `vitals` crate and never
//! touch the parts directly.

#![warn(missing_docs)]

mod introspect;
mod monitor;
mod recordable;
mod rules;
mod scheduler;
mod task;
mod thread_stats;

pub mod profiler;

#[cfg(test)]
mod testutil;

pub use crate::introspect::{
    NoopIntrospector, RuntimeCapabilities, StackFrame, ThreadCounters, ThreadIdentity,
    ThreadIntrospector,
};
pub use crate::monitor::{Monitor, MonitorOptions};
pub use crate::profiler::{ProfilerHandle, ProfilerOptions};
pub use crate::recordable::Recordable;
pub use crate::rules::{GroupPredicate, GroupRules};
pub use crate::scheduler::Scheduler;
pub use crate::task::{TaskContext, TaskMetrics};
pub use crate::thread_stats::{ThreadMetrics, ThreadStats};
