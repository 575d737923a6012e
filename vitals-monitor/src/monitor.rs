use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use vitals_core::{Error, ErrorHandler, MetricSink};

use crate::introspect::ThreadIntrospector;
use crate::profiler::{self, ProfilerHandle, ProfilerOptions};
use crate::recordable::Recordable;
use crate::rules::GroupRules;
use crate::scheduler::Scheduler;
use crate::task::TaskContext;
use crate::thread_stats::{ThreadMetrics, ThreadStats, DEFAULT_DISALLOWED};

/// Configuration for a [`Monitor`].
///
/// The defaults record thread statistics every ten seconds and profile
/// any thread that spends more than five percent of its wall time on
/// cpu. All fields are public so options can be built literally, with
/// the rest coming from `Default::default()`.
#[derive(Clone)]
pub struct MonitorOptions {
    /// How often registered recordables run.
    ///
    /// Defaults to ten seconds.
    pub interval: Duration,
    /// Whether the sampling profiler runs at all.
    ///
    /// Defaults to `true`. Even when enabled the profiler only starts
    /// if the introspector reports cpu timing.
    pub profiling: bool,
    /// The cpu percentage at which a thread starts being profiled.
    ///
    /// Defaults to `5.0`.
    pub cpu_threshold: f64,
    /// How many recording rounds a thread may miss before its state is
    /// dropped.
    ///
    /// Defaults to `30`.
    pub stale_ticks: u64,
    /// Thread names that are never profiled.
    ///
    /// Defaults to the toolkit's own worker threads.
    pub disallowed_threads: Vec<String>,
    /// Maps thread names to reported `group` tags.
    pub group_rules: GroupRules,
    /// Settings for the sampling profiler.
    ///
    /// Its `rules` field is ignored here; the profiler uses
    /// `group_rules` so thread statistics and samples agree on groups.
    pub profiler: ProfilerOptions,
    /// Metric names for the thread statistics collector.
    pub thread_metrics: ThreadMetrics,
    /// Callback for errors from recordables and the emitter.
    pub error_handler: Option<ErrorHandler>,
    /// Prints diagnostics to stderr when no error handler is set.
    pub debug: bool,
}

impl Default for MonitorOptions {
    fn default() -> MonitorOptions {
        MonitorOptions {
            interval: Duration::from_secs(10),
            profiling: true,
            cpu_threshold: 5.0,
            stale_ticks: 30,
            disallowed_threads: DEFAULT_DISALLOWED.iter().map(|s| s.to_string()).collect(),
            group_rules: GroupRules::default(),
            profiler: ProfilerOptions::default(),
            thread_metrics: ThreadMetrics::default(),
            error_handler: None,
            debug: false,
        }
    }
}

impl fmt::Debug for MonitorOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        #[derive(Debug)]
        struct ErrorHandler;
        let error_handler = self.error_handler.as_ref().map(|_| ErrorHandler);

        f.debug_struct("MonitorOptions")
            .field("interval", &self.interval)
            .field("profiling", &self.profiling)
            .field("cpu_threshold", &self.cpu_threshold)
            .field("stale_ticks", &self.stale_ticks)
            .field("disallowed_threads", &self.disallowed_threads)
            .field("group_rules", &self.group_rules)
            .field("profiler", &self.profiler)
            .field("thread_metrics", &self.thread_metrics)
            .field("error_handler", &error_handler)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Periodic recording, thread statistics and profiling in one place.
///
/// A monitor owns a [`Scheduler`] and, when the runtime supports it,
/// the thread load estimator and the sampling profiler. [`start`] wires
/// them up according to what the introspector reports; runtimes without
/// thread counters still get the scheduler for user recordables.
///
/// Stopping is explicit through [`stop`] or implicit on drop.
///
/// [`start`]: Monitor::start
/// [`stop`]: Monitor::stop
pub struct Monitor {
    options: MonitorOptions,
    sink: Arc<dyn MetricSink>,
    introspector: Arc<dyn ThreadIntrospector>,
    scheduler: Scheduler,
    profiler: Option<ProfilerHandle>,
    started: bool,
}

impl Monitor {
    /// Creates a monitor recording through `sink`.
    ///
    /// Pass [`NoopIntrospector`](crate::NoopIntrospector) when the
    /// runtime exposes no thread counters; the monitor then only runs
    /// registered recordables.
    pub fn new(
        sink: Arc<dyn MetricSink>,
        introspector: Arc<dyn ThreadIntrospector>,
        options: MonitorOptions,
    ) -> Monitor {
        let debug = options.debug;
        let handler = options.error_handler.clone().unwrap_or_else(|| {
            Arc::new(move |err: &Error| {
                vitals_core::vitals_debug!(debug, "monitor error: {}", err);
            })
        });
        let scheduler = Scheduler::new(sink.clone(), options.interval, handler);
        Monitor {
            options,
            sink,
            introspector,
            scheduler,
            profiler: None,
            started: false,
        }
    }

    /// Starts the recording round and, where supported, the profiler.
    ///
    /// The thread statistics collector is registered under the name
    /// `threads`; registering your own recordable under that name
    /// before calling this fails the start. Calling `start` on a
    /// running monitor does nothing.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.started {
            return Ok(());
        }
        let capabilities = self.introspector.capabilities();

        if self.options.profiling && capabilities.cpu_time {
            let mut profiler_options = self.options.profiler.clone();
            profiler_options.rules = self.options.group_rules.clone();
            self.profiler = Some(profiler::start(
                self.introspector.clone(),
                profiler_options,
                self.sink.clone(),
            ));
        } else if self.options.profiling {
            vitals_core::vitals_debug!(
                self.options.debug,
                "cpu timing unavailable, profiler disabled"
            );
        }

        if capabilities.cpu_time || capabilities.allocation {
            let stats = ThreadStats::new(
                self.introspector.clone(),
                self.profiler.clone(),
                self.options.group_rules.clone(),
            )
            .with_threshold(self.options.cpu_threshold)
            .with_stale_ticks(self.options.stale_ticks)
            .with_disallowed(self.options.disallowed_threads.clone())
            .with_metrics(self.options.thread_metrics.clone());
            self.scheduler.register("threads", stats)?;
        }

        self.scheduler.start();
        self.started = true;
        Ok(())
    }

    /// Registers a recordable to run once per interval.
    ///
    /// Names are unique; a second registration under a taken name fails
    /// with [`Error::DuplicateRecordable`] and changes nothing. The
    /// name frees up once the recordable reports itself invalid.
    pub fn register<R>(&self, name: impl Into<String>, recordable: R) -> Result<(), Error>
    where
        R: Recordable + 'static,
    {
        self.scheduler.register(name, recordable)
    }

    /// The running profiler, if [`start`](Monitor::start) launched one.
    ///
    /// Use the handle to profile threads explicitly or to install
    /// frame filters.
    pub fn profiler(&self) -> Option<&ProfilerHandle> {
        self.profiler.as_ref()
    }

    /// Creates a [`TaskContext`] backed by this monitor's introspector.
    pub fn task_context(&self) -> TaskContext {
        TaskContext::new(self.introspector.clone())
    }

    /// Stops the recording round and winds down profiling.
    ///
    /// Recordables stay registered; a later [`start`](Monitor::start)
    /// resumes them. The sampling thread itself exits once the last
    /// handle to it is dropped.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        if let Some(profiler) = self.profiler.take() {
            profiler.clear();
        }
        self.started = false;
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("options", &self.options)
            .field("profiler", &self.profiler)
            .field("started", &self.started)
            .finish()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}
