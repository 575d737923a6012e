use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use vitals_core::{MetricSink, Tags};

use crate::introspect::{RuntimeCapabilities, ThreadIntrospector};
use crate::profiler::ProfilerHandle;
use crate::recordable::Recordable;
use crate::rules::GroupRules;

/// Threads that must never be profiled, to keep the monitor from
/// measuring itself.
pub(crate) const DEFAULT_DISALLOWED: &[&str] =
    &["vitals-emitter", "vitals-scheduler", "vitals-profiler"];

/// Metric names the estimator emits under.
#[derive(Debug, Clone)]
pub struct ThreadMetrics {
    /// Gauge: number of live threads.
    pub alive: String,
    /// Histogram: bytes allocated since the previous tick.
    pub allocation: String,
    /// Histogram: CPU usage since the previous tick, in percent.
    pub cpu: String,
    /// Histogram: user-mode CPU usage since the previous tick, in percent.
    pub cpu_user: String,
    /// Histogram: CPU nanoseconds since the previous tick.
    pub cpu_nanos: String,
    /// Histogram: user-mode CPU nanoseconds since the previous tick.
    pub cpu_user_nanos: String,
}

impl Default for ThreadMetrics {
    fn default() -> ThreadMetrics {
        ThreadMetrics {
            alive: "thread.alive".into(),
            allocation: "thread.allocation".into(),
            cpu: "thread.cpu".into(),
            cpu_user: "thread.cpu.user".into(),
            cpu_nanos: "thread.cpu.nanos".into(),
            cpu_user_nanos: "thread.cpu.user.nanos".into(),
        }
    }
}

struct ThreadRecord {
    tags: Tags,
    cpu_nanos: i64,
    user_nanos: i64,
    allocated_bytes: i64,
    last_seen: u64,
    last_record: Instant,
    profiling: bool,
    disallowed: bool,
}

/// The per-thread load estimator.
///
/// On every tick it reads the counters of all live threads, emits delta
/// measurements for each thread it has a baseline for, and decides which
/// threads are worth profiling: a thread at or above the CPU threshold
/// starts being sampled, a thread that drops below stops. The first
/// sighting of a thread only establishes its baseline and identity tags;
/// deltas follow from the second tick on.
///
/// Threads leave the tracked set in two ways: a negative CPU reading
/// evicts immediately (the runtime's signal for a terminated thread) and
/// threads missing from the counter list for more than `stale_ticks`
/// ticks are garbage collected. Both forms of eviction also stop any
/// profiling of that thread.
pub struct ThreadStats {
    introspector: Arc<dyn ThreadIntrospector>,
    capabilities: RuntimeCapabilities,
    profiler: Option<ProfilerHandle>,
    rules: GroupRules,
    disallowed: Vec<String>,
    threshold: f64,
    stale_ticks: u64,
    metrics: ThreadMetrics,
    threads: HashMap<u64, ThreadRecord>,
    tick: u64,
    no_tags: Tags,
}

impl ThreadStats {
    /// Creates an estimator reading from `introspector`, steering the
    /// given profiler (if any) and resolving groups through `rules`.
    pub fn new(
        introspector: Arc<dyn ThreadIntrospector>,
        profiler: Option<ProfilerHandle>,
        rules: GroupRules,
    ) -> ThreadStats {
        let capabilities = introspector.capabilities();
        ThreadStats {
            introspector,
            capabilities,
            profiler,
            rules,
            disallowed: DEFAULT_DISALLOWED.iter().map(|s| s.to_string()).collect(),
            threshold: 5.0,
            stale_ticks: 30,
            metrics: ThreadMetrics::default(),
            threads: HashMap::new(),
            tick: 0,
            no_tags: Tags::new(),
        }
    }

    /// Overrides the CPU percentage at which profiling starts.
    pub fn with_threshold(mut self, threshold: f64) -> ThreadStats {
        self.threshold = threshold;
        self
    }

    /// Overrides how many missed ticks evict a thread.
    pub fn with_stale_ticks(mut self, stale_ticks: u64) -> ThreadStats {
        self.stale_ticks = stale_ticks;
        self
    }

    /// Replaces the list of thread names excluded from profiling.
    pub fn with_disallowed(mut self, disallowed: Vec<String>) -> ThreadStats {
        self.disallowed = disallowed;
        self
    }

    /// Replaces the metric name catalog.
    pub fn with_metrics(mut self, metrics: ThreadMetrics) -> ThreadStats {
        self.metrics = metrics;
        self
    }

    fn stop_profiling(&self, id: u64) {
        if let Some(profiler) = &self.profiler {
            profiler.stop_profiling(id);
        }
    }

    fn record_at(&mut self, sink: &dyn MetricSink, now: Instant) {
        self.tick += 1;
        let counters = self.introspector.counters();
        sink.gauge(&self.metrics.alive, counters.len() as i64, &self.no_tags);

        for current in &counters {
            if self.capabilities.cpu_time && current.cpu_nanos < 0 {
                if let Some(record) = self.threads.remove(&current.id) {
                    if record.profiling {
                        self.stop_profiling(current.id);
                    }
                }
                continue;
            }

            match self.threads.get_mut(&current.id) {
                Some(record) => {
                    record.last_seen = self.tick;
                    let wall_nanos =
                        now.duration_since(record.last_record).as_nanos().max(1) as f64;

                    if self.capabilities.allocation {
                        let delta = (current.allocated_bytes - record.allocated_bytes).max(0);
                        sink.histogram(&self.metrics.allocation, delta, &record.tags);
                    }
                    if self.capabilities.cpu_time {
                        let cpu_delta = current.cpu_nanos - record.cpu_nanos;
                        let user_delta = current.user_nanos - record.user_nanos;
                        let cpu_pct = cpu_delta as f64 * 100.0 / wall_nanos;
                        let user_pct = user_delta as f64 * 100.0 / wall_nanos;
                        sink.histogram_float(&self.metrics.cpu, cpu_pct, &record.tags);
                        sink.histogram_float(&self.metrics.cpu_user, user_pct, &record.tags);
                        sink.histogram(&self.metrics.cpu_nanos, cpu_delta, &record.tags);
                        sink.histogram(&self.metrics.cpu_user_nanos, user_delta, &record.tags);

                        if let Some(profiler) = &self.profiler {
                            if cpu_pct >= self.threshold {
                                if !record.disallowed && !record.profiling {
                                    profiler.start_profiling(current.id);
                                    record.profiling = true;
                                }
                            } else if record.profiling {
                                profiler.stop_profiling(current.id);
                                record.profiling = false;
                            }
                        }
                    }

                    record.cpu_nanos = current.cpu_nanos;
                    record.user_nanos = current.user_nanos;
                    record.allocated_bytes = current.allocated_bytes;
                    record.last_record = now;
                }
                None => {
                    let Some(identity) = self.introspector.identity(current.id) else {
                        continue;
                    };
                    let group = self.rules.resolve(&identity.name, &identity.group);
                    let mut tags = Tags::of("thread", &identity.name);
                    tags.add("group", &group).add("id", current.id);
                    let disallowed = self.disallowed.iter().any(|name| name == &identity.name);
                    self.threads.insert(
                        current.id,
                        ThreadRecord {
                            tags,
                            cpu_nanos: current.cpu_nanos,
                            user_nanos: current.user_nanos,
                            allocated_bytes: current.allocated_bytes,
                            last_seen: self.tick,
                            last_record: now,
                            profiling: false,
                            disallowed,
                        },
                    );
                }
            }
        }

        let tick = self.tick;
        let stale_ticks = self.stale_ticks;
        let profiler = self.profiler.clone();
        self.threads.retain(|id, record| {
            let keep = tick.saturating_sub(record.last_seen) <= stale_ticks;
            if !keep && record.profiling {
                if let Some(profiler) = &profiler {
                    profiler.stop_profiling(*id);
                }
            }
            keep
        });
    }
}

impl Recordable for ThreadStats {
    fn record(&mut self, sink: &dyn MetricSink) -> anyhow::Result<()> {
        self.record_at(sink, Instant::now());
        Ok(())
    }
}
