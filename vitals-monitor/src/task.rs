use std::sync::Arc;
use std::time::Instant;

use vitals_core::{MetricSink, Tags};

use crate::introspect::{RuntimeCapabilities, ThreadIntrospector};

/// Metric names for the resource split of measured tasks.
#[derive(Debug, Clone)]
pub struct TaskMetrics {
    /// Histogram: task time in nanoseconds, split by a `type` tag into
    /// `cpu`, `total` and `wait`.
    pub time: String,
    /// Histogram: bytes allocated while the task ran.
    pub allocation: String,
}

impl Default for TaskMetrics {
    fn default() -> TaskMetrics {
        TaskMetrics {
            time: "task.time".into(),
            allocation: "task.allocation".into(),
        }
    }
}

/// Measures closures on the thread that runs them.
///
/// A context is a plain value owned by its worker; give every worker its
/// own instead of sharing one through globals. [`measure`] times a
/// closure and emits its wall duration under the caller's metric name;
/// where the runtime exposes per-thread counters it adds the bytes
/// allocated and a cpu/total/wait nanosecond split under the
/// [`TaskMetrics`] names.
///
/// [`measure`]: TaskContext::measure
#[derive(Clone)]
pub struct TaskContext {
    introspector: Arc<dyn ThreadIntrospector>,
    capabilities: RuntimeCapabilities,
    metrics: TaskMetrics,
}

impl TaskContext {
    /// Creates a context reading from `introspector`.
    pub fn new(introspector: Arc<dyn ThreadIntrospector>) -> TaskContext {
        TaskContext::with_metrics(introspector, TaskMetrics::default())
    }

    /// Creates a context with a custom metric name catalog.
    pub fn with_metrics(
        introspector: Arc<dyn ThreadIntrospector>,
        metrics: TaskMetrics,
    ) -> TaskContext {
        let capabilities = introspector.capabilities();
        TaskContext {
            introspector,
            capabilities,
            metrics,
        }
    }

    /// Runs `f`, emits its measurements and returns its result.
    ///
    /// The wall duration always goes out as a histogram of
    /// milliseconds under `metric`. The allocation and time-split
    /// measurements depend on the runtime's capabilities and are
    /// skipped when the counters are unavailable.
    pub fn measure<T, F>(&self, sink: &dyn MetricSink, metric: &str, tags: &Tags, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let before = self.introspector.current();
        let started = Instant::now();
        let result = f();
        let elapsed = started.elapsed();
        sink.histogram_float(metric, elapsed.as_secs_f64() * 1000.0, tags);

        if let (Some(before), Some(after)) = (before, self.introspector.current()) {
            if self.capabilities.allocation {
                let allocated = after.allocated_bytes - before.allocated_bytes;
                if allocated > 0 {
                    sink.histogram(&self.metrics.allocation, allocated, tags);
                }
            }
            if self.capabilities.cpu_time {
                let cpu = (after.cpu_nanos - before.cpu_nanos).max(0);
                let total = elapsed.as_nanos() as i64;
                let mut split = tags.clone();
                let slot = split.len();
                if cpu > 0 {
                    split.add("type", "cpu");
                    sink.histogram(&self.metrics.time, cpu, &split);
                    split.set(slot, "type", "total");
                } else {
                    split.add("type", "total");
                }
                sink.histogram(&self.metrics.time, total, &split);
                split.set(slot, "type", "wait");
                sink.histogram(&self.metrics.time, (total - cpu).max(0), &split);
            }
        }
        result
    }
}
