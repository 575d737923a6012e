use crate::tags::Tags;

/// The measurement surface producers write to.
///
/// Every method hands one measurement to the sink and returns
/// immediately. Implementations must never block the caller; the
/// [`Client`](crate::Client) implementation queues the measurement for a
/// background thread and drops nothing short of a full bounded queue.
pub trait MetricSink: Send + Sync {
    /// Adds `delta` to a counter.
    fn count(&self, metric: &str, delta: i64, tags: &Tags);

    /// Records the current value of a gauge.
    fn gauge(&self, metric: &str, value: i64, tags: &Tags);

    /// Records the current value of a gauge as a float.
    fn gauge_float(&self, metric: &str, value: f64, tags: &Tags);

    /// Adds one sample to a histogram.
    fn histogram(&self, metric: &str, value: i64, tags: &Tags);

    /// Adds one float sample to a histogram.
    fn histogram_float(&self, metric: &str, value: f64, tags: &Tags);

    /// Records a duration in milliseconds.
    fn time(&self, metric: &str, millis: i64, tags: &Tags);

    /// Records one member of a set.
    fn set(&self, metric: &str, member: &str, tags: &Tags);

    /// Adds one to a counter.
    fn increment(&self, metric: &str, tags: &Tags) {
        self.count(metric, 1, tags);
    }

    /// Subtracts one from a counter.
    fn decrement(&self, metric: &str, tags: &Tags) {
        self.count(metric, -1, tags);
    }
}

/// A sink that discards every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricSink for NoopSink {
    fn count(&self, _metric: &str, _delta: i64, _tags: &Tags) {}
    fn gauge(&self, _metric: &str, _value: i64, _tags: &Tags) {}
    fn gauge_float(&self, _metric: &str, _value: f64, _tags: &Tags) {}
    fn histogram(&self, _metric: &str, _value: i64, _tags: &Tags) {}
    fn histogram_float(&self, _metric: &str, _value: f64, _tags: &Tags) {}
    fn time(&self, _metric: &str, _millis: i64, _tags: &Tags) {}
    fn set(&self, _metric: &str, _member: &str, _tags: &Tags) {}
}
