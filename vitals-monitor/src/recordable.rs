use vitals_core::MetricSink;

/// A periodic producer of measurements, driven by the
/// [`Scheduler`](crate::Scheduler).
///
/// Implementations compute their current readings on every scheduler
/// tick and write them into the sink. A failing [`record`] call is
/// reported through the error handler and the producer is retried on
/// the next tick; returning `false` from [`is_valid`] retires it
/// instead, permanently.
///
/// Plain closures of the right shape implement this trait, which is
/// handy for one-off gauges:
///
/// ```
/// use vitals_core::{MetricSink, NoopSink, Tags};
/// use vitals_monitor::Recordable;
///
/// let mut depth_gauge = |sink: &dyn MetricSink| {
///     sink.gauge("queue.depth", 42, &Tags::new());
///     Ok(())
/// };
/// depth_gauge.record(&NoopSink)?;
/// # anyhow::Ok(())
/// ```
///
/// [`record`]: Recordable::record
/// [`is_valid`]: Recordable::is_valid
pub trait Recordable: Send {
    /// Records the producer's current measurements into the sink.
    fn record(&mut self, sink: &dyn MetricSink) -> anyhow::Result<()>;

    /// Whether the producer should stay scheduled.
    ///
    /// Checked after every invocation; once this returns `false` the
    /// entry is dropped and its name becomes free again.
    fn is_valid(&self) -> bool {
        true
    }
}

impl<F> Recordable for F
where
    F: FnMut(&dyn MetricSink) -> anyhow::Result<()> + Send,
{
    fn record(&mut self, sink: &dyn MetricSink) -> anyhow::Result<()> {
        self(sink)
    }
}
