use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{default_error_handler, Error};
use crate::options::ClientOptions;
use crate::protocol::{MetricKind, MetricValue};
use crate::sink::MetricSink;
use crate::tags::Tags;
use crate::worker::{EmitterThread, LineItem};

/// The client that turns measurements into protocol lines and ships them.
///
/// A client owns one emitter thread. Handing it a measurement only
/// queues it; rendering, batching and I/O all happen on that thread, so
/// every [`MetricSink`] method returns without touching the network.
///
/// A client without a transport is disabled and silently drops every
/// measurement. Cloning shares the emitter thread, and [`Client::close`]
/// shuts it down for all clones.
pub struct Client {
    options: Arc<ClientOptions>,
    worker: Arc<RwLock<Option<EmitterThread>>>,
}

impl Client {
    /// Creates a client from the given options.
    ///
    /// If the transport factory fails, the error goes to the configured
    /// error handler and the client starts disabled.
    pub fn with_options(options: ClientOptions) -> Client {
        let handler = options
            .error_handler
            .clone()
            .unwrap_or_else(|| default_error_handler(options.debug));
        let worker = match options.transport.as_ref() {
            Some(factory) => match factory.create_transport(&options) {
                Ok(transport) => Some(EmitterThread::new(&options, transport, handler)),
                Err(err) => {
                    handler(&Error::Transport(err));
                    None
                }
            },
            None => {
                crate::vitals_debug!(options.debug, "no transport configured, client disabled");
                None
            }
        };
        Client {
            options: Arc::new(options),
            worker: Arc::new(RwLock::new(worker)),
        }
    }

    /// The options this client was created with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Whether the client has a running emitter thread.
    pub fn is_enabled(&self) -> bool {
        self.worker.read().unwrap().is_some()
    }

    /// Waits until every measurement queued so far has been sent.
    ///
    /// Returns `true` once the emitter caught up, `false` if the timeout
    /// elapsed first. Falls back to `shutdown_timeout` when no timeout
    /// is given.
    pub fn flush(&self, timeout: Option<Duration>) -> bool {
        match self.worker.read().unwrap().as_ref() {
            Some(worker) => worker.flush(timeout.unwrap_or(self.options.shutdown_timeout)),
            None => true,
        }
    }

    /// Flushes and permanently disables the client.
    pub fn close(&self, timeout: Option<Duration>) -> bool {
        let worker = self.worker.write().unwrap().take();
        match worker {
            Some(worker) => worker.shutdown(timeout.unwrap_or(self.options.shutdown_timeout)),
            None => true,
        }
    }

    fn enqueue(&self, metric: &str, value: MetricValue, kind: MetricKind, tags: &Tags) {
        if let Some(worker) = self.worker.read().unwrap().as_ref() {
            worker.enqueue(LineItem {
                metric: metric.into(),
                value,
                kind,
                tags: tags.rendered(),
            });
        }
    }
}

impl MetricSink for Client {
    fn count(&self, metric: &str, delta: i64, tags: &Tags) {
        self.enqueue(metric, MetricValue::Int(delta), MetricKind::Count, tags);
    }

    fn gauge(&self, metric: &str, value: i64, tags: &Tags) {
        self.enqueue(metric, MetricValue::Int(value), MetricKind::Gauge, tags);
    }

    fn gauge_float(&self, metric: &str, value: f64, tags: &Tags) {
        self.enqueue(metric, MetricValue::Float(value), MetricKind::Gauge, tags);
    }

    fn histogram(&self, metric: &str, value: i64, tags: &Tags) {
        self.enqueue(metric, MetricValue::Int(value), MetricKind::Histogram, tags);
    }

    fn histogram_float(&self, metric: &str, value: f64, tags: &Tags) {
        self.enqueue(metric, MetricValue::Float(value), MetricKind::Histogram, tags);
    }

    fn time(&self, metric: &str, millis: i64, tags: &Tags) {
        self.enqueue(metric, MetricValue::Int(millis), MetricKind::Timing, tags);
    }

    fn set(&self, metric: &str, member: &str, tags: &Tags) {
        self.enqueue(metric, MetricValue::from(member), MetricKind::Set, tags);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Clone for Client {
    fn clone(&self) -> Client {
        Client {
            options: self.options.clone(),
            worker: self.worker.clone(),
        }
    }
}

impl From<ClientOptions> for Client {
    fn from(options: ClientOptions) -> Client {
        Client::with_options(options)
    }
}
