use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ErrorHandler;
use crate::tags::Tags;
use crate::transport::TransportFactory;

/// Configuration settings for a [`Client`](crate::Client).
///
/// These cover the line protocol (prefix, constant tags), the emitter
/// (queue, packet size, shutdown behavior) and the transport. An options
/// struct with no transport factory produces a disabled client that
/// drops every measurement, which is the intended off switch for tests
/// and local runs.
///
/// # Examples
///
/// ```
/// let options = vitals_core::ClientOptions {
///     prefix: "app".into(),
///     addr: "127.0.0.1:8125".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    /// Prefix joined to every metric name with a `.`.
    ///
    /// An empty prefix leaves names untouched and a trailing `.` is not
    /// doubled.
    pub prefix: String,
    /// The `host:port` the transport sends packets to.
    pub addr: String,
    /// Capacity of the emitter queue.
    ///
    /// `None` means the queue is unbounded and a send never blocks.
    /// With a bound, producers block once the queue is full, which is
    /// the only backpressure in the pipeline.
    pub queue_size: Option<usize>,
    /// Maximum packet size in bytes. Lines are batched up to this size.
    pub packet_size: usize,
    /// Tags rendered into every line, before per-measurement tags.
    pub constant_tags: Tags,
    /// How long [`close`](crate::Client::close) waits for the emitter to
    /// drain by default.
    pub shutdown_timeout: Duration,
    /// Enables diagnostics printing to stderr.
    pub debug: bool,
    /// Callback for errors swallowed by the background machinery.
    ///
    /// Defaults to a handler that logs through [`vitals_debug!`](crate::vitals_debug).
    pub error_handler: Option<ErrorHandler>,
    /// The factory creating the transport. `None` disables the client.
    pub transport: Option<Arc<dyn TransportFactory>>,
}

impl ClientOptions {
    /// Creates new options with the default values.
    pub fn new() -> ClientOptions {
        ClientOptions::default()
    }

    /// Creates new options and lets a closure adjust them.
    pub fn configure<F>(f: F) -> ClientOptions
    where
        F: FnOnce(&mut ClientOptions) -> &mut ClientOptions,
    {
        let mut options = ClientOptions::default();
        f(&mut options);
        options
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Debug)]
        struct ErrorHandler;
        let error_handler = self.error_handler.as_ref().map(|_| ErrorHandler);
        #[derive(Debug)]
        struct TransportFactory;
        let transport = self.transport.as_ref().map(|_| TransportFactory);

        f.debug_struct("ClientOptions")
            .field("prefix", &self.prefix)
            .field("addr", &self.addr)
            .field("queue_size", &self.queue_size)
            .field("packet_size", &self.packet_size)
            .field("constant_tags", &self.constant_tags)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("debug", &self.debug)
            .field("error_handler", &error_handler)
            .field("transport", &transport)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> ClientOptions {
        ClientOptions {
            prefix: String::new(),
            addr: "127.0.0.1:8125".into(),
            queue_size: None,
            packet_size: 1500,
            constant_tags: Tags::new(),
            shutdown_timeout: Duration::from_secs(30),
            debug: false,
            error_handler: None,
            transport: None,
        }
    }
}

impl From<()> for ClientOptions {
    fn from(_: ()) -> ClientOptions {
        ClientOptions::default()
    }
}

impl From<&str> for ClientOptions {
    fn from(addr: &str) -> ClientOptions {
        ClientOptions {
            addr: addr.into(),
            ..Default::default()
        }
    }
}

impl From<String> for ClientOptions {
    fn from(addr: String) -> ClientOptions {
        ClientOptions {
            addr,
            ..Default::default()
        }
    }
}
