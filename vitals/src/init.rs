use std::ops::Deref;
use std::sync::Arc;

use vitals_core::vitals_debug;

use crate::defaults::apply_defaults;
use crate::{Client, ClientOptions};

/// Helper struct that is returned from `init`.
///
/// When the guard is dropped the client is closed with the configured
/// shutdown timeout, flushing queued measurements first.
#[must_use = "when the init guard is dropped the emitter shuts down and queued measurements \
              are dropped. If you do want to ignore this use mem::forget on it."]
pub struct InitGuard(Arc<Client>);

impl InitGuard {
    /// A shared handle to the client this guard keeps alive.
    ///
    /// Use this to hand the client to a `Monitor` or to code that
    /// outlives the current scope.
    pub fn client(&self) -> Arc<Client> {
        self.0.clone()
    }

    /// Quick check if the client is enabled.
    pub fn is_enabled(&self) -> bool {
        self.0.is_enabled()
    }
}

impl Deref for InitGuard {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.0
    }
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        if self.is_enabled() {
            vitals_debug!(self.0.options().debug, "dropping init guard -> closing client");
        } else {
            vitals_debug!(
                self.0.options().debug,
                "dropping init guard (no client to close)"
            );
        }
        self.0.close(None);
    }
}

/// Creates a metrics client for the given options and starts its
/// emitter.
///
/// This returns an init guard that must be kept in scope; when it is
/// dropped the emitter flushes what it has queued and shuts down. If
/// you don't want (or can't) keep the guard around it's permissible to
/// call `mem::forget` on it and leave the emitter running until the
/// process exits.
///
/// Anything that converts into [`ClientOptions`] is accepted, most
/// commonly the target address or an options struct:
///
/// ```
/// let _vitals = vitals::init("127.0.0.1:8125");
/// ```
///
/// ```
/// let _vitals = vitals::init(vitals::ClientOptions {
///     prefix: "app".into(),
///     ..Default::default()
/// });
/// ```
///
/// Missing pieces of the configuration are filled in by
/// [`apply_defaults`](crate::apply_defaults) before the client starts;
/// without a configured transport factory measurements go out over UDP.
pub fn init<O>(options: O) -> InitGuard
where
    O: Into<ClientOptions>,
{
    let options = apply_defaults(options.into());
    let debug = options.debug;
    let client = Arc::new(Client::with_options(options));
    if client.is_enabled() {
        vitals_debug!(debug, "enabled metrics client for {}", client.options().addr);
    } else {
        vitals_debug!(debug, "initialized disabled metrics client");
    }
    InitGuard(client)
}
