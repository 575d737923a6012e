use std::io;
use std::sync::Arc;

use crate::options::ClientOptions;

/// The carrier that moves assembled packets to the receiving agent.
///
/// A transport is handed complete packets by the emitter thread and is
/// the only place actual I/O happens. It reports how many bytes it
/// managed to write; short writes and I/O errors are routed to the
/// configured error handler, never to the thread that produced the
/// measurement.
pub trait Transport: Send + Sync + 'static {
    /// Sends one packet, returning the number of bytes written.
    fn send_packet(&self, packet: &[u8]) -> io::Result<usize>;
}

/// A factory creating the transport a client will use.
///
/// The factory is invoked once when the client starts its emitter
/// thread. Failing here leaves the client disabled, so a bad address or
/// an unbindable socket is reported once instead of per packet.
///
/// This is implemented for closures of the right signature, and for
/// `Arc<T>` where `T` is a [`Transport`], which hands out the same
/// transport for every client. The latter is how capturing transports
/// are injected in tests.
pub trait TransportFactory: Send + Sync {
    /// Creates a new transport for the given options.
    fn create_transport(&self, options: &ClientOptions) -> io::Result<Arc<dyn Transport>>;
}

impl<F> TransportFactory for F
where
    F: Fn(&ClientOptions) -> io::Result<Arc<dyn Transport>> + Clone + Send + Sync,
{
    fn create_transport(&self, options: &ClientOptions) -> io::Result<Arc<dyn Transport>> {
        (*self)(options)
    }
}

impl<T: Transport> TransportFactory for Arc<T> {
    fn create_transport(&self, _options: &ClientOptions) -> io::Result<Arc<dyn Transport>> {
        Ok(self.clone())
    }
}
