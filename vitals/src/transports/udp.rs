use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use crate::{ClientOptions, Transport, TransportFactory};

/// A transport sending each packet as one UDP datagram.
///
/// The socket stays unconnected so a restarting server or a scrapped
/// DNS record never turns into send errors; datagrams to a dead target
/// simply go nowhere.
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    /// Opens a socket for sending to `addr`.
    ///
    /// The address is resolved once, here. When a hostname resolves to
    /// several addresses the first one wins.
    pub fn new(addr: &str) -> io::Result<UdpTransport> {
        let target = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no address found for {addr}"),
            )
        })?;
        let bind = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind)?;
        Ok(UdpTransport { socket, target })
    }
}

impl Transport for UdpTransport {
    fn send_packet(&self, packet: &[u8]) -> io::Result<usize> {
        self.socket.send_to(packet, self.target)
    }
}

/// The default transport factory: a [`UdpTransport`] aimed at
/// [`ClientOptions::addr`].
pub struct UdpTransportFactory;

impl TransportFactory for UdpTransportFactory {
    fn create_transport(&self, options: &ClientOptions) -> io::Result<Arc<dyn Transport>> {
        Ok(Arc::new(UdpTransport::new(&options.addr)?))
    }
}
