//! The provided transports.
//!
//! This module exposes the transports that are compiled into the
//! library. Only UDP ships today; other carriers plug in through the
//! [`TransportFactory`](crate::TransportFactory) trait in the options.

mod udp;

pub use udp::{UdpTransport, UdpTransportFactory};
