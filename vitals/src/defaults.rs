use std::sync::Arc;

use crate::transports::UdpTransportFactory;
use crate::ClientOptions;

/// Applies the default configuration to the given options.
///
/// This is called by [`init`](crate::init) before the client is
/// created. Today it installs the [`UdpTransportFactory`] when no
/// transport factory is configured; call it yourself when constructing
/// a [`Client`](crate::Client) directly and you want the same behavior.
pub fn apply_defaults(mut opts: ClientOptions) -> ClientOptions {
    if opts.transport.is_none() {
        opts.transport = Some(Arc::new(UdpTransportFactory));
    }
    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installs_the_udp_factory() {
        let opts = apply_defaults(ClientOptions::default());
        assert!(opts.transport.is_some());
    }

    #[test]
    fn test_keeps_a_configured_factory() {
        let marker: Arc<dyn crate::TransportFactory> = Arc::new(UdpTransportFactory);
        let opts = apply_defaults(ClientOptions {
            transport: Some(marker.clone()),
            ..Default::default()
        });
        assert!(Arc::ptr_eq(&opts.transport.unwrap(), &marker));
    }
}
