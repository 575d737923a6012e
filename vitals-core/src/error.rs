use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Callback invoked for every failure the background machinery swallows.
///
/// Delivery is fire-and-forget, so errors cannot be returned to the call
/// site that produced a measurement. Instead they are funneled through one
/// of these handlers, both from the emitter thread (transport failures) and
/// from the recorder scheduler (producer failures). The default handler
/// logs and continues.
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Things that can go wrong while producing or delivering measurements.
///
/// None of these are fatal at runtime: a failed packet or a failing
/// producer never stops measurement of everything else. Only
/// [`Error::UnbalancedTags`] and [`Error::DuplicateRecordable`] surface
/// synchronously, at construction and registration time respectively.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The transport failed while sending a packet.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The transport wrote fewer bytes than the packet contained.
    ///
    /// The remainder of the packet is dropped, not retried.
    #[error("partial send: wrote {sent} of {size} bytes")]
    PartialSend {
        /// Bytes the transport reported as written.
        sent: usize,
        /// Size of the packet that was handed to the transport.
        size: usize,
    },

    /// A single rendered line exceeded the configured packet size.
    ///
    /// The line is still sent as its own oversized datagram, which the OS
    /// may reject or fragment.
    #[error("line of {size} bytes exceeds the packet size of {limit}")]
    OversizedLine {
        /// Size of the rendered line in bytes.
        size: usize,
        /// Configured packet capacity.
        limit: usize,
    },

    /// A flat `[key, value, key, value, ..]` tag list had an odd length.
    #[error("flat tag list needs an even number of elements, got {0}")]
    UnbalancedTags(usize),

    /// A recordable with the same name is already registered.
    #[error("recordable `{0}` is already registered")]
    DuplicateRecordable(String),

    /// A recordable failed while recording. The entry is kept and retried
    /// on the next tick.
    #[error("recordable `{name}` failed: {source}")]
    Record {
        /// Name the recordable was registered under.
        name: String,
        /// The error the recordable returned.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub(crate) fn default_error_handler(debug: bool) -> ErrorHandler {
    Arc::new(move |err| {
        crate::vitals_debug!(debug, "metric delivery error: {}", err);
    })
}
