use serde::{Deserialize, Serialize};

pub mod transport;
pub use transport::{ParityMode, SerialConfig, Transport, TransportError, TransportFactory};

/// One logical unit of wire data: a single command character or a
/// line-framed report (without its terminator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Frame {
    /// The raw bytes comprising this frame.
    pub bytes: Vec<u8>,
    /// Timestamp in microseconds, relative to when the connection opened.
    pub timestamp_us: u64,
}

impl Frame {
    /// A unit received from the device.
    pub fn new_rx(bytes: Vec<u8>, timestamp_us: u64) -> Self {
        Self {
            bytes,
            timestamp_us,
        }
    }
}
