use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The port could not be claimed: missing, busy, or permission denied.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("IO Error: {0}")]
    Io(String),
    #[error("Not connected")]
    NotConnected,
}

impl TransportError {
    /// `ConnectionFailed` is fatal to a connect attempt; everything else is an
    /// I/O failure on a link that was (or should have been) open.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParityMode {
    None,
    Even,
    Odd,
}

/// Serial line parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: ParityMode,
    /// Upper bound on how long a single `read_available` may block.
    pub read_timeout_ms: u64,
}

impl SerialConfig {
    /// Board default: 9600 baud.
    pub const DEFAULT_BAUD: u32 = 9600;

    /// Create a standard 8N1 configuration at specified baud rate
    pub fn new_8n1(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: ParityMode::None,
            read_timeout_ms: 10,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout_ms: u64) -> Self {
        self.read_timeout_ms = read_timeout_ms;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new_8n1(Self::DEFAULT_BAUD)
    }
}

/// A byte-oriented duplex link (serial port, in-memory mock).
///
/// All methods take `&self` so one handle can be shared between the reader
/// thread and the writer. Read and write directions are independent and may
/// run concurrently.
pub trait Transport: Send + Sync {
    /// Return whatever bytes are available right now (possibly none) without
    /// blocking longer than the configured read timeout.
    fn read_available(&self) -> Result<Vec<u8>, TransportError>;

    /// Write bytes to the wire in order.
    fn write(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Close the link. Idempotent and callable from any thread; any read in
    /// flight returns promptly and later calls fail with `NotConnected`.
    fn close(&self);

    fn is_open(&self) -> bool;

    /// Port identifier this transport was opened on.
    fn name(&self) -> &str;
}

/// Opens transports by port identifier.
pub trait TransportFactory: Send + Sync {
    fn open(
        &self,
        port: &str,
        config: &SerialConfig,
    ) -> Result<Arc<dyn Transport>, TransportError>;
}
