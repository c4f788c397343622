use crate::registry::PortClaim;
use core_types::{ParityMode, SerialConfig, Transport, TransportError, TransportFactory};
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Largest chunk pulled from the OS buffer in one `read_available` call.
const MAX_READ_CHUNK: usize = 256;

type PortSlot = Mutex<Option<Box<dyn SerialPort>>>;

fn lock(slot: &PortSlot) -> MutexGuard<'_, Option<Box<dyn SerialPort>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn io_error(e: std::io::Error) -> TransportError {
    TransportError::Io(e.to_string())
}

/// A serial port opened through the `serialport` crate.
///
/// The OS handle is cloned once at open time: the reader thread uses one
/// half and writes go through the other, so neither direction waits on the
/// other.
pub struct SerialTransport {
    name: String,
    reader: PortSlot,
    writer: PortSlot,
    open: AtomicBool,
    claim: Mutex<Option<PortClaim>>,
}

impl SerialTransport {
    pub fn open(port: &str, config: &SerialConfig) -> Result<Self, TransportError> {
        let claim = PortClaim::acquire(port)?;

        let reader = serialport::new(port, config.baud_rate)
            .data_bits(data_bits(config.data_bits)?)
            .stop_bits(stop_bits(config.stop_bits)?)
            .parity(parity(config.parity))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .map_err(|e| {
                TransportError::ConnectionFailed(format!(
                    "{}: {}. Check the device is plugged in and not used by another program.",
                    port, e
                ))
            })?;
        let writer = reader.try_clone().map_err(|e| {
            TransportError::ConnectionFailed(format!("{}: cannot clone handle: {}", port, e))
        })?;

        log::info!("Opened {} at {} baud", port, config.baud_rate);

        Ok(Self {
            name: port.to_string(),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            open: AtomicBool::new(true),
            claim: Mutex::new(Some(claim)),
        })
    }
}

impl Transport for SerialTransport {
    fn read_available(&self) -> Result<Vec<u8>, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        let mut guard = lock(&self.reader);
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let available = port
            .bytes_to_read()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let want = usize::try_from(available)
            .unwrap_or(MAX_READ_CHUNK)
            .clamp(1, MAX_READ_CHUNK);
        let mut buf = vec![0u8; want];

        // With nothing buffered this blocks for at most the port timeout.
        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                Ok(Vec::new())
            }
            Err(e) => Err(io_error(e)),
        }
    }

    fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        let mut guard = lock(&self.writer);
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;
        port.write_all(data).map_err(io_error)?;
        port.flush().map_err(io_error)
    }

    fn close(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        lock(&self.writer).take();
        // Waits for an in-flight read, which is bounded by the read timeout.
        lock(&self.reader).take();
        self.claim
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        log::info!("Closed {}", self.name);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn data_bits(bits: u8) -> Result<DataBits, TransportError> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(TransportError::ConnectionFailed(format!(
            "unsupported data bits: {}",
            other
        ))),
    }
}

fn stop_bits(bits: u8) -> Result<StopBits, TransportError> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(TransportError::ConnectionFailed(format!(
            "unsupported stop bits: {}",
            other
        ))),
    }
}

fn parity(mode: ParityMode) -> Parity {
    match mode {
        ParityMode::None => Parity::None,
        ParityMode::Even => Parity::Even,
        ParityMode::Odd => Parity::Odd,
    }
}

/// Opens [`SerialTransport`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialTransportFactory;

impl TransportFactory for SerialTransportFactory {
    fn open(
        &self,
        port: &str,
        config: &SerialConfig,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(SerialTransport::open(port, config)?))
    }
}

/// Names of the serial ports the OS reports.
pub fn available_ports() -> Result<Vec<String>, TransportError> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .map_err(|e| TransportError::Io(format!("Failed to list serial ports: {}", e)))
}
