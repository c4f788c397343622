//! In-memory transport and a simulated LED board for tests and `--simulate`.

use core_types::{SerialConfig, Transport, TransportError, TransportFactory};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Firmware-like responder: echoes every command it executes and answers
/// `s` with a report. The button cycles through modes 0..=4.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulatedBoard {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    mode: u8,
    /// Answer `s` with `LED:` lines instead of `MODE:` (exercises the other report form).
    pub report_leds: bool,
    /// Ignore `s` entirely, as a board with a stuck UART would.
    pub silent: bool,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lit(&self) -> (bool, bool, bool) {
        (self.red, self.green, self.blue)
    }

    /// Bytes the board sends back after receiving `byte`.
    pub fn respond(&mut self, byte: u8) -> Vec<u8> {
        match byte {
            b'r' | b'R' | b'g' | b'G' | b'b' | b'B' | b'a' | b'A' => {
                self.toggle(byte);
                vec![byte]
            }
            b'0'..=b'4' => {
                self.set_mode(byte - b'0');
                vec![byte]
            }
            b's' if self.silent => Vec::new(),
            b's' => self.report(),
            _ => Vec::new(),
        }
    }

    /// Button released: advance to the next mode and announce `L`.
    pub fn release_button(&mut self) -> Vec<u8> {
        self.set_mode((self.mode + 1) % 5);
        vec![b'L']
    }

    fn toggle(&mut self, byte: u8) {
        match byte {
            b'r' => self.red = true,
            b'R' => self.red = false,
            b'g' => self.green = true,
            b'G' => self.green = false,
            b'b' => self.blue = true,
            b'B' => self.blue = false,
            b'a' => (self.red, self.green, self.blue) = (true, true, true),
            _ => (self.red, self.green, self.blue) = (false, false, false),
        }
    }

    fn set_mode(&mut self, mode: u8) {
        self.mode = mode;
        (self.red, self.green, self.blue) = match mode {
            1 => (true, false, false),
            2 => (false, false, true),
            3 => (false, true, false),
            4 => (true, true, true),
            _ => (false, false, false),
        };
    }

    fn report(&self) -> Vec<u8> {
        let as_mode = match self.lit() {
            (false, false, false) => Some(0),
            (true, false, false) => Some(1),
            (false, false, true) => Some(2),
            (false, true, false) => Some(3),
            (true, true, true) => Some(4),
            _ => None,
        };
        match as_mode {
            Some(mode) if !self.report_leds => format!("MODE:{}\r\n", mode).into_bytes(),
            _ => {
                let mut out = b"LED:NONE\r\n".to_vec();
                for (on, token) in [(self.red, "RED"), (self.green, "GREEN"), (self.blue, "BLUE")] {
                    if on {
                        out.extend_from_slice(format!("LED:{}\r\n", token).as_bytes());
                    }
                }
                out
            }
        }
    }
}

/// In-memory [`Transport`]. Bytes written are logged and, when a board is
/// attached, answered by it. Reads with nothing queued sleep for the read
/// timeout like a real port.
pub struct MockTransport {
    name: String,
    inbound: Mutex<VecDeque<u8>>,
    written: Mutex<Vec<u8>>,
    board: Mutex<Option<SimulatedBoard>>,
    open: AtomicBool,
    fail_next_read: Mutex<Option<String>>,
    read_timeout: Duration,
}

impl MockTransport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inbound: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
            board: Mutex::new(None),
            open: AtomicBool::new(true),
            fail_next_read: Mutex::new(None),
            read_timeout: Duration::from_millis(5),
        }
    }

    pub fn with_board(name: &str, board: SimulatedBoard) -> Self {
        let mock = Self::new(name);
        *lock(&mock.board) = Some(board);
        mock
    }

    /// Queue bytes as if the board had sent them.
    pub fn inject(&self, bytes: &[u8]) {
        lock(&self.inbound).extend(bytes.iter().copied());
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        lock(&self.written).clone()
    }

    /// Make the next read fail with an I/O error (cable pulled).
    pub fn fail_next_read(&self, reason: &str) {
        *lock(&self.fail_next_read) = Some(reason.to_string());
    }

    /// Physical button press and release on the attached board.
    pub fn press_and_release_button(&self) {
        let released = lock(&self.board).as_mut().map(SimulatedBoard::release_button);
        self.inject(b"P");
        if let Some(bytes) = released {
            self.inject(&bytes);
        }
    }

    /// Change how the attached board behaves.
    pub fn configure_board(&self, f: impl FnOnce(&mut SimulatedBoard)) {
        if let Some(board) = lock(&self.board).as_mut() {
            f(board);
        }
    }

    pub fn board(&self) -> Option<SimulatedBoard> {
        lock(&self.board).clone()
    }

    fn reopen(&self) -> bool {
        !self.open.swap(true, Ordering::AcqRel)
    }
}

impl Transport for MockTransport {
    fn read_available(&self) -> Result<Vec<u8>, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        if let Some(reason) = lock(&self.fail_next_read).take() {
            return Err(TransportError::Io(reason));
        }
        let bytes: Vec<u8> = lock(&self.inbound).drain(..).collect();
        if bytes.is_empty() {
            std::thread::sleep(self.read_timeout);
        }
        Ok(bytes)
    }

    fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        lock(&self.written).extend_from_slice(data);
        let replies: Vec<u8> = match lock(&self.board).as_mut() {
            Some(board) => data.iter().flat_map(|&b| board.respond(b)).collect(),
            None => Vec::new(),
        };
        self.inject(&replies);
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Hands out pre-registered [`MockTransport`]s by name. A port that is
/// already open cannot be opened again until it is closed.
#[derive(Default)]
pub struct MockTransportFactory {
    ports: Mutex<HashMap<String, Arc<MockTransport>>>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port. It starts closed; `open` opens it.
    pub fn add_port(&self, mock: MockTransport) -> Arc<MockTransport> {
        mock.close();
        let mock = Arc::new(mock);
        lock(&self.ports).insert(mock.name.clone(), mock.clone());
        mock
    }
}

impl TransportFactory for MockTransportFactory {
    fn open(
        &self,
        port: &str,
        _config: &SerialConfig,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        let mock = lock(&self.ports).get(port).cloned().ok_or_else(|| {
            TransportError::ConnectionFailed(format!("{}: no such port", port))
        })?;
        if !mock.reopen() {
            return Err(TransportError::ConnectionFailed(format!(
                "{} is already open in this process. Disconnect it first.",
                port
            )));
        }
        lock(&mock.inbound).clear();
        Ok(mock)
    }
}
