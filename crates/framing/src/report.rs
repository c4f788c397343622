use crate::Framer;
use core_types::Frame;

/// Prefixes that open a terminated report line.
const LINE_PREFIXES: [&[u8]; 3] = [b"MODE:", b"LED:", b"BTN:"];

/// Lines are cut at this length; the rest up to the next terminator is dropped.
pub const MAX_LINE_LEN: usize = 64;

/// Bytes the board sends on their own: command echoes, mode digits, button edges.
fn is_unit_byte(b: u8) -> bool {
    matches!(
        b,
        b'r' | b'R' | b'g' | b'G' | b'b' | b'B' | b'a' | b'A' | b's' | b'0'..=b'4' | b'P' | b'L'
    )
}

fn is_terminator(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

fn opens_report(b: u8) -> bool {
    LINE_PREFIXES.iter().any(|p| p.first() == Some(&b))
}

// Latin-1 / UTF-8 bytes of the firmware's Spanish text count as text.
fn is_text(b: u8) -> bool {
    b.is_ascii_graphic() || b == b' ' || b == b'\t' || b >= 0x80
}

/// Frames single command characters, `MODE:` / `LED:` / `BTN:` reports and
/// free-form text lines.
///
/// A unit byte (`r`, `3`, `L`, ...) is held until the next byte arrives. If
/// that byte continues a word (`LED:`, `b: Secuencia`, `Boton`), the two open
/// a line; otherwise the held byte is a unit of its own. Any other printable
/// byte opens a line directly. Lines run until `\n` or `\r`, survive across
/// pushes, and never include the terminator.
pub struct ReportFramer {
    held: Option<(u8, u64)>,
    line: Vec<u8>,
    in_line: bool,
    /// Dropping the tail of an overlong line until its terminator.
    discarding: bool,
    line_timestamp_us: u64,
}

impl ReportFramer {
    pub fn new() -> Self {
        Self {
            held: None,
            line: Vec::with_capacity(MAX_LINE_LEN),
            in_line: false,
            discarding: false,
            line_timestamp_us: 0,
        }
    }

    fn open_line(&mut self, bytes: &[u8], timestamp_us: u64) {
        self.line.clear();
        self.line.extend_from_slice(bytes);
        self.in_line = true;
        self.line_timestamp_us = timestamp_us;
    }

    fn emit_line(&mut self, frames: &mut Vec<Frame>) {
        frames.push(Frame::new_rx(
            std::mem::take(&mut self.line),
            self.line_timestamp_us,
        ));
        self.in_line = false;
    }

    fn push_byte(&mut self, b: u8, timestamp_us: u64, frames: &mut Vec<Frame>) {
        if self.discarding {
            self.discarding = !is_terminator(b);
            return;
        }

        if self.in_line {
            if is_terminator(b) {
                self.emit_line(frames);
            } else {
                self.line.push(b);
                if self.line.len() >= MAX_LINE_LEN {
                    self.emit_line(frames);
                    self.discarding = true;
                }
            }
            return;
        }

        if let Some((held, held_ts)) = self.held.take() {
            if is_text(b) && !is_unit_byte(b) && !opens_report(b) {
                self.open_line(&[held, b], held_ts);
                return;
            }
            frames.push(Frame::new_rx(vec![held], held_ts));
        }

        if is_terminator(b) {
            // Stray terminators (e.g. after a bare echo) carry nothing.
        } else if is_unit_byte(b) {
            self.held = Some((b, timestamp_us));
        } else if is_text(b) {
            self.open_line(&[b], timestamp_us);
        } else {
            frames.push(Frame::new_rx(vec![b], timestamp_us));
        }
    }
}

impl Default for ReportFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer for ReportFramer {
    fn push(&mut self, bytes: &[u8], timestamp_us: u64) -> Vec<Frame> {
        let mut frames = Vec::new();
        for &b in bytes {
            self.push_byte(b, timestamp_us, &mut frames);
        }
        frames
    }

    fn flush_idle(&mut self, _timestamp_us: u64) -> Vec<Frame> {
        self.held
            .take()
            .map(|(b, ts)| vec![Frame::new_rx(vec![b], ts)])
            .unwrap_or_default()
    }

    fn reset(&mut self) {
        self.held = None;
        self.line.clear();
        self.in_line = false;
        self.discarding = false;
    }

    fn name(&self) -> &'static str {
        "Reports"
    }
}
