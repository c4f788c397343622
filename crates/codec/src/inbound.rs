use crate::hex::describe_unrecognized;
use crate::intent::{Intent, Mode};
use core_types::Frame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token carried by an `LED:<token>` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedToken {
    Red,
    Blue,
    Green,
    All,
    None,
}

impl LedToken {
    /// Wire spelling; case-sensitive.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "RED" => Some(Self::Red),
            "BLUE" => Some(Self::Blue),
            "GREEN" => Some(Self::Green),
            "ALL" => Some(Self::All),
            "NONE" => Some(Self::None),
            _ => None,
        }
    }

    /// The toggle character this report is equivalent to.
    pub fn toggle_symbol(self) -> u8 {
        match self {
            Self::Red => b'r',
            Self::Green => b'g',
            Self::Blue => b'b',
            Self::All => b'a',
            Self::None => b'A',
        }
    }
}

/// A decoded unit received from the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    /// Echo of a command character (`r R g G b B a A s`).
    SingleCharCommand(char),
    ModeReport(Mode),
    LedReport(LedToken),
    ButtonPressed,
    ButtonReleased,
    /// `BTN:1` (pressed) / `BTN:0` (released).
    ButtonReport(bool),
    Unrecognized(Vec<u8>),
}

impl InboundEvent {
    /// The intent this event confirms, if any. An `LED:` report stands for
    /// the toggle it is equivalent to.
    pub fn as_intent(&self) -> Option<Intent> {
        match self {
            Self::SingleCharCommand(c) => u8::try_from(*c).ok().and_then(Intent::from_symbol),
            Self::ModeReport(mode) => Some(Intent::SetMode(*mode)),
            Self::LedReport(token) => Intent::from_symbol(token.toggle_symbol()),
            _ => None,
        }
    }

    /// Some(pressed) for either spelling of a button event.
    pub fn button_state(&self) -> Option<bool> {
        match self {
            Self::ButtonPressed => Some(true),
            Self::ButtonReleased => Some(false),
            Self::ButtonReport(pressed) => Some(*pressed),
            _ => None,
        }
    }

    /// Reports answer a state query.
    pub fn is_report(&self) -> bool {
        matches!(self, Self::ModeReport(_) | Self::LedReport(_))
    }
}

/// Why a framed line failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Line is not ASCII")]
    NotAscii,
    #[error("Missing ':' separator in '{0}'")]
    MissingSeparator(String),
    #[error("Unknown report prefix '{0}'")]
    UnknownPrefix(String),
    #[error("Invalid mode '{0}'")]
    InvalidMode(String),
    #[error("Invalid LED token '{0}'")]
    InvalidLedToken(String),
    #[error("Invalid button state '{0}'")]
    InvalidButtonState(String),
}

/// Classify a single byte received on its own.
pub fn decode_byte(byte: u8) -> InboundEvent {
    match byte {
        b'r' | b'R' | b'g' | b'G' | b'b' | b'B' | b'a' | b'A' | b's' => {
            InboundEvent::SingleCharCommand(char::from(byte))
        }
        b'0'..=b'4' => match Mode::new(byte - b'0') {
            Some(mode) => InboundEvent::ModeReport(mode),
            None => InboundEvent::Unrecognized(vec![byte]),
        },
        b'P' => InboundEvent::ButtonPressed,
        b'L' => InboundEvent::ButtonReleased,
        _ => InboundEvent::Unrecognized(vec![byte]),
    }
}

/// Parse a framed `PREFIX:value` report. Surrounding whitespace and any
/// leftover terminators are ignored.
pub fn parse_report(line: &[u8]) -> Result<InboundEvent, ProtocolError> {
    let text = std::str::from_utf8(line)
        .ok()
        .filter(|s| s.is_ascii())
        .ok_or(ProtocolError::NotAscii)?
        .trim();

    let (prefix, value) = text
        .split_once(':')
        .ok_or_else(|| ProtocolError::MissingSeparator(text.to_string()))?;
    let value = value.trim();

    match prefix.trim() {
        "MODE" => value
            .parse::<u8>()
            .ok()
            .and_then(Mode::new)
            .map(InboundEvent::ModeReport)
            .ok_or_else(|| ProtocolError::InvalidMode(value.to_string())),
        "LED" => LedToken::parse(value)
            .map(InboundEvent::LedReport)
            .ok_or_else(|| ProtocolError::InvalidLedToken(value.to_string())),
        "BTN" => match value {
            "1" => Ok(InboundEvent::ButtonReport(true)),
            "0" => Ok(InboundEvent::ButtonReport(false)),
            other => Err(ProtocolError::InvalidButtonState(other.to_string())),
        },
        other => Err(ProtocolError::UnknownPrefix(other.to_string())),
    }
}

/// Decode a framed line. Parse failures are downgraded to `Unrecognized`.
pub fn decode_line(line: &[u8]) -> InboundEvent {
    match parse_report(line) {
        Ok(event) => event,
        Err(e) => {
            log::warn!("{} ({})", e, describe_unrecognized(line));
            InboundEvent::Unrecognized(line.to_vec())
        }
    }
}

/// Decode one framed unit: single bytes as characters, anything longer as a line.
pub fn decode(frame: &Frame) -> InboundEvent {
    match frame.bytes.as_slice() {
        [byte] => decode_byte(*byte),
        line => decode_line(line),
    }
}
