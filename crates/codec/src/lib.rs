//! # Codec
//!
//! Stateless mapping between operator intents and the board's
//! single-character wire alphabet, plus decoding of inbound units
//! (single characters and `MODE:` / `LED:` / `BTN:` framed reports).
//!
//! ```text
//! Intent ──encode──► Command ('r', 'R', … '0'..'4', 's') ──► wire
//! wire ──framer──► Frame ──decode──► InboundEvent
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod hex;
pub mod inbound;
pub mod intent;

pub use inbound::{decode, decode_byte, decode_line, parse_report, InboundEvent, LedToken, ProtocolError};
pub use intent::{encode, Color, Command, Intent, Mode, ParseIntentError};
