//! # Native Transport
//!
//! [`Transport`](core_types::Transport) implementations for desktop targets:
//!
//! - [`SerialTransport`]: a real serial port through the `serialport` crate,
//!   with split read/write handles and an in-process exclusivity claim.
//! - [`MockTransport`]: in-memory link, optionally backed by a
//!   [`SimulatedBoard`] that behaves like the LED firmware.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod mock;
pub mod registry;
pub mod serial;

pub use mock::{MockTransport, MockTransportFactory, SimulatedBoard};
pub use registry::PortClaim;
pub use serial::{available_ports, SerialTransport, SerialTransportFactory};
