//! # Actor Protocol
//!
//! Type-safe message definitions for the LED link actor system, plus the pure
//! device-state model the `StateActor` drives.
//!
//! This crate does no I/O and spawns nothing, making it fully testable on its
//! own.
//!
//! ## Architecture
//!
//! - **UiCommand**: Messages from operator → Actor System
//! - **SystemEvent**: Messages from Actor System → operator
//! - **ConnectionState**: FSM state machine (pure logic, no side effects)
//! - **DeviceState**: reconciled LED state (pure logic, returns reactions)
//!
//! ## Message Flow
//!
//! ```text
//! operator → UiCommand → StateActor → PortMessage → PortActor → wire
//!                           ↑   ↓
//!     wire → reader thread ─┘   SystemEvent → Sink
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod device;
pub mod errors;
pub mod messages;
pub mod sink;
pub mod state;

pub use device::{DeviceSnapshot, DeviceState, EngineInput, PendingQuery, Reaction};
pub use errors::ActorError;
pub use messages::{SystemEvent, UiCommand};
pub use sink::Sink;
pub use state::ConnectionState;
