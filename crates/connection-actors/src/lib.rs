//! # Connection Actors
//!
//! Actors that connect the LED board to the operator.
//!
//! ## Actors
//!
//! - **StateActor**: Connection FSM plus the device model. Every inbound unit
//!   and every local intent is applied here, one at a time.
//! - **PortActor**: Opens and closes the port, owns the reader thread, writes
//!   command bytes.
//!
//! The reader itself is a plain OS thread ([`reader_loop`]) because serial
//! reads block.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod backoff;
pub mod connection;
pub mod constants;
pub mod port_actor;
pub mod reader_loop;
pub mod state_actor;
pub mod system;

pub use connection::ConnectionHandle;
pub use port_actor::PortActor;
pub use reader_loop::ReaderLoop;
pub use state_actor::StateActor;
pub use system::{create_actor_system, SystemOptions};
