//! # Actor Runtime
//!
//! Provides the runtime infrastructure for the LED link actor system.
//!
//! This crate defines:
//! - **Actor trait**: Base trait for all actors with lifecycle methods
//! - **Channel management**: Type-safe message routing between actors
//! - **Supervision**: Cancellable timeouts and the query retry policy
//! - **Cancellation**: Stop flag for the blocking reader thread
//!
//! ## Architecture
//!
//! The actor runtime follows these principles:
//! - **Zero shared state**: Each actor owns its data
//! - **Message passing**: Actors communicate via typed messages
//! - **Sequential processing**: Messages are handled one at a time
//! - **Failure isolation**: Actor errors don't crash the system
//!
//! ## Example
//!
//! ```ignore
//! use actor_runtime::{spawn_actor, ChannelManager};
//!
//! // Create channel infrastructure
//! let (manager, handles) = ChannelManager::new();
//!
//! // Create and spawn actors
//! let state_actor = StateActor::new(/* ... */);
//! spawn_actor(state_actor, handles.state_rx, handles.event_tx.clone());
//!
//! // Send commands from the operator
//! manager.send_command(UiCommand::Connect { port: "COM3".into(), baud: 9600 })?;
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod actor;
pub mod cancellation;
pub mod channels;
pub mod logging;
pub mod supervision;

#[doc(hidden)]
pub use log as __log;

pub use actor::{spawn_actor, Actor};
pub use cancellation::StopFlag;
pub use channels::{pump_events, ActorHandles, ChannelManager, PortMessage, StateMessage};
pub use supervision::{spawn_timeout, QueryRetryPolicy, SupervisionConfig, TimeoutHandle};
