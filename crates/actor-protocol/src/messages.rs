use crate::device::DeviceSnapshot;
use crate::state::ConnectionState;
use codec::Intent;
use serde::{Deserialize, Serialize};

/// Commands from the operator to the actor system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UiCommand {
    /// Request to connect to a serial port
    Connect { port: String, baud: u32 },

    /// Request to disconnect from current port
    Disconnect,

    /// Encode and transmit an intent (no local state change)
    SendIntent { intent: Intent },
}

/// Events from the actor system to the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SystemEvent {
    /// Connection state has changed
    StateChanged { state: ConnectionState },

    /// The board's confirmed LED state has changed
    DeviceStateChanged { snapshot: DeviceSnapshot },

    /// Physical button on the board
    ButtonChanged { pressed: bool },

    /// Diagnostic line for user display
    StatusUpdate { message: String },

    /// Error occurred
    Error { message: String },
}

impl SystemEvent {
    pub fn status(message: impl Into<String>) -> Self {
        Self::StatusUpdate {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
