//! Error Handling Guidelines
//!
//! All error messages should follow this format:
//!
//! 1. **What failed**: Describe the operation that failed
//! 2. **Why it failed**: Provide the root cause if known
//! 3. **What to do**: Suggest user action when possible
//!
//! Examples:
//! - ✅ "Failed to open serial port: Device already in use by another application. Close other programs and retry."
//! - ✅ "Not connected to any port: connect before sending commands."
//! - ❌ "No port" (lacks context and action)
//! - ❌ "Error" (too vague)

use core_types::TransportError;
use thiserror::Error;

/// Unified error type for actor operations
#[derive(Error, Debug, Clone)]
pub enum ActorError {
    /// State transition was rejected
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Actor received an unexpected message in current state
    #[error("Unexpected message in state {state}: {message}")]
    UnexpectedMessage { state: String, message: String },

    /// Communication channel closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Timeout waiting for response
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Port could not be claimed (missing, busy, permission denied)
    #[error("Failed to open serial port: {0}")]
    Connection(String),

    /// Read or write failed on a link that should be open
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation needs an open port
    #[error("Not connected to any port")]
    NotConnected,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for ActorError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::ConnectionFailed(reason) => ActorError::Connection(reason),
            TransportError::NotConnected => ActorError::NotConnected,
            TransportError::Io(reason) => ActorError::Transport(reason),
        }
    }
}

impl From<String> for ActorError {
    fn from(s: String) -> Self {
        ActorError::Other(s)
    }
}

impl From<&str> for ActorError {
    fn from(s: &str) -> Self {
        ActorError::Other(s.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ActorError::InvalidTransition("Disconnected → Connected".into());
        assert_eq!(
            err.to_string(),
            "Invalid state transition: Disconnected → Connected"
        );
    }

    #[test]
    fn test_from_transport_error() {
        let err: ActorError = TransportError::ConnectionFailed("COM3 busy".into()).into();
        assert_eq!(err.to_string(), "Failed to open serial port: COM3 busy");

        let err: ActorError = TransportError::NotConnected.into();
        assert_eq!(err.to_string(), "Not connected to any port");

        match ActorError::from(TransportError::Io("broken pipe".into())) {
            ActorError::Transport(msg) => assert_eq!(msg, "broken pipe"),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_error_from_string() {
        let err: ActorError = "Test error".into();
        match err {
            ActorError::Other(msg) => assert_eq!(msg, "Test error"),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_unexpected_message_error() {
        let err = ActorError::UnexpectedMessage {
            state: "Disconnected".into(),
            message: "SendIntent".into(),
        };
        assert!(err
            .to_string()
            .contains("Unexpected message in state Disconnected"));
    }
}
