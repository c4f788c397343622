/// # Connection State Machine
///
/// Single source of truth for whether a port is open. The `StateActor` owns
/// the current value and validates every change with [`can_transition_to`].
///
/// ## State Transition Diagram
///
/// ```text
///            ┌─────────────────┐
///       ┌───►│  Disconnected   │◄──────────────┐
///       │    └────────┬────────┘               │
///       │        User │ Connect                │ ConnectionClosed
///       │             │                        │
///  Open │      ┌──────▼──────┐         ┌───────┴───────┐
///  fails└──────┤ Connecting  ├────────►│ Disconnecting │
///              └──────┬──────┘  User   └───────▲───────┘
///                Port │ opens  cancel          │ User disconnect
///                     │                        │ or link lost
///              ┌──────▼──────┐                 │
///              │  Connected  ├─────────────────┘
///              └─────────────┘
/// ```
///
/// ## State Invariants
///
/// - **Disconnected**: No port open, no reader thread, ready for new connection
/// - **Connecting**: Port opening, PortActor waiting for open() confirmation
/// - **Connected**: Port open, reader thread running, intents are transmitted
/// - **Disconnecting**: Stop flag raised, waiting for PortActor to confirm close
///
/// ## Event-Driven Coordination
///
/// Disconnect does not use fixed delays: Disconnecting → (wait for
/// ConnectionClosed) → Disconnected.
///
/// [`can_transition_to`]: ConnectionState::can_transition_to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConnectionState {
    /// No active connection, ready to connect
    Disconnected,

    /// Initiating connection to port
    Connecting,

    /// Successfully connected and operational
    Connected,

    /// Tearing down connection
    Disconnecting,
}

impl ConnectionState {
    /// Can the user trigger a disconnect action?
    pub fn can_disconnect(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Can intents be written to the wire?
    pub fn can_transmit(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// User-facing status text
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Disconnected => "Ready to connect",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Disconnecting => "Disconnecting...",
        }
    }

    /// Validate if transition to new_state is allowed from current state
    pub fn can_transition_to(&self, new_state: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, new_state) {
            // From Disconnected
            (Disconnected, Connecting) => true, // User connects
            (Disconnected, Disconnected) => true, // Idempotent (no-op)

            // From Connecting
            (Connecting, Connected) => true, // Connection successful
            (Connecting, Disconnecting) => true, // User cancels connection
            (Connecting, Disconnected) => true, // Connection failed

            // From Connected
            (Connected, Disconnecting) => true, // User disconnect or link lost

            // From Disconnecting
            (Disconnecting, Disconnected) => true, // Disconnect complete

            // All other transitions are invalid
            _ => false,
        }
    }
}
