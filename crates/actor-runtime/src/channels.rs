use actor_protocol::{ActorError, ConnectionState, Sink, SystemEvent, UiCommand};
use codec::InboundEvent;
use core_types::SerialConfig;
use futures::stream::StreamExt;
use futures_channel::mpsc;

/// StateActor mailbox capacity. Also bounds how far the reader thread can run
/// ahead of the engine before it blocks.
pub const STATE_CHANNEL_CAPACITY: usize = 256;

/// PortActor mailbox capacity (open/close/write control).
pub const PORT_CHANNEL_CAPACITY: usize = 64;

/// Outbound event capacity. Actors wait for room rather than drop an event,
/// so a subscriber that stops reading stalls them once this fills.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Message types for each actor in the system
#[derive(Debug, Clone)]
pub enum StateMessage {
    /// Commands from the operator
    UiCommand(UiCommand),

    /// Port opened (sent by PortActor)
    ConnectionEstablished {
        /// Operation sequence number to match against expected operation
        operation_id: u32,
    },
    /// Port could not be opened (sent by PortActor)
    ConnectionFailed { operation_id: u32, reason: String },
    /// Reader thread hit an I/O error
    ConnectionLost { reason: String },
    /// Port has been fully closed (sent by PortActor after close completes)
    ConnectionClosed,

    /// One decoded unit from the wire, in arrival order (sent by reader thread)
    Inbound(InboundEvent),

    /// Operation timeout (supervision)
    /// Sent when an operation doesn't complete within expected time
    OperationTimeout {
        operation: String,
        state: ConnectionState,
    },
    /// A state query went unanswered for its response window
    QueryTimeout {
        /// Retry attempt this timeout belongs to (0 = original query)
        attempt: u32,
    },
}

#[derive(Debug, Clone)]
pub enum PortMessage {
    Open {
        port: String,
        config: SerialConfig,
        /// Operation sequence number to track this specific operation
        operation_id: u32,
    },
    Close,
    Write {
        data: Vec<u8>,
    },
}

/// Handles for spawning actors
pub struct ActorHandles {
    pub state_rx: mpsc::Receiver<StateMessage>,
    pub port_rx: mpsc::Receiver<PortMessage>,
    pub state_tx: mpsc::Sender<StateMessage>,
    pub port_tx: mpsc::Sender<PortMessage>,
    pub event_tx: mpsc::Sender<SystemEvent>,
}

/// Channel manager for actor communication
///
/// This is the operator-facing end of the actor system: commands go in with
/// [`send_command`](Self::send_command), which never blocks, and events come
/// out of the receiver returned by [`take_event_receiver`](Self::take_event_receiver).
pub struct ChannelManager {
    // Bounded to keep a stalled consumer from exhausting memory
    state_tx: mpsc::Sender<StateMessage>,
    port_tx: mpsc::Sender<PortMessage>,

    // Event receiver (NOT cloned, replaced with dummy in Clone impl)
    // Note: Clone creates a disconnected receiver - use take_event_receiver() before cloning
    event_rx: mpsc::Receiver<SystemEvent>,
}

impl Clone for ChannelManager {
    fn clone(&self) -> Self {
        let (_dummy_tx, dummy_rx) = mpsc::channel(1);
        Self {
            state_tx: self.state_tx.clone(),
            port_tx: self.port_tx.clone(),
            event_rx: dummy_rx, // Dummy receiver (disconnected)
        }
    }
}

impl ChannelManager {
    /// Create a new channel manager and actor handles
    ///
    /// Returns (ChannelManager for the operator, ActorHandles for spawning actors)
    pub fn new() -> (Self, ActorHandles) {
        let (state_tx, state_rx) = mpsc::channel(STATE_CHANNEL_CAPACITY);
        let (port_tx, port_rx) = mpsc::channel(PORT_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let handles = ActorHandles {
            state_rx,
            port_rx,
            state_tx: state_tx.clone(),
            port_tx: port_tx.clone(),
            event_tx,
        };

        let manager = Self {
            state_tx,
            port_tx,
            event_rx,
        };

        (manager, handles)
    }

    /// Enqueue an operator command and return immediately
    ///
    /// Every command goes through the StateActor, which validates it against
    /// the connection state before anything reaches the port.
    pub fn send_command(&self, cmd: UiCommand) -> Result<(), ActorError> {
        self.state_tx
            .clone()
            .try_send(StateMessage::UiCommand(cmd))
            .map_err(|e| {
                crate::actor_error!("StateActor channel error: {:?}", e);
                if e.is_full() {
                    ActorError::ChannelClosed(
                        "System overloaded: Too many pending commands. Please slow down."
                            .to_string(),
                    )
                } else {
                    ActorError::ChannelClosed(
                        "State management unavailable: the actor system has shut down."
                            .to_string(),
                    )
                }
            })
    }

    /// Get mutable reference to event receiver
    pub fn event_receiver(&mut self) -> &mut mpsc::Receiver<SystemEvent> {
        &mut self.event_rx
    }

    /// Take ownership of event receiver
    ///
    /// The receiver should only be taken once; later calls get a closed one.
    pub fn take_event_receiver(&mut self) -> mpsc::Receiver<SystemEvent> {
        let (_new_tx, new_rx) = mpsc::channel(1);
        std::mem::replace(&mut self.event_rx, new_rx)
    }

    /// Clone senders for direct actor-to-actor communication
    pub fn state_sender(&self) -> mpsc::Sender<StateMessage> {
        self.state_tx.clone()
    }

    pub fn port_sender(&self) -> mpsc::Sender<PortMessage> {
        self.port_tx.clone()
    }
}

/// Forward every event to `sink` until all event senders are gone
///
/// Returns the sink so callers can inspect what it collected.
pub async fn pump_events<S: Sink>(mut rx: mpsc::Receiver<SystemEvent>, mut sink: S) -> S {
    while let Some(event) = rx.next().await {
        sink.notify(event);
    }
    sink
}
