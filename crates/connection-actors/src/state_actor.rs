use crate::backoff::calculate_retry_delay_with_base;
use crate::constants::reader::READ_TIMEOUT_MS;
use actor_protocol::{
    ActorError, ConnectionState, DeviceState, EngineInput, PendingQuery, Reaction, SystemEvent,
    UiCommand,
};
use actor_runtime::{
    actor_debug, actor_info, actor_warn, spawn_timeout, Actor, PortMessage, StateMessage,
    SupervisionConfig, TimeoutHandle,
};
use codec::{InboundEvent, Intent};
use core_types::SerialConfig;
use futures::SinkExt;
use futures_channel::mpsc;
use std::time::Duration;

/// StateActor manages the connection state machine and owns the device model
///
/// Responsibilities:
/// - Maintain single source of truth for connection state
/// - Validate and execute state transitions
/// - Apply every inbound unit and local intent to [`DeviceState`], in order
/// - Carry out the resulting reactions (notify, transmit, diagnostics)
/// - Supervise unanswered state queries
///
/// ## State Machine
///
/// For the transition table, see `actor-protocol/src/state.rs`.
///
/// Key coordination patterns:
/// - **Event-driven disconnect**: Disconnecting → ConnectionClosed → Disconnected
/// - **Connection loss**: Connected → ConnectionLost → Disconnecting → Disconnected
/// - **Query round-trip**: `L` → `s` written → `MODE:n` clears the pending flag
pub struct StateActor {
    state: ConnectionState,
    device: DeviceState,
    port_tx: mpsc::Sender<PortMessage>,
    event_tx: mpsc::Sender<SystemEvent>,

    // Channel to send messages to self (for timeouts)
    state_tx: mpsc::Sender<StateMessage>,

    supervision_config: SupervisionConfig,

    // Active timeout handle - automatically cancelled when StateActor transitions state
    active_timeout: Option<TimeoutHandle>,

    // Armed while a QueryState is unanswered
    query_timeout: Option<TimeoutHandle>,
    query_attempt: u32,

    // Port being opened or held, for status lines
    pending_port: Option<String>,

    // Operation sequence tracking for detecting stale responses
    // Incremented on each Open operation, used to validate ConnectionEstablished
    operation_sequence: u32,
}

impl StateActor {
    pub fn new(
        port_tx: mpsc::Sender<PortMessage>,
        event_tx: mpsc::Sender<SystemEvent>,
        state_tx: mpsc::Sender<StateMessage>,
    ) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            device: DeviceState::new(),
            port_tx,
            event_tx,
            state_tx,
            supervision_config: SupervisionConfig::default(),
            active_timeout: None,
            query_timeout: None,
            query_attempt: 0,
            pending_port: None,
            operation_sequence: 0,
        }
    }

    pub fn with_supervision(mut self, config: SupervisionConfig) -> Self {
        self.supervision_config = config;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    /// Get next operation ID for tracking port open operations
    ///
    /// Used to detect stale ConnectionEstablished messages after timeout.
    fn next_operation_id(&mut self) -> u32 {
        self.operation_sequence = self.operation_sequence.wrapping_add(1);
        self.operation_sequence
    }

    /// Send a CRITICAL message that must succeed for system correctness
    ///
    /// If the channel is closed, the PortActor has shut down.
    /// If the channel is full, the system is overloaded.
    /// Both cases propagate as errors.
    fn send_critical_port(&self, msg: PortMessage) -> Result<(), ActorError> {
        self.port_tx.clone().try_send(msg).map_err(|e| {
            if e.is_disconnected() {
                ActorError::ChannelClosed("PortActor has shut down".into())
            } else {
                ActorError::Other("PortActor channel overloaded".into())
            }
        })
    }

    /// Deliver a UI event, waiting for room in the event channel
    ///
    /// Snapshots and diagnostics are never dropped while a subscriber holds
    /// the receiver; a slow subscriber slows the actor down instead.
    async fn send_ui_event(&mut self, event: SystemEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            actor_debug!("UI event not delivered, subscriber gone: {}", e);
        }
    }

    /// Attempt to transition to a new state
    ///
    /// Returns Ok if transition is valid, Err otherwise
    async fn transition(&mut self, new_state: ConnectionState) -> Result<(), ActorError> {
        if !self.state.can_transition_to(new_state) {
            return Err(ActorError::InvalidTransition(format!(
                "{:?} → {:?}",
                self.state, new_state
            )));
        }

        let old_state = self.state;

        // Cancel any active timeout from previous state
        if let Some(handle) = self.active_timeout.take() {
            handle.cancel();
            actor_debug!("Cancelled timeout for previous state");
        }
        if new_state != ConnectionState::Connected {
            self.cancel_query_timeout();
        }

        self.state = new_state;
        self.send_ui_event(SystemEvent::StateChanged { state: new_state }).await;
        actor_debug!("State: {:?} → {:?}", old_state, new_state);

        self.active_timeout = self.spawn_supervision_timeout_if_needed(new_state);

        Ok(())
    }

    /// Spawn a supervision timeout for states that might hang
    fn spawn_supervision_timeout_if_needed(&self, state: ConnectionState) -> Option<TimeoutHandle> {
        let (operation, timeout_secs) = match state {
            ConnectionState::Connecting => {
                ("Connecting", self.supervision_config.connect_timeout_secs)
            }
            ConnectionState::Disconnecting => (
                "Disconnecting",
                self.supervision_config.disconnect_timeout_secs,
            ),
            // Connected and Disconnected are stable
            _ => return None,
        };

        actor_debug!("Spawning {} second timeout for {}", timeout_secs, operation);
        Some(spawn_timeout(
            self.state_tx.clone(),
            StateMessage::OperationTimeout {
                operation: operation.to_string(),
                state,
            },
            Duration::from_secs(timeout_secs),
        ))
    }

    fn cancel_query_timeout(&mut self) {
        if let Some(handle) = self.query_timeout.take() {
            handle.cancel();
        }
    }

    /// Arm the response window for the query just written
    ///
    /// Retry `attempt` waits the response timeout plus the backoff for that
    /// attempt. The original query (attempt 0) has no backoff.
    fn arm_query_timeout(&mut self, attempt: u32) {
        let policy = &self.supervision_config.query_retry;
        let wait_ms = policy
            .response_timeout_ms
            .saturating_add(calculate_retry_delay_with_base(policy.base_delay_ms, attempt));

        self.query_attempt = attempt;
        self.query_timeout = Some(spawn_timeout(
            self.state_tx.clone(),
            StateMessage::QueryTimeout { attempt },
            Duration::from_millis(wait_ms),
        ));
    }

    /// Feed one input to the device model and carry out what it asks for
    async fn apply(&mut self, input: EngineInput, attempt: u32) -> Result<(), ActorError> {
        let reactions = self.device.apply(&input);
        for reaction in reactions {
            match reaction {
                Reaction::Notify(snapshot) => {
                    self.send_ui_event(SystemEvent::DeviceStateChanged { snapshot }).await
                }
                Reaction::Button { pressed } => {
                    self.send_ui_event(SystemEvent::ButtonChanged { pressed }).await
                }
                Reaction::Diagnostic(text) => {
                    self.send_ui_event(SystemEvent::status(text)).await
                }
                Reaction::Transmit(command) => {
                    self.send_critical_port(PortMessage::Write {
                        data: vec![command.as_byte()],
                    })?;
                    if command.is_query() {
                        self.arm_query_timeout(attempt);
                    }
                }
            }
        }

        if self.device.pending() == PendingQuery::None {
            self.cancel_query_timeout();
        }
        Ok(())
    }

    async fn handle_connect(&mut self, port: String, baud: u32) -> Result<(), ActorError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ActorError::UnexpectedMessage {
                state: format!("{:?}", self.state),
                message: "Connect".into(),
            });
        }
        if baud == 0 {
            return Err(ActorError::Connection(format!("{}: invalid baud rate 0", port)));
        }

        self.pending_port = Some(port.clone());
        self.transition(ConnectionState::Connecting).await?;

        let operation_id = self.next_operation_id();
        self.send_critical_port(PortMessage::Open {
            port,
            config: SerialConfig::new_8n1(baud).with_read_timeout(READ_TIMEOUT_MS),
            operation_id,
        })
    }

    async fn handle_disconnect(&mut self) -> Result<(), ActorError> {
        if !self.state.can_disconnect() {
            return Err(ActorError::UnexpectedMessage {
                state: format!("{:?}", self.state),
                message: "Disconnect".into(),
            });
        }

        self.transition(ConnectionState::Disconnecting).await?;

        // Tell PortActor to close (CRITICAL - must succeed for resource cleanup)
        // Disconnected follows when PortActor confirms with ConnectionClosed.
        self.send_critical_port(PortMessage::Close)
    }

    async fn handle_connection_established(&mut self, operation_id: u32) -> Result<(), ActorError> {
        if self.state == ConnectionState::Disconnecting {
            // Disconnect raced the open; the queued Close releases the port.
            actor_debug!("Ignoring ConnectionEstablished while disconnecting");
            return Ok(());
        }
        if self.state != ConnectionState::Connecting {
            return Err(ActorError::UnexpectedMessage {
                state: format!("{:?}", self.state),
                message: "ConnectionEstablished".into(),
            });
        }

        // Validate operation ID to prevent orphan ports from timed-out operations
        if operation_id != self.operation_sequence {
            actor_debug!(
                "Ignoring stale ConnectionEstablished (operation_id={}, expected={})",
                operation_id,
                self.operation_sequence
            );

            // Close the orphan port to prevent resource leak (CRITICAL)
            self.send_critical_port(PortMessage::Close)?;

            return Err(ActorError::InvalidTransition(
                "Stale ConnectionEstablished".to_string(),
            ));
        }

        self.transition(ConnectionState::Connected).await?;
        self.apply(EngineInput::ConnectionOpened, 0).await?;

        let port = self.pending_port.clone().unwrap_or_default();
        actor_info!("Connected to {}", port);
        self.send_ui_event(SystemEvent::status(format!("Connected to {}", port)))
            .await;
        Ok(())
    }

    async fn handle_connection_failed(
        &mut self,
        operation_id: u32,
        reason: String,
    ) -> Result<(), ActorError> {
        if self.state != ConnectionState::Connecting || operation_id != self.operation_sequence {
            actor_debug!(
                "Ignoring ConnectionFailed (operation_id={}) in {:?}",
                operation_id,
                self.state
            );
            return Ok(());
        }

        self.send_ui_event(SystemEvent::error(format!("Connection failed: {}", reason)))
            .await;
        self.pending_port = None;
        self.transition(ConnectionState::Disconnected).await
    }

    async fn handle_connection_lost(&mut self, reason: String) -> Result<(), ActorError> {
        if self.state != ConnectionState::Connected {
            actor_debug!("Ignoring ConnectionLost in {:?} state", self.state);
            return Ok(());
        }

        actor_warn!("Connection lost: {}", reason);
        self.send_ui_event(SystemEvent::error(format!("Connection lost: {}", reason)))
            .await;

        // No auto-reconnect: close cleanly and settle in Disconnected.
        self.transition(ConnectionState::Disconnecting).await?;
        self.send_critical_port(PortMessage::Close)
    }

    async fn handle_connection_closed(&mut self) -> Result<(), ActorError> {
        if self.state != ConnectionState::Disconnecting {
            actor_debug!("Ignoring ConnectionClosed in {:?} state", self.state);
            return Ok(());
        }

        self.transition(ConnectionState::Disconnected).await?;
        self.pending_port = None;
        self.send_ui_event(SystemEvent::status("Disconnected")).await;
        Ok(())
    }

    async fn handle_send_intent(&mut self, intent: Intent) -> Result<(), ActorError> {
        if !self.state.can_transmit() {
            return Err(ActorError::NotConnected);
        }
        actor_debug!("Intent: {}", intent);
        self.apply(EngineInput::LocalIntent(intent), 0).await
    }

    async fn handle_inbound(&mut self, event: InboundEvent) -> Result<(), ActorError> {
        if self.state != ConnectionState::Connected {
            actor_debug!("Dropping {:?} received in {:?} state", event, self.state);
            return Ok(());
        }
        self.apply(EngineInput::Inbound(event), 0).await
    }

    async fn handle_query_timeout(&mut self, attempt: u32) -> Result<(), ActorError> {
        if self.state != ConnectionState::Connected
            || self.device.pending() != PendingQuery::AwaitingModeReport
            || attempt != self.query_attempt
            || self.query_timeout.is_none()
        {
            actor_debug!("Ignoring stale query timeout (attempt {})", attempt);
            return Ok(());
        }
        self.query_timeout = None;

        let max_retries = self.supervision_config.query_retry.max_retries;
        if attempt < max_retries {
            let next = attempt.saturating_add(1);
            actor_info!("No state report yet, retrying query ({}/{})", next, max_retries);
            return self.apply(EngineInput::LocalIntent(Intent::QueryState), next).await;
        }

        // Out of retries: report once and leave the pending flag set.
        let sent = attempt.saturating_add(1);
        actor_warn!("No state report after {} queries", sent);
        let text = format!("No state report from board after {} attempts", sent);
        self.send_ui_event(SystemEvent::status(text)).await;
        Ok(())
    }

    async fn handle_operation_timeout(
        &mut self,
        operation: String,
        expected_state: ConnectionState,
    ) -> Result<(), ActorError> {
        // Only handle timeout if we're still in the expected state
        // (if state has changed, the operation already completed)
        if self.state != expected_state {
            actor_debug!(
                "Ignoring {} timeout - already transitioned to {:?}",
                operation,
                self.state
            );
            return Ok(());
        }

        actor_info!("Operation timeout: {} in state {:?}", operation, self.state);
        let text = format!("{} operation timed out. Please try again.", operation);
        self.send_ui_event(SystemEvent::error(text)).await;

        match self.state {
            ConnectionState::Connecting => {
                // Failed to establish connection. Disconnected follows ConnectionClosed.
                self.send_critical_port(PortMessage::Close)?;
                self.transition(ConnectionState::Disconnecting).await?;
            }
            ConnectionState::Disconnecting => {
                // Force transition to Disconnected even if close didn't confirm
                actor_info!("Forcing transition to Disconnected after disconnect timeout");
                self.transition(ConnectionState::Disconnected).await?;
                self.pending_port = None;
            }
            _ => {
                actor_info!("Unexpected timeout in state {:?}", self.state);
            }
        }
        Ok(())
    }
}

impl Actor for StateActor {
    type Message = StateMessage;

    fn name(&self) -> &'static str {
        "StateActor"
    }

    async fn handle(&mut self, msg: StateMessage) -> Result<(), ActorError> {
        match msg {
            StateMessage::UiCommand(cmd) => match cmd {
                UiCommand::Connect { port, baud } => self.handle_connect(port, baud).await,
                UiCommand::Disconnect => self.handle_disconnect().await,
                UiCommand::SendIntent { intent } => self.handle_send_intent(intent).await,
            },
            StateMessage::ConnectionEstablished { operation_id } => {
                self.handle_connection_established(operation_id).await
            }
            StateMessage::ConnectionFailed {
                operation_id,
                reason,
            } => self.handle_connection_failed(operation_id, reason).await,
            StateMessage::ConnectionLost { reason } => self.handle_connection_lost(reason).await,
            StateMessage::ConnectionClosed => self.handle_connection_closed().await,
            StateMessage::Inbound(event) => self.handle_inbound(event).await,
            StateMessage::OperationTimeout {
                operation,
                state: expected_state,
            } => {
                self.handle_operation_timeout(operation, expected_state)
                    .await
            }
            StateMessage::QueryTimeout { attempt } => self.handle_query_timeout(attempt).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use actor_protocol::DeviceSnapshot;
    use actor_runtime::QueryRetryPolicy;
    use codec::{decode_byte, decode_line, Color, Mode};
    use futures::stream::StreamExt;

    fn create_test_actor() -> (
        StateActor,
        mpsc::Receiver<PortMessage>,
        mpsc::Receiver<SystemEvent>,
        mpsc::Receiver<StateMessage>,
    ) {
        let (port_tx, port_rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);
        let (state_tx, state_rx) = mpsc::channel(100);

        let actor = StateActor::new(port_tx, event_tx, state_tx);
        (actor, port_rx, event_rx, state_rx)
    }

    /// Actor already in Connected with a fresh device model, channels drained.
    fn connected_actor() -> (
        StateActor,
        mpsc::Receiver<PortMessage>,
        mpsc::Receiver<SystemEvent>,
        mpsc::Receiver<StateMessage>,
    ) {
        let (mut actor, port_rx, event_rx, state_rx) = create_test_actor();
        actor.state = ConnectionState::Connected;
        actor.pending_port = Some("COM3".into());
        (actor, port_rx, event_rx, state_rx)
    }

    fn drain<T>(rx: &mut mpsc::Receiver<T>) -> Vec<T> {
        let mut out = Vec::new();
        while let Ok(Some(item)) = rx.try_next() {
            out.push(item);
        }
        out
    }

    fn snapshots(events: &[SystemEvent]) -> Vec<DeviceSnapshot> {
        events
            .iter()
            .filter_map(|e| match e {
                SystemEvent::DeviceStateChanged { snapshot } => Some(*snapshot),
                _ => None,
            })
            .collect()
    }

    fn written(port_rx: &mut mpsc::Receiver<PortMessage>) -> Vec<u8> {
        drain(port_rx)
            .into_iter()
            .flat_map(|m| match m {
                PortMessage::Write { data } => data,
                other => panic!("Expected Write, got {:?}", other),
            })
            .collect()
    }

    async fn feed_bytes(actor: &mut StateActor, wire: &[u8]) {
        for &b in wire {
            actor
                .handle(StateMessage::Inbound(decode_byte(b)))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (actor, _, _, _) = create_test_actor();
        assert_eq!(actor.state(), ConnectionState::Disconnected);
        assert_eq!(actor.device().snapshot(), DeviceSnapshot::default());
    }

    #[tokio::test]
    async fn test_connect_with_baud() {
        let (mut actor, mut port_rx, mut event_rx, _) = create_test_actor();

        actor
            .handle_connect("/dev/ttyUSB0".into(), 9600)
            .await
            .unwrap();

        // Should transition to Connecting
        assert_eq!(actor.state, ConnectionState::Connecting);

        // Should send Open to PortActor
        match port_rx.next().await.unwrap() {
            PortMessage::Open {
                port,
                config,
                operation_id,
            } => {
                assert_eq!(port, "/dev/ttyUSB0");
                assert_eq!(config.baud_rate, 9600);
                assert_eq!(config.read_timeout_ms, READ_TIMEOUT_MS);
                assert_eq!(operation_id, 1);
            }
            _ => panic!("Wrong message"),
        }

        // Should emit state change event
        match event_rx.next().await.unwrap() {
            SystemEvent::StateChanged { state } => {
                assert_eq!(state, ConnectionState::Connecting);
            }
            _ => panic!("Wrong event"),
        }
    }

    #[tokio::test]
    async fn test_connect_while_connected_is_unexpected() {
        let (mut actor, mut port_rx, _, _) = connected_actor();

        let result = actor
            .handle(StateMessage::UiCommand(UiCommand::Connect {
                port: "COM4".into(),
                baud: 9600,
            }))
            .await;

        match result {
            Err(ActorError::UnexpectedMessage { message, .. }) => assert_eq!(message, "Connect"),
            other => panic!("Expected UnexpectedMessage, got {:?}", other),
        }
        assert!(drain(&mut port_rx).is_empty());
    }

    #[tokio::test]
    async fn test_connect_rejects_zero_baud() {
        let (mut actor, _, _, _) = create_test_actor();
        assert!(actor.handle_connect("COM3".into(), 0).await.is_err());
        assert_eq!(actor.state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connection_established_resets_device() {
        let (mut actor, _port_rx, mut event_rx, _) = create_test_actor();

        actor.handle_connect("COM3".into(), 9600).await.unwrap();
        actor.handle_connection_established(1).await.unwrap();

        assert_eq!(actor.state, ConnectionState::Connected);

        let events = drain(&mut event_rx);
        assert!(matches!(
            events[0],
            SystemEvent::StateChanged {
                state: ConnectionState::Connecting
            }
        ));
        assert!(matches!(
            events[1],
            SystemEvent::StateChanged {
                state: ConnectionState::Connected
            }
        ));
        assert_eq!(snapshots(&events), vec![DeviceSnapshot::default()]);
        match events.last().unwrap() {
            SystemEvent::StatusUpdate { message } => assert_eq!(message, "Connected to COM3"),
            other => panic!("Expected status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failed() {
        let (mut actor, _port_rx, mut event_rx, _) = create_test_actor();

        actor.handle_connect("COM3".into(), 9600).await.unwrap();
        drain(&mut event_rx);

        actor
            .handle(StateMessage::ConnectionFailed {
                operation_id: 1,
                reason: "Port busy".into(),
            })
            .await
            .unwrap();

        assert_eq!(actor.state, ConnectionState::Disconnected);

        match event_rx.next().await.unwrap() {
            SystemEvent::Error { message } => {
                assert!(message.contains("Port busy"));
            }
            _ => panic!("Wrong event"),
        }
    }

    #[tokio::test]
    async fn test_connection_failed_with_stale_operation_ignored() {
        let (mut actor, _, _, _) = create_test_actor();
        actor.state = ConnectionState::Connecting;
        actor.operation_sequence = 4;

        actor
            .handle(StateMessage::ConnectionFailed {
                operation_id: 3,
                reason: "old".into(),
            })
            .await
            .unwrap();

        assert_eq!(actor.state, ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_connection_established_rejects_stale_operation() {
        let (mut actor, mut port_rx, _, _) = create_test_actor();

        actor.state = ConnectionState::Connecting;
        actor.operation_sequence = 5; // Expect operation ID 5

        // Try to establish connection with stale operation ID
        let result = actor.handle_connection_established(3).await;

        // Should reject stale operation
        assert!(result.is_err());
        assert_eq!(actor.state, ConnectionState::Connecting); // State unchanged

        // Should send Close message to PortActor to close orphan port
        match port_rx.next().await.unwrap() {
            PortMessage::Close => {} // Expected
            msg => panic!("Expected Close message, got {:?}", msg),
        }
    }

    #[tokio::test]
    async fn test_connection_established_while_disconnecting_ignored() {
        let (mut actor, _, _, _) = create_test_actor();
        actor.state = ConnectionState::Disconnecting;
        actor.operation_sequence = 1;

        actor.handle_connection_established(1).await.unwrap();
        assert_eq!(actor.state, ConnectionState::Disconnecting);
    }

    #[tokio::test]
    async fn test_disconnect_from_connected() {
        let (mut actor, mut port_rx, mut event_rx, _) = connected_actor();

        actor.handle_disconnect().await.unwrap();

        // Should send Close to PortActor
        match port_rx.next().await.unwrap() {
            PortMessage::Close => {}
            _ => panic!("Wrong message"),
        }

        // Should be in Disconnecting state (event-driven coordination)
        assert_eq!(actor.state, ConnectionState::Disconnecting);

        // Simulate PortActor confirming closure
        actor.handle(StateMessage::ConnectionClosed).await.unwrap();

        // Now should be disconnected
        assert_eq!(actor.state, ConnectionState::Disconnected);
        let events = drain(&mut event_rx);
        match events.last().unwrap() {
            SystemEvent::StatusUpdate { message } => assert_eq!(message, "Disconnected"),
            other => panic!("Expected status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnect_when_disconnected_is_unexpected() {
        let (mut actor, _, _, _) = create_test_actor();
        assert!(actor.handle_disconnect().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_transition_rejected() {
        let (mut actor, _, _, _) = create_test_actor();

        actor.state = ConnectionState::Disconnected;

        // Cannot go directly to Connected
        let result = actor.transition(ConnectionState::Connected).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_send_intent_requires_connection() {
        let (mut actor, mut port_rx, _, _) = create_test_actor();

        let result = actor
            .handle(StateMessage::UiCommand(UiCommand::SendIntent {
                intent: Intent::AllOn,
            }))
            .await;

        match result {
            Err(e @ ActorError::NotConnected) => {
                assert_eq!(e.to_string(), "Not connected to any port")
            }
            other => panic!("Expected NotConnected, got {:?}", other),
        }
        assert!(drain(&mut port_rx).is_empty());
    }

    #[tokio::test]
    async fn test_send_intent_is_not_optimistic() {
        let (mut actor, mut port_rx, mut event_rx, _) = connected_actor();

        actor
            .handle_send_intent(Intent::ColorOn(Color::Red))
            .await
            .unwrap();

        assert_eq!(written(&mut port_rx), b"r");
        assert!(snapshots(&drain(&mut event_rx)).is_empty());
        assert!(!actor.device().snapshot().red);

        // Only the echo changes the model.
        feed_bytes(&mut actor, b"r").await;
        let notified = snapshots(&drain(&mut event_rx));
        assert_eq!(notified.len(), 1);
        assert!(notified[0].red);
    }

    #[tokio::test]
    async fn test_inbound_ordering() {
        let (mut actor, _, mut event_rx, _) = connected_actor();

        feed_bytes(&mut actor, b"rRg").await;

        let notified = snapshots(&drain(&mut event_rx));
        assert_eq!(notified.len(), 3);
        let last = notified[2];
        assert!(!last.red && last.green && !last.blue);
    }

    #[tokio::test]
    async fn test_inbound_ignored_when_not_connected() {
        let (mut actor, _, mut event_rx, _) = create_test_actor();

        feed_bytes(&mut actor, b"a").await;

        assert!(drain(&mut event_rx).is_empty());
        assert!(actor.device().snapshot().all_off());
    }

    #[tokio::test]
    async fn test_button_release_queries_state() {
        let (mut actor, mut port_rx, mut event_rx, _) = connected_actor();

        feed_bytes(&mut actor, b"PL").await;

        assert_eq!(written(&mut port_rx), b"s");
        assert_eq!(
            actor.device().pending(),
            PendingQuery::AwaitingModeReport
        );
        let events = drain(&mut event_rx);
        let buttons: Vec<bool> = events
            .iter()
            .filter_map(|e| match e {
                SystemEvent::ButtonChanged { pressed } => Some(*pressed),
                _ => None,
            })
            .collect();
        assert_eq!(buttons, vec![true, false]);

        actor
            .handle(StateMessage::Inbound(decode_line(b"MODE:2")))
            .await
            .unwrap();
        let snapshot = actor.device().snapshot();
        assert!(!snapshot.red && !snapshot.green && snapshot.blue);
        assert_eq!(snapshot.mode, Some(2));
        assert_eq!(snapshot.pending, PendingQuery::None);
        assert_eq!(snapshots(&drain(&mut event_rx)).len(), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_line_is_one_diagnostic() {
        let (mut actor, _, mut event_rx, _) = connected_actor();
        let before = actor.device().snapshot();

        actor
            .handle(StateMessage::Inbound(decode_line(b"LED:PURPLE")))
            .await
            .unwrap();

        let events = drain(&mut event_rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            SystemEvent::StatusUpdate { message } => assert!(message.starts_with("Unrecognized:")),
            other => panic!("Expected diagnostic, got {:?}", other),
        }
        assert_eq!(actor.device().snapshot(), before);
    }

    #[tokio::test]
    async fn test_mode_report_notifies_once() {
        let (mut actor, _, mut event_rx, _) = connected_actor();

        actor
            .handle(StateMessage::Inbound(InboundEvent::ModeReport(
                Mode::new(4).unwrap(),
            )))
            .await
            .unwrap();

        let notified = snapshots(&drain(&mut event_rx));
        assert_eq!(notified.len(), 1);
        assert!(notified[0].red && notified[0].green && notified[0].blue);
    }

    #[tokio::test]
    async fn test_silent_board_reported_without_retries() {
        let (mut actor, mut port_rx, mut event_rx, _) = connected_actor();

        actor.handle_send_intent(Intent::QueryState).await.unwrap();
        assert_eq!(written(&mut port_rx), b"s");
        assert!(actor.query_timeout.is_some());
        drain(&mut event_rx);

        actor.handle_query_timeout(0).await.unwrap();

        // No re-send; one diagnostic; the flag stays.
        assert!(written(&mut port_rx).is_empty());
        let events = drain(&mut event_rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            SystemEvent::StatusUpdate { message } => {
                assert_eq!(message, "No state report from board after 1 attempts")
            }
            other => panic!("Expected diagnostic, got {:?}", other),
        }
        assert_eq!(actor.device().pending(), PendingQuery::AwaitingModeReport);
    }

    #[tokio::test]
    async fn test_query_retry_then_give_up() {
        let (actor, mut port_rx, mut event_rx, _) = connected_actor();
        let mut actor = actor.with_supervision(SupervisionConfig {
            query_retry: QueryRetryPolicy::with_retries(2),
            ..SupervisionConfig::default()
        });

        actor.handle_send_intent(Intent::QueryState).await.unwrap();
        assert!(actor.query_timeout.is_some());
        assert_eq!(written(&mut port_rx), b"s");

        // First and second retries re-send the query.
        actor.handle_query_timeout(0).await.unwrap();
        assert_eq!(actor.query_attempt, 1);
        actor.handle_query_timeout(1).await.unwrap();
        assert_eq!(actor.query_attempt, 2);
        assert_eq!(written(&mut port_rx), b"ss");
        drain(&mut event_rx);

        // Out of retries: one diagnostic, pending stays.
        actor.handle_query_timeout(2).await.unwrap();
        assert!(written(&mut port_rx).is_empty());
        let events = drain(&mut event_rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            SystemEvent::StatusUpdate { message } => {
                assert!(message.contains("after 3 attempts"))
            }
            other => panic!("Expected diagnostic, got {:?}", other),
        }
        assert_eq!(actor.device().pending(), PendingQuery::AwaitingModeReport);

        // A late duplicate timeout does nothing.
        actor.handle_query_timeout(2).await.unwrap();
        assert!(drain(&mut event_rx).is_empty());
    }

    #[tokio::test]
    async fn test_report_cancels_query_timeout() {
        let (actor, _port_rx, _, _) = connected_actor();
        let mut actor = actor.with_supervision(SupervisionConfig {
            query_retry: QueryRetryPolicy::with_retries(1),
            ..SupervisionConfig::default()
        });

        feed_bytes(&mut actor, b"L").await;
        assert!(actor.query_timeout.is_some());

        actor
            .handle(StateMessage::Inbound(decode_line(b"LED:BLUE")))
            .await
            .unwrap();
        assert!(actor.query_timeout.is_none());
        assert_eq!(actor.device().pending(), PendingQuery::None);
    }

    #[tokio::test]
    async fn test_query_timeout_fires_through_mailbox() {
        let (actor, _port_rx, _, mut state_rx) = connected_actor();
        let mut actor = actor.with_supervision(SupervisionConfig {
            query_retry: QueryRetryPolicy {
                max_retries: 1,
                response_timeout_ms: 20,
                base_delay_ms: 10,
            },
            ..SupervisionConfig::default()
        });

        actor.handle_send_intent(Intent::QueryState).await.unwrap();

        match tokio::time::timeout(Duration::from_secs(2), state_rx.next()).await {
            Ok(Some(StateMessage::QueryTimeout { attempt })) => assert_eq!(attempt, 0),
            other => panic!("Expected QueryTimeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_event_channel_applies_backpressure() {
        let (port_tx, _port_rx) = mpsc::channel(100);
        let (event_tx, mut event_rx) = mpsc::channel(1);
        let (state_tx, _state_rx) = mpsc::channel(100);
        let mut actor = StateActor::new(port_tx, event_tx, state_tx);
        actor.state = ConnectionState::Connected;

        let feeder = tokio::spawn(async move {
            feed_bytes(&mut actor, b"rgbRGB").await;
            actor
        });

        // Let the actor run into the full channel before reading anything.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut seen = Vec::new();
        while seen.len() < 6 {
            match tokio::time::timeout(Duration::from_secs(2), event_rx.next()).await {
                Ok(Some(SystemEvent::DeviceStateChanged { snapshot })) => seen.push(snapshot),
                other => panic!("Expected snapshot, got {:?}", other),
            }
        }

        let actor = feeder.await.unwrap();
        assert!(seen[2].red && seen[2].green && seen[2].blue);
        assert_eq!(seen[5], actor.device().snapshot());
        assert!(seen[5].all_off());
    }

    #[tokio::test]
    async fn test_connection_lost_closes_port() {
        let (mut actor, mut port_rx, mut event_rx, _) = connected_actor();

        actor
            .handle(StateMessage::ConnectionLost {
                reason: "Device unplugged".into(),
            })
            .await
            .unwrap();

        match event_rx.next().await.unwrap() {
            SystemEvent::Error { message } => assert!(message.contains("Device unplugged")),
            other => panic!("Expected Error, got {:?}", other),
        }

        // Should send Close to PortActor to clean up
        match port_rx.next().await.unwrap() {
            PortMessage::Close => {}
            port_msg => panic!("Expected Close message, got {:?}", port_msg),
        }
        assert_eq!(actor.state, ConnectionState::Disconnecting);

        actor.handle(StateMessage::ConnectionClosed).await.unwrap();
        assert_eq!(actor.state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_operation_timeout_connecting() {
        let (mut actor, mut port_rx, mut event_rx, _) = create_test_actor();

        // Transition to Connecting
        actor.state = ConnectionState::Connecting;

        // Simulate timeout message
        actor
            .handle(StateMessage::OperationTimeout {
                operation: "Connecting".to_string(),
                state: ConnectionState::Connecting,
            })
            .await
            .unwrap();

        // Should send error event
        let event = event_rx.next().await.unwrap();
        match event {
            SystemEvent::Error { message } => {
                assert!(message.contains("Connecting"));
                assert!(message.contains("timed out"));
            }
            _ => panic!("Expected Error event, got {:?}", event),
        }

        // Should send Close to PortActor
        match port_rx.next().await.unwrap() {
            PortMessage::Close => {}
            _ => panic!("Expected Close message"),
        }

        // Should transition to Disconnecting
        assert_eq!(actor.state, ConnectionState::Disconnecting);
    }

    #[tokio::test]
    async fn test_operation_timeout_ignored_after_state_change() {
        let (mut actor, _, mut event_rx, _) = connected_actor();

        // Simulate timeout message for old state
        actor
            .handle(StateMessage::OperationTimeout {
                operation: "Connecting".to_string(),
                state: ConnectionState::Connecting,
            })
            .await
            .unwrap();

        // Timeout should be ignored (no error event)
        for event in drain(&mut event_rx) {
            if let SystemEvent::Error { .. } = event {
                panic!("Should not send error for stale timeout");
            }
        }

        // Should remain in Connected state
        assert_eq!(actor.state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_operation_timeout_disconnecting() {
        let (mut actor, _, mut event_rx, _) = create_test_actor();

        // Transition to Disconnecting
        actor.state = ConnectionState::Disconnecting;

        // Simulate timeout message
        actor
            .handle(StateMessage::OperationTimeout {
                operation: "Disconnecting".to_string(),
                state: ConnectionState::Disconnecting,
            })
            .await
            .unwrap();

        // Should send error event
        match event_rx.next().await.unwrap() {
            SystemEvent::Error { message } => {
                assert!(message.contains("Disconnecting"));
            }
            _ => panic!("Expected Error event"),
        }

        // Should force transition to Disconnected
        assert_eq!(actor.state, ConnectionState::Disconnected);
    }
}
