use crate::connection::ConnectionHandle;
use actor_protocol::{ActorError, SystemEvent};
use actor_runtime::{actor_debug, actor_info, Actor, PortMessage, StateMessage};
use codec::hex::ascii_preview;
use core_types::{SerialConfig, TransportFactory};
use futures::SinkExt;
use futures_channel::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// PortActor manages serial port I/O operations
///
/// Responsibilities:
/// - Open/close serial ports through a [`TransportFactory`]
/// - Own the [`ConnectionHandle`] (and with it the reader thread)
/// - Handle write requests
/// - Notify StateActor of connection events
pub struct PortActor {
    factory: Arc<dyn TransportFactory>,
    connection: Option<ConnectionHandle>,
    state_tx: mpsc::Sender<StateMessage>,
    event_tx: mpsc::Sender<SystemEvent>,
    poll_interval: Duration,
}

impl PortActor {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        state_tx: mpsc::Sender<StateMessage>,
        event_tx: mpsc::Sender<SystemEvent>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            factory,
            connection: None,
            state_tx,
            event_tx,
            poll_interval,
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// CRITICAL coordination message to the StateActor
    fn notify_state(&mut self, msg: StateMessage) -> Result<(), ActorError> {
        self.state_tx.try_send(msg).map_err(|e| {
            if e.is_disconnected() {
                ActorError::ChannelClosed("StateActor has shut down".into())
            } else {
                ActorError::Other("StateActor channel overloaded".into())
            }
        })
    }

    async fn send_ui_event(&mut self, event: SystemEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            actor_debug!("PortActor: UI event not delivered: {}", e);
        }
    }

    async fn handle_open(
        &mut self,
        port: String,
        config: SerialConfig,
        operation_id: u32,
    ) -> Result<(), ActorError> {
        if let Some(mut old) = self.connection.take() {
            actor_info!(
                "PortActor: closing {} before opening {}",
                old.port_name(),
                port
            );
            old.close().await;
        }

        // Opening a real port can block on the driver.
        let factory = self.factory.clone();
        let target = port.clone();
        let opened = tokio::task::spawn_blocking(move || factory.open(&target, &config))
            .await
            .map_err(|e| ActorError::Other(format!("Port open task failed: {}", e)))?;

        let transport = match opened {
            Ok(transport) => transport,
            Err(e) => {
                actor_info!("PortActor: failed to open {}: {}", port, e);
                return self.notify_state(StateMessage::ConnectionFailed {
                    operation_id,
                    reason: e.to_string(),
                });
            }
        };

        // Announce before the reader starts so no inbound unit overtakes it.
        self.notify_state(StateMessage::ConnectionEstablished { operation_id })?;

        match ConnectionHandle::open(transport, self.state_tx.clone(), self.poll_interval) {
            Ok(connection) => {
                actor_info!("PortActor: {} open", port);
                self.connection = Some(connection);
                Ok(())
            }
            Err(e) => self.notify_state(StateMessage::ConnectionLost {
                reason: e.to_string(),
            }),
        }
    }

    async fn handle_close(&mut self) -> Result<(), ActorError> {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
            actor_debug!("PortActor: {} closed", connection.port_name());
        }

        // Always confirm, even if nothing was open: the StateActor waits for it.
        self.notify_state(StateMessage::ConnectionClosed)
    }

    async fn handle_write(&mut self, data: Vec<u8>) -> Result<(), ActorError> {
        let connection = self.connection.as_ref().ok_or(ActorError::NotConnected)?;
        connection.write(&data)?;

        let sent = ascii_preview(&data);
        actor_debug!("Sent: {}", sent);
        self.send_ui_event(SystemEvent::status(format!("Sent: {}", sent))).await;
        Ok(())
    }
}

impl Actor for PortActor {
    type Message = PortMessage;

    fn name(&self) -> &'static str {
        "PortActor"
    }

    async fn handle(&mut self, msg: PortMessage) -> Result<(), ActorError> {
        match msg {
            PortMessage::Open {
                port,
                config,
                operation_id,
            } => self.handle_open(port, config, operation_id).await,
            PortMessage::Close => self.handle_close().await,
            PortMessage::Write { data } => self.handle_write(data).await,
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
    }
}
