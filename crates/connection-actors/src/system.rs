use crate::constants::reader::POLL_INTERVAL_MS;
use crate::{PortActor, StateActor};
use actor_runtime::{spawn_actor, ChannelManager, SupervisionConfig};
use core_types::TransportFactory;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for [`create_actor_system`].
#[derive(Debug, Clone)]
pub struct SystemOptions {
    pub supervision: SupervisionConfig,
    /// How often the reader thread polls the port.
    pub poll_interval: Duration,
}

impl Default for SystemOptions {
    fn default() -> Self {
        Self {
            supervision: SupervisionConfig::default(),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

/// Initialize the complete actor system
///
/// Creates the StateActor and PortActor, wires them together via channels and
/// spawns both on the current tokio runtime. Returns the ChannelManager the
/// operator uses to send commands and receive events.
pub fn create_actor_system(
    factory: Arc<dyn TransportFactory>,
    options: SystemOptions,
) -> ChannelManager {
    let (manager, handles) = ChannelManager::new();

    let state_actor = StateActor::new(
        manager.port_sender(),
        handles.event_tx.clone(),
        manager.state_sender(),
    )
    .with_supervision(options.supervision);

    let port_actor = PortActor::new(
        factory,
        manager.state_sender(),
        handles.event_tx.clone(),
        options.poll_interval,
    );

    spawn_actor(state_actor, handles.state_rx, handles.event_tx.clone());
    spawn_actor(port_actor, handles.port_rx, handles.event_tx);

    manager
}
