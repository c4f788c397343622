use crate::constants::reader::CLEANUP_TIMEOUT_MS;
use crate::reader_loop::ReaderLoop;
use actor_runtime::{actor_debug, actor_warn, StateMessage, StopFlag};
use core_types::{Transport, TransportError};
use futures_channel::{mpsc, oneshot};
use std::sync::Arc;
use std::time::Duration;

/// An open transport with exactly one reader thread attached.
///
/// Lifecycle: `open` starts the reader, `close` stops it and then closes the
/// transport. Writes go straight to the transport's write half and never wait
/// on the reader.
pub struct ConnectionHandle {
    transport: Arc<dyn Transport>,
    stop: StopFlag,
    done_rx: Option<oneshot::Receiver<()>>,
}

impl ConnectionHandle {
    pub fn open(
        transport: Arc<dyn Transport>,
        state_tx: mpsc::Sender<StateMessage>,
        poll_interval: Duration,
    ) -> Result<Self, TransportError> {
        let stop = StopFlag::new();
        let (done_tx, done_rx) = oneshot::channel();

        let reader = ReaderLoop::new(transport.clone(), state_tx, stop.clone(), poll_interval);
        if let Err(e) = reader.spawn(done_tx) {
            transport.close();
            return Err(e);
        }

        Ok(Self {
            transport,
            stop,
            done_rx: Some(done_rx),
        })
    }

    pub fn port_name(&self) -> &str {
        self.transport.name()
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        self.transport.write(data)
    }

    /// Stop the reader, wait for it to exit, then close the transport.
    ///
    /// Safe to call more than once.
    pub async fn close(&mut self) {
        self.stop.raise();

        if let Some(done_rx) = self.done_rx.take() {
            match tokio::time::timeout(Duration::from_millis(CLEANUP_TIMEOUT_MS), done_rx).await {
                Ok(_) => actor_debug!("Connection: reader for {} exited", self.port_name()),
                Err(_) => actor_warn!(
                    "Connection: reader for {} did not exit within {}ms. Closing anyway.",
                    self.port_name(),
                    CLEANUP_TIMEOUT_MS
                ),
            }
        }

        // Closing also unblocks a reader that overran the cleanup timeout.
        self.transport.close();
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.stop.raise();
        self.transport.close();
    }
}
