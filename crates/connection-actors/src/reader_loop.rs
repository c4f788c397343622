//! Blocking reader thread.
//!
//! Serial reads block for up to the port's read timeout, so the reader runs
//! on its own OS thread instead of a tokio worker. Each poll it drains the
//! transport, frames the bytes into units and hands every decoded unit to the
//! StateActor in arrival order.
//!
//! Handing off waits for mailbox capacity. A slow engine therefore slows the
//! reader down; nothing read from the wire is ever discarded.

use actor_runtime::{actor_debug, actor_warn, StateMessage, StopFlag};
use codec::decode;
use codec::hex::ascii_preview;
use core_types::{Transport, TransportError};
use framing::{Framer, ReportFramer};
use futures::SinkExt;
use futures_channel::{mpsc, oneshot};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Everything the reader thread owns.
pub struct ReaderLoop {
    transport: Arc<dyn Transport>,
    state_tx: mpsc::Sender<StateMessage>,
    stop: StopFlag,
    poll_interval: Duration,
    framer: ReportFramer,
}

impl ReaderLoop {
    pub fn new(
        transport: Arc<dyn Transport>,
        state_tx: mpsc::Sender<StateMessage>,
        stop: StopFlag,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            state_tx,
            stop,
            poll_interval,
            framer: ReportFramer::new(),
        }
    }

    /// Start the loop on a named thread. `done_tx` fires when it has exited.
    pub fn spawn(self, done_tx: oneshot::Sender<()>) -> Result<(), TransportError> {
        let name = format!("reader-{}", self.transport.name());
        thread::Builder::new()
            .name(name)
            .spawn(move || {
                self.run();
                let _ = done_tx.send(());
            })
            .map(|_| ())
            .map_err(|e| TransportError::Io(format!("Failed to start reader thread: {}", e)))
    }

    fn run(mut self) {
        let started = Instant::now();
        actor_debug!(
            "Reader: polling {} every {:?} ({} framing)",
            self.transport.name(),
            self.poll_interval,
            self.framer.name()
        );

        'poll: while !self.stop.is_raised() {
            let tick = Instant::now();
            let timestamp_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

            let frames = match self.transport.read_available() {
                Ok(bytes) if bytes.is_empty() => self.framer.flush_idle(timestamp_us),
                Ok(bytes) => {
                    actor_debug!("Received: {}", ascii_preview(&bytes));
                    self.framer.push(&bytes, timestamp_us)
                }
                Err(e) => {
                    // A read failing because we closed the port is not a loss.
                    if !self.stop.is_raised() {
                        actor_warn!("Reader: {} failed: {}", self.transport.name(), e);
                        self.forward(StateMessage::ConnectionLost {
                            reason: e.to_string(),
                        });
                    }
                    break;
                }
            };

            for frame in frames {
                if self.stop.is_raised() {
                    break 'poll;
                }
                if !self.forward(StateMessage::Inbound(decode(&frame))) {
                    break 'poll;
                }
            }

            if let Some(rest) = self.poll_interval.checked_sub(tick.elapsed()) {
                thread::sleep(rest);
            }
        }

        actor_debug!("Reader: {} stopped", self.transport.name());
    }

    /// Blocks until the mailbox has room. False once the StateActor is gone.
    fn forward(&mut self, msg: StateMessage) -> bool {
        futures::executor::block_on(self.state_tx.send(msg)).is_ok()
    }
}
