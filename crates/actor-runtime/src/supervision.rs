/// Supervision utilities for actor operations
///
/// Provides timeout-based supervision to prevent actors from getting stuck
/// in long-running operations, and the retry window for state queries.
use crate::StateMessage;
use futures::SinkExt;
use futures_channel::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often a pending timeout checks whether it was cancelled
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Handle to cancel a timeout operation
///
/// When dropped or explicitly cancelled, the timeout task will not send
/// the timeout message, preventing spurious timeouts after operations complete.
pub struct TimeoutHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimeoutHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel the timeout, preventing it from firing
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TimeoutHandle {
    fn drop(&mut self) {
        // Auto-cancel when handle is dropped
        self.cancel();
    }
}

/// Retry policy for unanswered state queries
///
/// Every query gets a response window. `max_retries = 0` means the query is
/// sent once; if the window closes without a report the board is reported
/// silent and the pending flag stays set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRetryPolicy {
    /// Extra `QueryState` transmissions after the first one
    pub max_retries: u32,
    /// How long to wait for a mode/LED report before retrying
    pub response_timeout_ms: u64,
    /// Base of the exponential backoff added on each retry
    pub base_delay_ms: u64,
}

impl QueryRetryPolicy {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

impl Default for QueryRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            response_timeout_ms: 500,
            base_delay_ms: 100,
        }
    }
}

/// Timeout configuration for supervised operations
#[derive(Debug, Clone)]
pub struct SupervisionConfig {
    /// Timeout for connection operations (port opening)
    pub connect_timeout_secs: u64,
    /// Timeout for disconnection operations (port closing)
    pub disconnect_timeout_secs: u64,
    /// What to do when a state query goes unanswered
    pub query_retry: QueryRetryPolicy,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10, // 10s for port opening
            disconnect_timeout_secs: 5, // 5s for port closing
            query_retry: QueryRetryPolicy::default(),
        }
    }
}

/// Spawn a timeout task that delivers `message` to the StateActor after `after`
///
/// Returns a TimeoutHandle that can be used to cancel the timeout. If the handle
/// is dropped or explicitly cancelled before the timeout fires, no message will
/// be sent. This prevents spurious timeout messages after operations complete.
///
/// Must be called from within a tokio runtime.
pub fn spawn_timeout(
    state_tx: mpsc::Sender<StateMessage>,
    message: StateMessage,
    after: Duration,
) -> TimeoutHandle {
    let handle = TimeoutHandle::new();
    let cancel_flag = handle.cancelled.clone();

    tokio::spawn(async move {
        let mut state_tx = state_tx;
        let mut remaining = after;

        while !remaining.is_zero() {
            // Check if cancelled (fast exit path)
            if cancel_flag.load(Ordering::Acquire) {
                return;
            }
            let step = remaining.min(CANCEL_CHECK_INTERVAL);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }

        // Final check before sending timeout message
        if !cancel_flag.load(Ordering::Acquire) {
            let _ = state_tx.send(message).await;
        }
    });

    handle
}
