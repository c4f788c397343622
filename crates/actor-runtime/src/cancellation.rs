//! Cooperative cancellation for blocking workers
//!
//! The serial reader runs on its own OS thread and cannot be interrupted
//! mid-read. It checks a [`StopFlag`] once per poll instead, so raising the
//! flag stops it within one poll interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared one-way stop signal. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    raised: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder to stop. Idempotent.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
