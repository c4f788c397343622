//! Centralized configuration constants for connection actors
//!
//! All timing values for the reader thread, port lifecycle and state query
//! supervision are defined here with the reasoning behind them.
//!
//! **Before changing any constant:**
//! 1. Read its full documentation comment
//! 2. Understand the firmware/protocol basis for the value
//! 3. Test against the real board, not only the simulated one
//! 4. Update documentation with your findings

/// Reader thread timing
pub mod reader {
    /// Interval between two polls of the transport (milliseconds)
    ///
    /// **Value**: 10ms
    ///
    /// **Rationale**: The board talks at 9600 baud, roughly one byte per
    /// millisecond. Polling every 10ms keeps at most ~10 bytes queued in the
    /// OS buffer, far below any driver limit, while keeping the thread idle
    /// most of the time.
    ///
    /// This is also the upper bound on how long a disconnect waits for the
    /// reader to notice its stop flag.
    ///
    /// **Used in**: reader_loop.rs, system.rs
    pub const POLL_INTERVAL_MS: u64 = 10;

    /// Blocking read timeout handed to the serial port (milliseconds)
    ///
    /// **Value**: 10ms
    ///
    /// **Rationale**: A read with nothing buffered blocks for this long. It
    /// must not exceed the poll interval, otherwise a stop request would be
    /// seen one read timeout late instead of one poll late.
    ///
    /// **Used in**: state_actor.rs (SerialConfig for Open)
    pub const READ_TIMEOUT_MS: u64 = 10;

    /// Timeout for reader thread exit acknowledgment (milliseconds)
    ///
    /// **Value**: 500ms
    ///
    /// **Rationale**: The reader exits within one poll plus one read timeout
    /// (~20ms). It can take longer only when it is blocked handing a decoded
    /// event to a full StateActor mailbox. 500ms is a warning threshold, not a
    /// hard limit: the port is closed anyway, which unblocks the thread.
    ///
    /// **Used in**: connection.rs
    pub const CLEANUP_TIMEOUT_MS: u64 = 500;
}

/// State query supervision
pub mod query {
    /// Base delay of the query retry backoff (milliseconds)
    ///
    /// **Value**: 100ms
    ///
    /// **Rationale**: The board answers `s` within a few milliseconds when it
    /// answers at all. Retry n waits 100ms * 2^(n-1) on top of the response
    /// window, so three retries stay under two seconds.
    ///
    /// **Used in**: backoff.rs
    pub const RETRY_BASE_DELAY_MS: u64 = 100;

    /// Maximum exponent of the backoff multiplier
    ///
    /// **Value**: 30
    ///
    /// **Rationale**: Keeps `1 << shift` inside u64 for any attempt number.
    ///
    /// **Used in**: backoff.rs
    pub const MAX_BACKOFF_SHIFT: u32 = 30;
}
