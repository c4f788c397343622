//! Splits the board's mixed byte stream into decodable units.
//!
//! The board interleaves bare command characters (`r`, `P`, `3`, ...) with
//! terminated report lines (`MODE:2\r\n`). A [`Framer`] turns raw chunks read
//! from the transport into [`Frame`]s of one of those two shapes.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

use core_types::Frame;

pub mod report;

pub use report::ReportFramer;

/// Trait for converting a stream of bytes into discrete Frames.
pub trait Framer: Send {
    /// Ingest new bytes and return any complete frames found.
    ///
    /// # Arguments
    /// * `bytes` - The new chunk of data read from transport.
    /// * `timestamp_us` - The timestamp associated with this chunk.
    fn push(&mut self, bytes: &[u8], timestamp_us: u64) -> Vec<Frame>;

    /// Called when a poll returned no data. Releases bytes held back only
    /// because they might have started a line.
    fn flush_idle(&mut self, timestamp_us: u64) -> Vec<Frame>;

    /// Reset internal state (e.g., clear buffers).
    fn reset(&mut self);

    /// Get the name of the framer.
    fn name(&self) -> &'static str;
}
