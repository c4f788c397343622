use crate::constants::query::{MAX_BACKOFF_SHIFT, RETRY_BASE_DELAY_MS};

/// Calculates the retry delay in milliseconds for a given attempt number.
///
/// Uses exponential backoff:
/// - Base delay: 100ms
/// - Multiplier: 2^(attempt - 1)
///
/// # Arguments
/// * `attempt` - The current retry attempt number (1-based)
///
/// # Returns
/// Delay in milliseconds
pub fn calculate_retry_delay(attempt: u32) -> u64 {
    calculate_retry_delay_with_base(RETRY_BASE_DELAY_MS, attempt)
}

/// Same as [`calculate_retry_delay`] with a caller-provided base delay.
pub fn calculate_retry_delay_with_base(base_ms: u64, attempt: u32) -> u64 {
    if attempt == 0 {
        return 0;
    }
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    base_ms.saturating_mul(1u64 << shift)
}
