//! In-process port claims.
//!
//! The OS already refuses a second exclusive open on most platforms. This
//! registry makes the rule hold everywhere, and reports it with a clearer
//! message than the OS error.

use core_types::TransportError;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock, PoisonError};

fn claims() -> &'static Mutex<HashSet<String>> {
    static CLAIMS: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    CLAIMS.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive claim on a port name, released on drop.
#[derive(Debug)]
pub struct PortClaim {
    name: String,
}

impl PortClaim {
    pub fn acquire(name: &str) -> Result<Self, TransportError> {
        let mut claimed = claims().lock().unwrap_or_else(PoisonError::into_inner);
        if !claimed.insert(name.to_string()) {
            return Err(TransportError::ConnectionFailed(format!(
                "{} is already open in this process. Disconnect it first.",
                name
            )));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for PortClaim {
    fn drop(&mut self) {
        claims()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

/// True if some transport in this process currently holds `name`.
pub fn is_claimed(name: &str) -> bool {
    claims()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(name)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_fails_until_released() {
        let first = PortClaim::acquire("registry-test-port").unwrap();
        assert!(is_claimed("registry-test-port"));

        match PortClaim::acquire("registry-test-port") {
            Err(TransportError::ConnectionFailed(msg)) => assert!(msg.contains("already open")),
            other => panic!("Expected ConnectionFailed, got {:?}", other),
        }

        drop(first);
        assert!(!is_claimed("registry-test-port"));
        let again = PortClaim::acquire("registry-test-port").unwrap();
        assert_eq!(again.name(), "registry-test-port");
    }
}
