/// Centralized logging macros for actor system
///
/// Thin wrappers over the `log` facade that tag every record with the
/// `actor` target, so actor chatter can be filtered with
/// `RUST_LOG=actor=debug` independently of the rest of the process.
///
/// Log debug-level message
///
/// # Example
/// ```
/// use actor_runtime::actor_debug;
/// actor_debug!("StateActor: {:?} → {:?}", "Disconnected", "Connected");
/// ```
#[macro_export]
macro_rules! actor_debug {
    ($($arg:tt)*) => {
        $crate::__log::debug!(target: "actor", $($arg)*)
    };
}

/// Log info-level message
///
/// Use for important state changes and user-facing events
#[macro_export]
macro_rules! actor_info {
    ($($arg:tt)*) => {
        $crate::__log::info!(target: "actor", $($arg)*)
    };
}

/// Log warning-level message
///
/// Use for recoverable errors and unexpected conditions
#[macro_export]
macro_rules! actor_warn {
    ($($arg:tt)*) => {
        $crate::__log::warn!(target: "actor", $($arg)*)
    };
}

/// Log error-level message
#[macro_export]
macro_rules! actor_error {
    ($($arg:tt)*) => {
        $crate::__log::error!(target: "actor", $($arg)*)
    };
}
