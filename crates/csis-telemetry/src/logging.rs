//! Structured log macros with consistent field names.
//!
//! Every record carries `service` (the CSIS instance handle) so log lines from
//! several instances on one device can be told apart.

/// Log a lock-related event with standard fields.
///
/// ```rust,ignore
/// log_lock_event!(info, service, "Lock granted", connection, value = %LockValue::Locked);
/// ```
#[macro_export]
macro_rules! log_lock_event {
    ($level:ident, $service:expr, $msg:expr, $connection:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            service = %$service,
            connection = %$connection,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a peer-related event with standard fields.
#[macro_export]
macro_rules! log_peer_event {
    ($level:ident, $service:expr, $msg:expr, $connection:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            service = %$service,
            peer = %$connection,
            $($($field)*,)?
            $msg
        )
    };
}
