//! Counters for lock arbitration, notification delivery and SIRK encryption.
//!
//! ## Usage
//!
//! ```ignore
//! use csis_server::metrics::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.record_notification(true);
//! assert_eq!(metrics.snapshot().notifications_sent, 1);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for one service instance
#[derive(Debug, Default)]
pub struct Metrics {
    /// Remote lock acquisitions
    pub locks_granted: AtomicU64,
    /// Remote lock releases
    pub locks_released: AtomicU64,
    /// Denied lock writes (denied, release not allowed)
    pub locks_denied: AtomicU64,
    /// Malformed lock writes
    pub lock_writes_invalid: AtomicU64,
    /// Leases that ran out
    pub leases_expired: AtomicU64,
    /// Notifications handed to the transport
    pub notifications_sent: AtomicU64,
    /// Notifications the transport refused
    pub notifications_failed: AtomicU64,
    /// Encryptions submitted to the crypto gateway
    pub encryptions_requested: AtomicU64,
    /// Encryptions that failed, at submission or completion
    pub encryptions_failed: AtomicU64,
    /// Requests refused because an encryption was in flight
    pub encryptions_busy: AtomicU64,
    /// Connections refused because the registry was full
    pub clients_rejected: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lock write that acquired the lock
    pub fn record_lock_granted(&self) {
        self.locks_granted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lock write that released the lock
    pub fn record_lock_released(&self) {
        self.locks_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lock write refused because another peer holds the lock
    pub fn record_lock_denied(&self) {
        self.locks_denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed lock write
    pub fn record_lock_invalid(&self) {
        self.lock_writes_invalid.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lease expiry
    pub fn record_lease_expired(&self) {
        self.leases_expired.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a notification attempt
    pub fn record_notification(&self, delivered: bool) {
        if delivered {
            self.notifications_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.notifications_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an encryption submitted to the gateway
    pub fn record_encryption_requested(&self) {
        self.encryptions_requested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed encryption
    pub fn record_encryption_failed(&self) {
        self.encryptions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a busy rejection
    pub fn record_encryption_busy(&self) {
        self.encryptions_busy.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refused connection
    pub fn record_client_rejected(&self) {
        self.clients_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            locks_granted: self.locks_granted.load(Ordering::Relaxed),
            locks_released: self.locks_released.load(Ordering::Relaxed),
            locks_denied: self.locks_denied.load(Ordering::Relaxed),
            lock_writes_invalid: self.lock_writes_invalid.load(Ordering::Relaxed),
            leases_expired: self.leases_expired.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            encryptions_requested: self.encryptions_requested.load(Ordering::Relaxed),
            encryptions_failed: self.encryptions_failed.load(Ordering::Relaxed),
            encryptions_busy: self.encryptions_busy.load(Ordering::Relaxed),
            clients_rejected: self.clients_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Metrics`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub locks_granted: u64,
    pub locks_released: u64,
    pub locks_denied: u64,
    pub lock_writes_invalid: u64,
    pub leases_expired: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub encryptions_requested: u64,
    pub encryptions_failed: u64,
    pub encryptions_busy: u64,
    pub clients_rejected: u64,
}
