//! # Device-Wide Set Context
//!
//! State shared by every CSIS instance on the device: the set member lock and
//! the single encryption slot. Build one per device and hand clones of the
//! [`SharedSetContext`] to each service instance.

use crate::domain::{
    EncryptionSlot, LeaseChange, LeaseExpiry, LeaseId, LockDecision, LockManager, LockState,
};
use crate::ports::LeaseTimer;
use csis_types::{ConnectionId, LockValue, PeerAddress, ServiceHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Handle passed to each service instance.
pub type SharedSetContext = Arc<Mutex<SetContext>>;

/// Lock, lease timer and encryption slot.
pub struct SetContext {
    lock: LockManager,
    encryption: EncryptionSlot,
    timer: Arc<dyn LeaseTimer>,
}

impl SetContext {
    /// Create an unlocked context.
    pub fn new(lock_timeout_secs: u16, timer: Arc<dyn LeaseTimer>) -> Self {
        Self {
            lock: LockManager::new(lock_timeout_secs),
            encryption: EncryptionSlot::new(),
            timer,
        }
    }

    /// Wrap for sharing between service instances.
    pub fn into_shared(self) -> SharedSetContext {
        Arc::new(Mutex::new(self))
    }

    /// The lock manager.
    pub fn lock_manager(&self) -> &LockManager {
        &self.lock
    }

    /// Current lock state.
    pub fn lock_state(&self) -> &LockState {
        self.lock.state()
    }

    /// Evaluate and apply a remote lock write, updating the lease timer.
    pub fn write_lock(
        &mut self,
        service: ServiceHandle,
        connection: ConnectionId,
        identity: Option<PeerAddress>,
        raw: &[u8],
    ) -> LockDecision {
        let (decision, change) = self.lock.write(service, connection, identity, raw);
        self.apply_lease(change);
        decision
    }

    /// Handle a fired lease. `None` for a stale lease.
    pub fn expire_lease(&mut self, lease: LeaseId) -> Option<LeaseExpiry> {
        self.lock.expire(lease)
    }

    /// Force the lock value. Returns true if it changed.
    pub fn override_lock(
        &mut self,
        service: ServiceHandle,
        value: LockValue,
        timeout_secs: u16,
    ) -> bool {
        let (change, changed) = self.lock.override_value(service, value, timeout_secs);
        self.apply_lease(change);
        changed
    }

    /// The encryption slot.
    pub fn encryption(&self) -> &EncryptionSlot {
        &self.encryption
    }

    /// The encryption slot, mutably.
    pub fn encryption_mut(&mut self) -> &mut EncryptionSlot {
        &mut self.encryption
    }

    fn apply_lease(&self, change: LeaseChange) {
        if let Some(lease) = change.cancel {
            debug!(%lease, "Lease cancelled");
            self.timer.cancel(lease);
        }
        if let Some((lease, duration)) = change.arm {
            debug!(%lease, secs = duration.as_secs(), "Lease armed");
            self.timer.arm(lease, duration);
        }
    }
}
