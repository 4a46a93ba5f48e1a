//! # Set Member Lock
//!
//! Arbitration of the single lock shared by every CSIS instance on the device.
//!
//! ## Decision Table
//!
//! | State | Requester vs owner | Requested | Outcome | Effect |
//! |-------|--------------------|-----------|---------|--------|
//! | Unlocked | - | Locked | Granted | acquire, arm lease |
//! | Unlocked | - | Unlocked | Granted | none |
//! | Locked | same connection | Locked | AlreadyGranted | none |
//! | Locked | same connection | Unlocked | Granted | release, cancel lease |
//! | Locked | same identity, new connection | Locked | AlreadyGranted | owner connection updated, lease kept |
//! | Locked | same identity, new connection | Unlocked | Granted | release, cancel lease |
//! | Locked | different peer | Locked | Denied | none |
//! | Locked | different peer | Unlocked | ReleaseNotAllowed | none |
//! | any | - | malformed | Invalid | none |
//!
//! The manager never touches a timer itself. Every mutating call returns a
//! [`LeaseChange`] which the caller applies before doing anything else, so a
//! released lease is always cancelled in the same step that released it.

use super::entities::{LeaseId, LockState};
use super::errors::CsisError;
use csis_types::{wire, ConnectionId, LockValue, PeerAddress, ServiceHandle};
use std::time::Duration;

/// Result of evaluating a remote lock write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockOutcome {
    /// The write is accepted.
    Granted,
    /// The requester already holds the lock.
    AlreadyGranted,
    /// Another peer holds the lock.
    Denied,
    /// Another peer holds the lock and the requester tried to release it.
    ReleaseNotAllowed,
    /// The written value is malformed.
    Invalid(CsisError),
}

impl LockOutcome {
    /// Convert to the response the requester receives.
    pub fn into_result(self) -> Result<(), CsisError> {
        match self {
            Self::Granted => Ok(()),
            Self::AlreadyGranted => Err(CsisError::LockAlreadyGranted),
            Self::Denied => Err(CsisError::LockDenied),
            Self::ReleaseNotAllowed => Err(CsisError::LockReleaseNotAllowed),
            Self::Invalid(err) => Err(err),
        }
    }
}

/// State change implied by an accepted write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockEffect {
    /// Nothing changes.
    None,
    /// Requester becomes the owner.
    Acquire,
    /// Lock returns to unlocked.
    Release,
    /// Same peer reconnected: only the owner connection moves.
    UpdateOwnerConnection,
}

impl LockEffect {
    /// Whether the effect changes the notifiable lock value.
    #[must_use]
    pub fn changes_value(self) -> bool {
        matches!(self, Self::Acquire | Self::Release)
    }
}

/// Outcome and effect of a remote write, computed without mutating state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockDecision {
    /// What the requester is told.
    pub outcome: LockOutcome,
    /// What happens to the lock.
    pub effect: LockEffect,
}

impl LockDecision {
    fn new(outcome: LockOutcome, effect: LockEffect) -> Self {
        Self { outcome, effect }
    }

    fn invalid(err: CsisError) -> Self {
        Self::new(LockOutcome::Invalid(err), LockEffect::None)
    }
}

/// Timer work the caller must carry out, cancel first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LeaseChange {
    /// Lease to cancel.
    pub cancel: Option<LeaseId>,
    /// Lease to arm and its duration.
    pub arm: Option<(LeaseId, Duration)>,
}

impl LeaseChange {
    /// True if no timer work is needed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cancel.is_none() && self.arm.is_none()
    }
}

/// What a lease expiry did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaseExpiry {
    /// Service instance that owned the lock.
    pub service: ServiceHandle,
    /// Remote owner at the time of expiry (`NONE` for an application lock).
    pub previous_owner: ConnectionId,
}

/// Owner of the lock state and its lease bookkeeping.
#[derive(Debug)]
pub struct LockManager {
    state: LockState,
    lease: Option<LeaseId>,
    next_lease: u64,
}

impl LockManager {
    /// Create an unlocked manager with the given lease length.
    #[must_use]
    pub fn new(timeout_secs: u16) -> Self {
        Self {
            state: LockState {
                timeout_secs,
                ..LockState::default()
            },
            lease: None,
            next_lease: 0,
        }
    }

    /// Current lock state.
    #[must_use]
    pub fn state(&self) -> &LockState {
        &self.state
    }

    /// Current lock value.
    #[must_use]
    pub fn value(&self) -> LockValue {
        self.state.value
    }

    /// Lease currently running, if any.
    #[must_use]
    pub fn active_lease(&self) -> Option<LeaseId> {
        self.lease
    }

    /// Evaluate a remote write of `raw` against the current state.
    #[must_use]
    pub fn evaluate_write(
        &self,
        connection: ConnectionId,
        identity: Option<PeerAddress>,
        raw: &[u8],
    ) -> LockDecision {
        let requested = match raw {
            [byte] => match LockValue::from_wire(*byte) {
                Some(value) => value,
                None => return LockDecision::invalid(CsisError::InvalidLockValue(*byte)),
            },
            _ => {
                return LockDecision::invalid(CsisError::InvalidLength {
                    expected: wire::LOCK_LEN,
                    actual: raw.len(),
                })
            }
        };

        if self.state.value == LockValue::Unlocked {
            return match requested {
                LockValue::Locked => LockDecision::new(LockOutcome::Granted, LockEffect::Acquire),
                LockValue::Unlocked => LockDecision::new(LockOutcome::Granted, LockEffect::None),
            };
        }

        let same_connection =
            connection.is_some() && connection == self.state.owner_connection;
        let same_identity = identity.is_some() && identity == self.state.owner_identity;

        match (same_connection, same_identity, requested) {
            (true, _, LockValue::Locked) => {
                LockDecision::new(LockOutcome::AlreadyGranted, LockEffect::None)
            }
            (true, _, LockValue::Unlocked) | (false, true, LockValue::Unlocked) => {
                LockDecision::new(LockOutcome::Granted, LockEffect::Release)
            }
            (false, true, LockValue::Locked) => LockDecision::new(
                LockOutcome::AlreadyGranted,
                LockEffect::UpdateOwnerConnection,
            ),
            (false, false, LockValue::Locked) => {
                LockDecision::new(LockOutcome::Denied, LockEffect::None)
            }
            (false, false, LockValue::Unlocked) => {
                LockDecision::new(LockOutcome::ReleaseNotAllowed, LockEffect::None)
            }
        }
    }

    /// Apply the effect of an evaluated write.
    pub fn apply(
        &mut self,
        service: ServiceHandle,
        connection: ConnectionId,
        identity: Option<PeerAddress>,
        effect: LockEffect,
    ) -> LeaseChange {
        match effect {
            LockEffect::None => LeaseChange::default(),
            LockEffect::Acquire => {
                self.state.value = LockValue::Locked;
                self.state.owner_service = service;
                self.state.owner_connection = connection;
                self.state.owner_identity = identity;
                LeaseChange {
                    cancel: self.lease.take(),
                    arm: self.arm_lease(),
                }
            }
            LockEffect::Release => {
                self.state.value = LockValue::Unlocked;
                self.state.clear_owner();
                LeaseChange {
                    cancel: self.lease.take(),
                    arm: None,
                }
            }
            LockEffect::UpdateOwnerConnection => {
                self.state.owner_service = service;
                self.state.owner_connection = connection;
                LeaseChange::default()
            }
        }
    }

    /// Evaluate and apply a remote write in one step.
    pub fn write(
        &mut self,
        service: ServiceHandle,
        connection: ConnectionId,
        identity: Option<PeerAddress>,
        raw: &[u8],
    ) -> (LockDecision, LeaseChange) {
        let decision = self.evaluate_write(connection, identity, raw);
        let change = self.apply(service, connection, identity, decision.effect);
        (decision, change)
    }

    /// Handle a lease timer firing.
    ///
    /// Returns `None` for a lease that is no longer the running one.
    pub fn expire(&mut self, lease: LeaseId) -> Option<LeaseExpiry> {
        if self.lease != Some(lease) {
            return None;
        }
        self.lease = None;

        if self.state.value == LockValue::Unlocked {
            return None;
        }

        let expiry = LeaseExpiry {
            service: self.state.owner_service,
            previous_owner: self.state.owner_connection,
        };
        self.state.value = LockValue::Unlocked;
        self.state.clear_owner();
        Some(expiry)
    }

    /// Force the lock value from the local application.
    ///
    /// Always succeeds and drops any remote owner. `timeout_secs` becomes the
    /// lease length for this and later acquisitions; zero means no lease.
    /// The returned flag is true if the lock value changed.
    pub fn override_value(
        &mut self,
        service: ServiceHandle,
        value: LockValue,
        timeout_secs: u16,
    ) -> (LeaseChange, bool) {
        let changed = self.state.value != value;
        let cancel = self.lease.take();

        self.state.clear_owner();
        self.state.value = value;
        self.state.timeout_secs = timeout_secs;

        let arm = if value == LockValue::Locked {
            self.state.owner_service = service;
            self.arm_lease()
        } else {
            None
        };

        (LeaseChange { cancel, arm }, changed)
    }

    fn arm_lease(&mut self) -> Option<(LeaseId, Duration)> {
        if self.state.timeout_secs == 0 {
            return None;
        }
        self.next_lease += 1;
        let lease = LeaseId(self.next_lease);
        self.lease = Some(lease);
        Some((lease, Duration::from_secs(u64::from(self.state.timeout_secs))))
    }
}
