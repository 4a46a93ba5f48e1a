//! # Domain Entities
//!
//! State owned by the lock manager, the SIRK distributor and the client
//! registry.

use csis_crypto::random_array;
use csis_types::{
    wire, Characteristic, ConnectionId, LockValue, PeerAddress, ServiceHandle, SharingMode,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

// =============================================================================
// SET IDENTITY
// =============================================================================

/// Set Identity Resolving Key.
///
/// Held least-significant byte first, the order the controller uses for key
/// material. GATT and the `sih` function see it most-significant byte first;
/// use [`Sirk::to_be_bytes`] at those boundaries.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct Sirk([u8; wire::SIRK_LEN]);

impl Sirk {
    /// Wrap key bytes given least-significant byte first.
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; wire::SIRK_LEN]) -> Self {
        Self(bytes)
    }

    /// Wrap key bytes given most-significant byte first (as printed and as
    /// carried on the wire).
    #[must_use]
    pub fn from_be_bytes(mut bytes: [u8; wire::SIRK_LEN]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    /// Draw a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_array())
    }

    /// Stored (least-significant first) representation.
    #[must_use]
    pub fn as_le_bytes(&self) -> &[u8; wire::SIRK_LEN] {
        &self.0
    }

    /// Most-significant first representation.
    #[must_use]
    pub fn to_be_bytes(&self) -> [u8; wire::SIRK_LEN] {
        let mut out = self.0;
        out.reverse();
        out
    }
}

impl fmt::Debug for Sirk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sirk(..)")
    }
}

/// Everything a set member advertises about its set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetIdentity {
    /// The set key.
    pub sirk: Sirk,
    /// How the key may be handed out over GATT.
    pub sharing_mode: SharingMode,
    /// Number of members in the set.
    pub size: u8,
    /// This member's rank within the set.
    pub rank: u8,
}

impl SetIdentity {
    /// Create an identity from its parts.
    #[must_use]
    pub fn new(sirk: Sirk, sharing_mode: SharingMode, size: u8, rank: u8) -> Self {
        Self {
            sirk,
            sharing_mode,
            size,
            rank,
        }
    }

    /// Create an identity with a freshly generated SIRK.
    #[must_use]
    pub fn generate(sharing_mode: SharingMode, size: u8, rank: u8) -> Self {
        Self::new(Sirk::generate(), sharing_mode, size, rank)
    }
}

// =============================================================================
// LOCK
// =============================================================================

/// Identifier of one armed lease.
///
/// Every arm gets a new id so an expiry can be matched against the lease that
/// is currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeaseId(pub u64);

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lease#{}", self.0)
    }
}

/// The set member lock, shared by every service instance on the device.
///
/// Invariant: `owner_connection.is_some()` implies `value == Locked`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockState {
    /// Current lock value.
    pub value: LockValue,
    /// Lease length applied when a client takes the lock. Zero disables the lease.
    pub timeout_secs: u16,
    /// Service instance that granted the lock.
    pub owner_service: ServiceHandle,
    /// Connection of the remote owner.
    pub owner_connection: ConnectionId,
    /// Resolved identity of the remote owner.
    pub owner_identity: Option<PeerAddress>,
}

impl LockState {
    /// Lock value in its single-byte wire form.
    #[must_use]
    pub fn wire_value(&self) -> [u8; wire::LOCK_LEN] {
        [self.value.to_wire()]
    }

    pub(crate) fn clear_owner(&mut self) {
        self.owner_service = ServiceHandle::NONE;
        self.owner_connection = ConnectionId::NONE;
        self.owner_identity = None;
    }
}

// =============================================================================
// CLIENTS
// =============================================================================

/// Per-client state of one Client Characteristic Configuration descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CccState {
    /// The client never wrote this descriptor.
    #[default]
    Unwritten,
    /// The client wrote "disabled".
    Disabled,
    /// The client enabled notifications.
    Notify,
}

impl CccState {
    /// Descriptor value as read back by the client.
    #[must_use]
    pub fn to_wire(self) -> [u8; wire::CCC_LEN] {
        let value = match self {
            Self::Unwritten | Self::Disabled => u16::from(wire::CCC_DISABLED),
            Self::Notify => u16::from(wire::CCC_NOTIFY),
        };
        value.to_le_bytes()
    }

    /// Whether notifications are enabled.
    #[must_use]
    pub fn is_notify(self) -> bool {
        self == Self::Notify
    }

    /// Whether the client ever wrote this descriptor.
    #[must_use]
    pub fn is_written(self) -> bool {
        self != Self::Unwritten
    }
}

/// Subscription state a bonded client carries across connections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Set Member Lock CCC.
    pub lock: CccState,
    /// SIRK CCC.
    pub sirk: CccState,
    /// Set Size CCC.
    pub size: CccState,
}

impl ClientConfig {
    /// CCC state for a notifiable characteristic. Rank has none.
    #[must_use]
    pub fn get(&self, characteristic: Characteristic) -> Option<CccState> {
        match characteristic {
            Characteristic::Lock => Some(self.lock),
            Characteristic::Sirk => Some(self.sirk),
            Characteristic::Size => Some(self.size),
            Characteristic::Rank => None,
        }
    }

    pub(crate) fn slot_mut(&mut self, characteristic: Characteristic) -> Option<&mut CccState> {
        match characteristic {
            Characteristic::Lock => Some(&mut self.lock),
            Characteristic::Sirk => Some(&mut self.sirk),
            Characteristic::Size => Some(&mut self.size),
            Characteristic::Rank => None,
        }
    }

    /// True once the client has written all three descriptors.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lock.is_written() && self.sirk.is_written() && self.size.is_written()
    }
}

/// One connected client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientEntry {
    /// Transport connection.
    pub connection: ConnectionId,
    /// Notification configuration.
    pub config: ClientConfig,
}

impl ClientEntry {
    /// Whether this client wants notifications for `characteristic`.
    #[must_use]
    pub fn is_subscribed(&self, characteristic: Characteristic) -> bool {
        self.config
            .get(characteristic)
            .is_some_and(CccState::is_notify)
    }
}

// =============================================================================
// ENCRYPTION
// =============================================================================

/// Why an encryption was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionPurpose {
    /// Answer a deferred SIRK read from the target connection.
    RespondToRead,
    /// Notify subscribers of a changed SIRK, one client at a time.
    ///
    /// `cursor` is the registry index at which the search for the next
    /// subscriber resumes.
    NotifyAfterChange {
        /// Next registry index to consider.
        cursor: usize,
    },
}

/// The single encryption in flight on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingEncryption {
    /// Service instance that started the operation.
    pub service: ServiceHandle,
    /// Peer the ciphertext is for.
    pub connection: ConnectionId,
    /// What to do with the result.
    pub purpose: EncryptionPurpose,
    /// Key generation the plaintext was taken from.
    pub key_generation: u64,
}
