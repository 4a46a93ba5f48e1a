//! # SIRK Distribution
//!
//! Decides how the set key leaves the device and tracks the one encryption
//! that may be in flight at any time.
//!
//! | Sharing mode | Read | Change |
//! |--------------|------|--------|
//! | `PlaintextOnly` | immediate plaintext value | plaintext notification per subscriber |
//! | `EncryptedOnly` | deferred until encrypted for the reader | one encryption per subscriber, in table order |
//! | `OobOnly` | `OobSirkOnly` error | nothing |

use super::entities::{EncryptionPurpose, PendingEncryption, SetIdentity, Sirk};
use super::errors::CsisError;
use csis_types::{wire, ConnectionId, ServiceHandle, SharingMode};

/// SIRK characteristic value: type byte followed by the key, MSB first.
pub type SirkValue = [u8; wire::SIRK_VALUE_LEN];

/// How a SIRK read is answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SirkRead {
    /// Respond now with this value.
    Immediate(SirkValue),
    /// Encrypt for the reader and respond on completion.
    Deferred,
}

/// How subscribers learn about a changed SIRK.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SirkFanOut {
    /// Nobody is told.
    None,
    /// Same plaintext value to every subscriber.
    Plaintext(SirkValue),
    /// One encryption, then one notification, per subscriber.
    Encrypted,
}

/// Which identity fields a reconfiguration touches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdentityChanges {
    /// Key bytes differ.
    pub sirk: bool,
    /// Sharing mode differs.
    pub sharing_mode: bool,
    /// Set size differs.
    pub size: bool,
    /// Rank differs.
    pub rank: bool,
}

impl IdentityChanges {
    /// True if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.sirk || self.sharing_mode || self.size || self.rank)
    }
}

/// Owner of the set identity of one service instance.
#[derive(Debug, Clone)]
pub struct SirkDistributor {
    identity: SetIdentity,
    key_generation: u64,
}

impl SirkDistributor {
    /// Create a distributor for `identity`.
    #[must_use]
    pub fn new(identity: SetIdentity) -> Self {
        Self {
            identity,
            key_generation: 0,
        }
    }

    /// Current identity.
    #[must_use]
    pub fn identity(&self) -> &SetIdentity {
        &self.identity
    }

    /// Compare `new` against the current identity field by field.
    #[must_use]
    pub fn diff(&self, new: &SetIdentity) -> IdentityChanges {
        IdentityChanges {
            sirk: self.identity.sirk != new.sirk,
            sharing_mode: self.identity.sharing_mode != new.sharing_mode,
            size: self.identity.size != new.size,
            rank: self.identity.rank != new.rank,
        }
    }

    /// Replace the identity, returning what changed.
    ///
    /// A new key bumps the key generation.
    pub fn apply(&mut self, new: SetIdentity) -> IdentityChanges {
        let changes = self.diff(&new);
        if changes.sirk {
            self.key_generation += 1;
        }
        self.identity = new;
        changes
    }

    /// Counter of key changes, stamped on every encryption request.
    #[must_use]
    pub fn key_generation(&self) -> u64 {
        self.key_generation
    }

    /// Whether a ciphertext produced for `pending` may still go out as a
    /// change notification: the mode is still encrypted and the key has not
    /// moved on since the request.
    #[must_use]
    pub fn accepts_fan_out(&self, pending: &PendingEncryption) -> bool {
        self.fan_out() == SirkFanOut::Encrypted && pending.key_generation == self.key_generation
    }

    /// Decide how to answer a SIRK read.
    ///
    /// # Errors
    ///
    /// `OobSirkOnly` when the key is not shared over GATT.
    pub fn read(&self) -> Result<SirkRead, CsisError> {
        match self.identity.sharing_mode {
            SharingMode::PlaintextOnly => Ok(SirkRead::Immediate(self.plaintext_value())),
            SharingMode::EncryptedOnly => Ok(SirkRead::Deferred),
            SharingMode::OobOnly => Err(CsisError::OobSirkOnly),
        }
    }

    /// Decide how to announce a changed SIRK under the current mode.
    #[must_use]
    pub fn fan_out(&self) -> SirkFanOut {
        match self.identity.sharing_mode {
            SharingMode::PlaintextOnly => SirkFanOut::Plaintext(self.plaintext_value()),
            SharingMode::EncryptedOnly => SirkFanOut::Encrypted,
            SharingMode::OobOnly => SirkFanOut::None,
        }
    }

    /// Plaintext SIRK characteristic value.
    #[must_use]
    pub fn plaintext_value(&self) -> SirkValue {
        Self::value(wire::SIRK_TYPE_PLAINTEXT, &self.identity.sirk.to_be_bytes())
    }

    /// Block handed to the cipher when encrypting for a peer.
    #[must_use]
    pub fn encryption_input(&self) -> [u8; wire::SIRK_LEN] {
        self.identity.sirk.to_be_bytes()
    }

    /// Encrypted SIRK characteristic value for a ciphertext.
    #[must_use]
    pub fn encrypted_value(ciphertext: &[u8; wire::SIRK_LEN]) -> SirkValue {
        Self::value(wire::SIRK_TYPE_ENCRYPTED, ciphertext)
    }

    /// Current key.
    #[must_use]
    pub fn sirk(&self) -> &Sirk {
        &self.identity.sirk
    }

    fn value(kind: u8, key: &[u8; wire::SIRK_LEN]) -> SirkValue {
        let mut out = [0u8; wire::SIRK_VALUE_LEN];
        out[0] = kind;
        out[1..].copy_from_slice(key);
        out
    }
}

/// Single-slot record of the encryption in flight.
///
/// Shared by every service instance: the crypto engine has no queue, so a
/// second request while one is outstanding is refused.
#[derive(Debug, Default)]
pub struct EncryptionSlot {
    pending: Option<PendingEncryption>,
}

impl EncryptionSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if an encryption is outstanding.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// The outstanding encryption.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingEncryption> {
        self.pending.as_ref()
    }

    /// Claim the slot.
    ///
    /// # Errors
    ///
    /// `EncryptionBusy` if another encryption is outstanding.
    pub fn begin(&mut self, pending: PendingEncryption) -> Result<(), CsisError> {
        if self.pending.is_some() {
            return Err(CsisError::EncryptionBusy);
        }
        self.pending = Some(pending);
        Ok(())
    }

    /// Release the slot without consuming a completion.
    pub fn clear(&mut self) -> Option<PendingEncryption> {
        self.pending.take()
    }

    /// Consume the outstanding encryption if the completion belongs to it.
    pub fn take_matching(
        &mut self,
        service: ServiceHandle,
        connection: ConnectionId,
    ) -> Option<PendingEncryption> {
        match self.pending {
            Some(p) if p.service == service && p.connection == connection => self.pending.take(),
            _ => None,
        }
    }

    /// Keep the slot consistent with a client leaving `service`'s registry
    /// from table index `index`.
    ///
    /// A deferred read for the departed client is dropped. A fan-out cursor
    /// past the removed index moves down with the compacted table.
    pub fn on_client_removed(
        &mut self,
        service: ServiceHandle,
        connection: ConnectionId,
        index: usize,
    ) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        if pending.service != service {
            return;
        }
        let reader_left = match &mut pending.purpose {
            EncryptionPurpose::RespondToRead => pending.connection == connection,
            EncryptionPurpose::NotifyAfterChange { cursor } => {
                if index < *cursor {
                    *cursor -= 1;
                }
                false
            }
        };
        if reader_left {
            self.pending = None;
        }
    }
}
