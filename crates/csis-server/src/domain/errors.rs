//! # Error Types
//!
//! Every error a peer can trigger maps onto exactly one ATT status through
//! [`CsisError::att_status`].

use super::config::ConfigError;
use csis_crypto::CryptoError;
use csis_types::{AttStatus, ConnectionId};
use thiserror::Error;

/// Errors raised by the CSIS server core.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CsisError {
    // =========================================================================
    // Protocol errors (reported to the offending client only)
    // =========================================================================
    /// Written value has the wrong length.
    #[error("Invalid value length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required length in bytes
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Written lock byte is neither locked nor unlocked.
    #[error("Invalid lock value: 0x{0:02x}")]
    InvalidLockValue(u8),

    /// Another client holds the lock.
    #[error("Lock denied: held by another client")]
    LockDenied,

    /// Release attempted by a client that does not hold the lock.
    #[error("Lock release not allowed")]
    LockReleaseNotAllowed,

    /// The requester already holds the lock.
    #[error("Lock already granted")]
    LockAlreadyGranted,

    /// SIRK is only shared out of band.
    #[error("SIRK is available out of band only")]
    OobSirkOnly,

    /// CCC write tried to enable indications.
    #[error("CCC improperly configured")]
    CccImproperlyConfigured,

    /// Attribute cannot be written.
    #[error("Write not permitted")]
    WriteNotPermitted,

    /// Request not supported on this attribute.
    #[error("Request not supported")]
    RequestNotSupported,

    /// Attribute does not exist in this service.
    #[error("Invalid attribute handle")]
    InvalidHandle,

    // =========================================================================
    // Resource errors (transient, retry later)
    // =========================================================================
    /// No free slot in the client registry.
    #[error("Client registry full ({capacity} clients)")]
    RegistryFull {
        /// Registry capacity
        capacity: usize,
    },

    /// An encryption is already in flight.
    #[error("Encryption engine busy")]
    EncryptionBusy,

    /// No link key is known for the peer, so the SIRK cannot be encrypted for it.
    #[error("No link key for connection {0}")]
    NoLinkKey(ConnectionId),

    /// The connection is not in the client registry.
    #[error("Unknown connection {0}")]
    UnknownConnection(ConnectionId),

    // =========================================================================
    // Application errors
    // =========================================================================
    /// Reconfiguration asked for an invalid set size or rank.
    #[error("Invalid set identity: {0}")]
    InvalidIdentity(#[from] ConfigError),

    // =========================================================================
    // Collaborator failures
    // =========================================================================
    /// The crypto gateway refused or failed the request.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The GATT transport could not deliver a PDU.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl CsisError {
    /// ATT status reported to the peer for this error.
    #[must_use]
    pub fn att_status(&self) -> AttStatus {
        match self {
            Self::InvalidLength { .. } => AttStatus::InvalidAttributeValueLength,
            Self::InvalidLockValue(_) => AttStatus::InvalidLockValue,
            Self::LockDenied => AttStatus::LockDenied,
            Self::LockReleaseNotAllowed => AttStatus::LockReleaseNotAllowed,
            Self::LockAlreadyGranted => AttStatus::LockAlreadyGranted,
            Self::OobSirkOnly => AttStatus::OobSirkOnly,
            Self::CccImproperlyConfigured => AttStatus::CccImproperlyConfigured,
            Self::WriteNotPermitted => AttStatus::WriteNotPermitted,
            Self::RequestNotSupported => AttStatus::RequestNotSupported,
            Self::InvalidHandle => AttStatus::InvalidHandle,
            Self::RegistryFull { .. } | Self::EncryptionBusy => AttStatus::InsufficientResources,
            Self::NoLinkKey(_) => AttStatus::InsufficientEncryption,
            Self::UnknownConnection(_)
            | Self::InvalidIdentity(_)
            | Self::Crypto(_)
            | Self::Transport(_) => AttStatus::UnlikelyError,
        }
    }

    /// Whether retrying later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RegistryFull { .. } | Self::EncryptionBusy | Self::Crypto(CryptoError::EngineBusy)
        )
    }
}
