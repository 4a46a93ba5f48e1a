//! # Core Entities
//!
//! Identifiers and characteristic values for the Coordinated Set
//! Identification Service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::wire;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Transport connection identifier assigned by the GATT layer.
///
/// Zero is reserved: it marks an empty registry slot or "no owner".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ConnectionId(pub u32);

impl ConnectionId {
    /// The reserved "no connection" value.
    pub const NONE: Self = Self(0);

    /// Returns true for the reserved zero identifier.
    #[must_use]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Returns true for any assigned identifier.
    #[must_use]
    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Opaque handle identifying one CSIS service instance on the device.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ServiceHandle(pub u16);

impl ServiceHandle {
    /// The reserved "no service" value.
    pub const NONE: Self = Self(0);
}

impl fmt::Display for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "csis#{}", self.0)
    }
}

/// Bluetooth device address kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    /// Public (IEEE-assigned) address.
    Public,
    /// Random static or resolved identity address.
    Random,
}

/// Resolved, transport-independent identity of a peer.
///
/// The same physical client keeps the same `PeerAddress` across reconnections,
/// even when the transport assigns it a new [`ConnectionId`].
/// Bytes are stored most-significant first, the way addresses are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    /// Address kind.
    pub kind: AddressType,
    /// Address bytes, most-significant first.
    pub bytes: [u8; 6],
}

impl PeerAddress {
    /// Create a public identity address.
    #[must_use]
    pub fn public(bytes: [u8; 6]) -> Self {
        Self {
            kind: AddressType::Public,
            bytes,
        }
    }

    /// Create a random identity address.
    #[must_use]
    pub fn random(bytes: [u8; 6]) -> Self {
        Self {
            kind: AddressType::Random,
            bytes,
        }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )?;
        if self.kind == AddressType::Random {
            write!(f, " (random)")?;
        }
        Ok(())
    }
}

// =============================================================================
// CHARACTERISTIC VALUES
// =============================================================================

/// Set Member Lock characteristic value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockValue {
    /// No client holds the lock.
    #[default]
    Unlocked,
    /// A client (or the local application) holds the lock.
    Locked,
}

impl LockValue {
    /// Decode a single lock byte. Unknown values return `None`.
    #[must_use]
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            wire::LOCK_UNLOCKED => Some(Self::Unlocked),
            wire::LOCK_LOCKED => Some(Self::Locked),
            _ => None,
        }
    }

    /// Encode as the single lock byte.
    #[must_use]
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Unlocked => wire::LOCK_UNLOCKED,
            Self::Locked => wire::LOCK_LOCKED,
        }
    }
}

impl fmt::Display for LockValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlocked => write!(f, "unlocked"),
            Self::Locked => write!(f, "locked"),
        }
    }
}

/// How the SIRK may be handed out over GATT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingMode {
    /// SIRK is read and notified in plaintext.
    PlaintextOnly,
    /// SIRK is encrypted per peer before it leaves the device.
    #[default]
    EncryptedOnly,
    /// SIRK is only available out of band; GATT reads are refused.
    OobOnly,
}

/// Error parsing a [`SharingMode`] from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown sharing mode '{0}' (expected plaintext, encrypted or oob)")]
pub struct ParseSharingModeError(pub String);

impl FromStr for SharingMode {
    type Err = ParseSharingModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plaintext" | "plaintext_only" => Ok(Self::PlaintextOnly),
            "encrypted" | "encrypted_only" => Ok(Self::EncryptedOnly),
            "oob" | "oob_only" => Ok(Self::OobOnly),
            other => Err(ParseSharingModeError(other.to_string())),
        }
    }
}

/// The four CSIS characteristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Characteristic {
    /// Set Member Lock.
    Lock,
    /// Set Identity Resolving Key.
    Sirk,
    /// Coordinated Set Size.
    Size,
    /// Set Member Rank.
    Rank,
}

impl Characteristic {
    /// Characteristics carrying a Client Characteristic Configuration descriptor.
    pub const NOTIFIABLE: [Characteristic; 3] = [Self::Lock, Self::Sirk, Self::Size];

    /// Whether clients may subscribe to notifications for this characteristic.
    #[must_use]
    pub fn is_notifiable(self) -> bool {
        !matches!(self, Self::Rank)
    }

    /// Bluetooth SIG assigned 16-bit UUID.
    #[must_use]
    pub fn uuid(self) -> u16 {
        match self {
            Self::Sirk => wire::UUID_SIRK,
            Self::Size => wire::UUID_SIZE,
            Self::Lock => wire::UUID_LOCK,
            Self::Rank => wire::UUID_RANK,
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lock => "lock",
            Self::Sirk => "sirk",
            Self::Size => "size",
            Self::Rank => "rank",
        };
        f.write_str(name)
    }
}

/// An attribute of the CSIS service as resolved by the GATT dispatch layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// The primary service declaration.
    ServiceDeclaration,
    /// A characteristic value.
    Value(Characteristic),
    /// The CCC descriptor of a characteristic.
    ClientConfig(Characteristic),
}
