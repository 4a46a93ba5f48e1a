//! # ATT Status Codes
//!
//! Result codes carried by read and write responses. The low range is the
//! ATT protocol error space; `0x80..=0x84` are the CSIS application errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an attribute read or write response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AttStatus {
    /// Request succeeded.
    Success = 0x00,
    /// The attribute handle is not part of this service.
    InvalidHandle = 0x01,
    /// The attribute cannot be written.
    WriteNotPermitted = 0x03,
    /// The request is not supported on this attribute.
    RequestNotSupported = 0x06,
    /// The value length is wrong for this attribute.
    InvalidAttributeValueLength = 0x0D,
    /// The request failed for a reason that is not otherwise specified.
    UnlikelyError = 0x0E,
    /// The link is not encrypted with a key usable for this request.
    InsufficientEncryption = 0x0F,
    /// The server has run out of a resource needed to serve the request.
    InsufficientResources = 0x11,
    /// Lock requested while another client holds it.
    LockDenied = 0x80,
    /// Release requested by a client that does not hold the lock.
    LockReleaseNotAllowed = 0x81,
    /// The written lock value is not a defined lock value.
    InvalidLockValue = 0x82,
    /// The SIRK is only shared out of band.
    OobSirkOnly = 0x83,
    /// The requesting client already holds the lock.
    LockAlreadyGranted = 0x84,
    /// The CCC value written is not permitted for this characteristic.
    CccImproperlyConfigured = 0xFD,
}

impl AttStatus {
    /// Numeric code sent on the wire.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether this status reports success.
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for AttStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02x})", self, self.code())
    }
}
