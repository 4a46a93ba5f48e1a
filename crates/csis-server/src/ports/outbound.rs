//! Outbound (Driven) ports for the CSIS server.
//!
//! These traits define the collaborators the service drives: the GATT
//! transport, the AES engine, identity resolution and the lease timer.

use crate::domain::{CsisError, LeaseId};
use csis_crypto::{BlockKey, CryptoError, BLOCK_LEN};
use csis_types::{AttStatus, Characteristic, ConnectionId, PeerAddress, ServiceHandle};
use std::time::Duration;

/// Sends ATT responses and notifications.
pub trait GattTransport: Send + Sync {
    /// Send a read response. `value` is empty unless `status` is success.
    fn send_read_response(
        &self,
        service: ServiceHandle,
        connection: ConnectionId,
        status: AttStatus,
        value: &[u8],
    ) -> Result<(), CsisError>;

    /// Send a write response.
    fn send_write_response(
        &self,
        service: ServiceHandle,
        connection: ConnectionId,
        status: AttStatus,
    ) -> Result<(), CsisError>;

    /// Send a characteristic value notification.
    fn send_notification(
        &self,
        service: ServiceHandle,
        connection: ConnectionId,
        characteristic: Characteristic,
        value: &[u8],
    ) -> Result<(), CsisError>;
}

/// One AES-128-CBC single-block request.
#[derive(Clone, Debug)]
pub struct EncryptRequest {
    /// Service instance to deliver the completion to.
    pub service: ServiceHandle,
    /// Peer the ciphertext is for.
    pub connection: ConnectionId,
    /// Cipher key.
    pub key: BlockKey,
    /// Initialisation vector.
    pub iv: [u8; BLOCK_LEN],
    /// Block to encrypt.
    pub plaintext: [u8; BLOCK_LEN],
}

/// Result of an [`EncryptRequest`], delivered as a separate event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptionCompletion {
    /// Service instance that issued the request.
    pub service: ServiceHandle,
    /// Peer the request was issued for.
    pub connection: ConnectionId,
    /// Ciphertext or failure.
    pub result: Result<[u8; BLOCK_LEN], CryptoError>,
}

/// Asynchronous AES engine.
///
/// `request_encrypt_block` returns once the request is accepted; the
/// ciphertext arrives later as an [`EncryptionCompletion`].
pub trait CryptoGateway: Send + Sync {
    /// Submit one block for encryption.
    fn request_encrypt_block(&self, request: EncryptRequest) -> Result<(), CryptoError>;
}

/// Maps transport connections onto stable peer identities.
pub trait IdentityResolver: Send + Sync {
    /// Identity address of the peer on `connection`, if it can be resolved.
    fn resolve_identity(&self, connection: ConnectionId) -> Option<PeerAddress>;

    /// Link key shared with the peer on `connection`, if bonded.
    fn link_key(&self, connection: ConnectionId) -> Option<BlockKey>;
}

/// One-shot lease timers.
///
/// An armed lease reports its expiry as an event carrying the [`LeaseId`].
/// `cancel` must guarantee that no expiry for that lease is delivered
/// afterwards, or that a late one is harmless.
pub trait LeaseTimer: Send + Sync {
    /// Start a timer.
    fn arm(&self, lease: LeaseId, duration: Duration);

    /// Stop a timer. Unknown or already fired leases are ignored.
    fn cancel(&self, lease: LeaseId);
}
