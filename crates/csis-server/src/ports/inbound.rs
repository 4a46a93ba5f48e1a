//! # Inbound Ports (Driving Ports / API)
//!
//! The operations a CSIS service instance exposes to the GATT dispatch layer
//! and to the owning application.

use crate::domain::{
    ClientConfig, CsisError, IdentityChanges, LeaseId, LockState, Rsi, SetIdentity, Sirk,
};
use crate::ports::outbound::EncryptionCompletion;
use csis_types::{Attribute, ConnectionId, LockValue, SharingMode};

/// Primary CSIS server API.
///
/// Every call runs to completion. Responses and notifications leave through
/// the outbound [`GattTransport`](crate::ports::GattTransport); nothing is
/// returned to the transport directly.
pub trait CoordinatedSetApi: Send {
    // =========================================================================
    // Transport Events
    // =========================================================================

    /// A client connected. Fails with `RegistryFull` when at capacity.
    fn on_client_connected(&mut self, connection: ConnectionId) -> Result<(), CsisError>;

    /// A client disconnected. Returns its configuration for bonded storage.
    fn on_client_disconnected(&mut self, connection: ConnectionId) -> Option<ClientConfig>;

    /// A client read an attribute of this service.
    fn on_characteristic_read(&mut self, connection: ConnectionId, attribute: Attribute);

    /// A client wrote an attribute of this service.
    fn on_characteristic_write(&mut self, connection: ConnectionId, attribute: Attribute, value: &[u8]);

    // =========================================================================
    // Asynchronous Completions
    // =========================================================================

    /// The crypto gateway finished a request issued by this instance.
    fn on_encryption_complete(&mut self, completion: EncryptionCompletion);

    /// A lease timer fired.
    fn on_lease_expired(&mut self, lease: LeaseId);

    // =========================================================================
    // Application Configuration
    // =========================================================================

    /// Replace the set identity, notifying subscribers of what changed.
    ///
    /// Fails with `EncryptionBusy`, applying nothing, when a changed SIRK would
    /// need encrypting while another encryption is in flight.
    fn reconfigure(&mut self, identity: SetIdentity) -> Result<IdentityChanges, CsisError>;

    /// Replace the SIRK.
    fn set_sirk(&mut self, sirk: Sirk) -> Result<IdentityChanges, CsisError>;

    /// Replace the sharing mode.
    fn set_sharing_mode(&mut self, mode: SharingMode) -> Result<IdentityChanges, CsisError>;

    /// Replace the set size.
    fn set_size(&mut self, size: u8) -> Result<IdentityChanges, CsisError>;

    /// Replace the rank.
    fn set_rank(&mut self, rank: u8) -> Result<IdentityChanges, CsisError>;

    /// Current set identity.
    fn identity(&self) -> &SetIdentity;

    /// Force the lock from the local application. Always succeeds.
    fn set_lock(&mut self, value: LockValue, timeout_secs: u16);

    /// Snapshot of the device-wide lock.
    fn lock_state(&self) -> LockState;

    // =========================================================================
    // Advertising
    // =========================================================================

    /// Fresh RSI for the current SIRK.
    fn generate_rsi(&self) -> Rsi;

    // =========================================================================
    // Bonded Client Persistence
    // =========================================================================

    /// Configuration of a connected client.
    fn client_config(&self, connection: ConnectionId) -> Option<ClientConfig>;

    /// Register a reconnecting bonded client with its saved configuration.
    fn add_client_with_config(
        &mut self,
        connection: ConnectionId,
        config: ClientConfig,
    ) -> Result<(), CsisError>;
}
