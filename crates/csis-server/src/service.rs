//! # Coordinated Set Service
//!
//! Application service layer that implements the `CoordinatedSetApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`CoordinatedSetApi`)
//! - Routes lock writes to the shared [`SetContext`](crate::context::SetContext)
//!   and SIRK traffic to its [`SirkDistributor`]
//! - Drives the outbound ports (`GattTransport`, `CryptoGateway`,
//!   `IdentityResolver`) and publishes application events on the bus
//!
//! Notification delivery is best effort: a failed send is logged and counted,
//! and the state change that caused it stands.

use crate::context::{SetContext, SharedSetContext};
use crate::domain::{
    validate_membership, ClientConfig, ClientRegistry, ConfigError, CsisConfig, CsisError,
    EncryptionPurpose, IdentityChanges, LeaseId, LockEffect, LockOutcome, LockState,
    PendingEncryption, Rsi, RsiCodec, SetIdentity, Sirk, SirkDistributor, SirkFanOut, SirkRead,
    SirkValue,
};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ports::inbound::CoordinatedSetApi;
use crate::ports::outbound::{
    CryptoGateway, EncryptRequest, EncryptionCompletion, GattTransport, IdentityResolver,
};
use csis_bus::{CsisEvent, EventPublisher};
use csis_crypto::{CryptoError, BLOCK_LEN, ZERO_IV};
use csis_telemetry::{log_lock_event, log_peer_event};
use csis_types::{AttStatus, Attribute, Characteristic, ConnectionId, LockValue, ServiceHandle, SharingMode};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outbound collaborators of a service instance.
#[derive(Clone)]
pub struct ServiceDependencies {
    /// ATT responses and notifications.
    pub transport: Arc<dyn GattTransport>,
    /// AES engine for SIRK encryption.
    pub crypto: Arc<dyn CryptoGateway>,
    /// Peer identities and link keys.
    pub identities: Arc<dyn IdentityResolver>,
    /// Application event bus.
    pub events: Arc<dyn EventPublisher>,
}

/// One CSIS service instance.
pub struct CoordinatedSetService {
    handle: ServiceHandle,
    context: SharedSetContext,
    registry: ClientRegistry,
    sirk: SirkDistributor,
    rsi: RsiCodec,
    transport: Arc<dyn GattTransport>,
    crypto: Arc<dyn CryptoGateway>,
    identities: Arc<dyn IdentityResolver>,
    events: Arc<dyn EventPublisher>,
    metrics: Metrics,
}

impl CoordinatedSetService {
    /// Create an instance from configuration.
    ///
    /// The lock timeout in `config` is not used here: the lease length lives
    /// in the shared context.
    pub fn new(
        handle: ServiceHandle,
        config: &CsisConfig,
        context: SharedSetContext,
        deps: ServiceDependencies,
    ) -> Result<Self, ConfigError> {
        let identity = config.identity()?;
        Ok(Self::with_identity(
            handle,
            identity,
            config.max_connections,
            context,
            deps,
        ))
    }

    /// Create an instance with an explicit identity.
    pub fn with_identity(
        handle: ServiceHandle,
        identity: SetIdentity,
        max_connections: usize,
        context: SharedSetContext,
        deps: ServiceDependencies,
    ) -> Self {
        info!(
            service = %handle,
            mode = ?identity.sharing_mode,
            size = identity.size,
            rank = identity.rank,
            max_connections,
            "CSIS service instance created"
        );
        Self {
            handle,
            context,
            registry: ClientRegistry::new(max_connections),
            sirk: SirkDistributor::new(identity),
            rsi: RsiCodec::new(),
            transport: deps.transport,
            crypto: deps.crypto,
            identities: deps.identities,
            events: deps.events,
            metrics: Metrics::new(),
        }
    }

    /// This instance's handle.
    pub fn handle(&self) -> ServiceHandle {
        self.handle
    }

    /// Connected clients.
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // =========================================================================
    // Responses and notifications
    // =========================================================================

    fn respond_read(&self, connection: ConnectionId, result: Result<Vec<u8>, CsisError>) {
        let (status, value) = match result {
            Ok(value) => (AttStatus::Success, value),
            Err(err) => {
                debug!(service = %self.handle, %connection, error = %err, "Read refused");
                (err.att_status(), Vec::new())
            }
        };
        if let Err(err) = self
            .transport
            .send_read_response(self.handle, connection, status, &value)
        {
            warn!(service = %self.handle, %connection, error = %err, "Failed to send read response");
        }
    }

    fn respond_write(&self, connection: ConnectionId, result: Result<(), CsisError>) {
        let status = match result {
            Ok(()) => AttStatus::Success,
            Err(err) => {
                debug!(service = %self.handle, %connection, error = %err, "Write refused");
                err.att_status()
            }
        };
        if let Err(err) = self
            .transport
            .send_write_response(self.handle, connection, status)
        {
            warn!(service = %self.handle, %connection, error = %err, "Failed to send write response");
        }
    }

    fn notify(&self, connection: ConnectionId, characteristic: Characteristic, value: &[u8]) {
        match self
            .transport
            .send_notification(self.handle, connection, characteristic, value)
        {
            Ok(()) => self.metrics.record_notification(true),
            Err(err) => {
                self.metrics.record_notification(false);
                warn!(
                    service = %self.handle,
                    %connection,
                    %characteristic,
                    error = %err,
                    "Notification not delivered"
                );
            }
        }
    }

    fn notify_subscribers(
        &self,
        characteristic: Characteristic,
        value: &[u8],
        exclude: Option<ConnectionId>,
    ) {
        self.registry
            .for_each_subscribed(characteristic, |connection| {
                if Some(connection) != exclude {
                    self.notify(connection, characteristic, value);
                }
            });
    }

    // =========================================================================
    // Lock
    // =========================================================================

    fn write_lock(&self, connection: ConnectionId, value: &[u8]) {
        let identity = self.identities.resolve_identity(connection);
        let (decision, lock_value) = {
            let mut ctx = self.context.lock();
            let decision = ctx.write_lock(self.handle, connection, identity, value);
            (decision, ctx.lock_state().value)
        };

        match &decision.outcome {
            LockOutcome::Denied | LockOutcome::ReleaseNotAllowed => self.metrics.record_lock_denied(),
            LockOutcome::Invalid(_) => self.metrics.record_lock_invalid(),
            LockOutcome::Granted | LockOutcome::AlreadyGranted => {}
        }
        match decision.effect {
            LockEffect::Acquire => self.metrics.record_lock_granted(),
            LockEffect::Release => self.metrics.record_lock_released(),
            LockEffect::None | LockEffect::UpdateOwnerConnection => {}
        }

        log_lock_event!(
            debug,
            self.handle,
            "Lock write evaluated",
            connection,
            outcome = ?decision.outcome,
            effect = ?decision.effect
        );

        let effect = decision.effect;
        self.respond_write(connection, decision.outcome.into_result());

        if effect.changes_value() {
            log_lock_event!(info, self.handle, "Lock changed", connection, value = %lock_value);
            self.notify_subscribers(Characteristic::Lock, &[lock_value.to_wire()], Some(connection));
            self.events.publish(CsisEvent::LockStateChanged {
                service: self.handle,
                connection,
                value: lock_value,
            });
        }
    }

    // =========================================================================
    // SIRK
    // =========================================================================

    /// Claim the encryption slot and submit one block for `connection`.
    fn start_encryption(
        &self,
        ctx: &mut SetContext,
        connection: ConnectionId,
        purpose: EncryptionPurpose,
    ) -> Result<(), CsisError> {
        if ctx.encryption().is_busy() {
            self.metrics.record_encryption_busy();
            return Err(CsisError::EncryptionBusy);
        }

        let key = self
            .identities
            .link_key(connection)
            .ok_or(CsisError::NoLinkKey(connection))?;

        ctx.encryption_mut().begin(PendingEncryption {
            service: self.handle,
            connection,
            purpose,
            key_generation: self.sirk.key_generation(),
        })?;

        let request = EncryptRequest {
            service: self.handle,
            connection,
            key,
            iv: ZERO_IV,
            plaintext: self.sirk.encryption_input(),
        };
        if let Err(err) = self.crypto.request_encrypt_block(request) {
            ctx.encryption_mut().clear();
            self.metrics.record_encryption_failed();
            warn!(service = %self.handle, %connection, error = %err, "Encryption request rejected");
            return Err(err.into());
        }

        self.metrics.record_encryption_requested();
        debug!(service = %self.handle, %connection, ?purpose, "SIRK encryption requested");
        Ok(())
    }

    /// Start the next encryption of a change fan-out, searching from table
    /// index `from`. Peers without a link key are skipped.
    fn continue_fan_out(&self, ctx: &mut SetContext, mut from: usize) {
        while let Some((index, connection)) = self
            .registry
            .next_subscribed_from(Characteristic::Sirk, from)
        {
            let purpose = EncryptionPurpose::NotifyAfterChange { cursor: index + 1 };
            match self.start_encryption(ctx, connection, purpose) {
                Ok(()) => return,
                Err(CsisError::NoLinkKey(_)) => {
                    debug!(service = %self.handle, %connection, "No link key, skipping SIRK notification");
                    from = index + 1;
                }
                Err(err) => {
                    warn!(service = %self.handle, %connection, error = %err, "SIRK notification fan-out aborted");
                    return;
                }
            }
        }
        debug!(service = %self.handle, "SIRK notification fan-out complete");
    }

    /// Answer a deferred read under the identity as it is now. The sharing
    /// mode may have changed since the request, and a ciphertext of a
    /// replaced key is encrypted again rather than sent.
    fn finish_read(
        &self,
        ctx: &mut SetContext,
        pending: &PendingEncryption,
        result: Result<[u8; BLOCK_LEN], CryptoError>,
    ) {
        let connection = pending.connection;
        let response = match (self.sirk.read(), result) {
            (Err(err), _) => Err(err),
            (Ok(SirkRead::Immediate(value)), _) => Ok(value.to_vec()),
            (Ok(SirkRead::Deferred), Err(err)) => {
                warn!(service = %self.handle, %connection, error = %err, "SIRK encryption failed");
                Err(CsisError::Crypto(err))
            }
            (Ok(SirkRead::Deferred), Ok(_))
                if pending.key_generation != self.sirk.key_generation() =>
            {
                debug!(service = %self.handle, %connection, "SIRK replaced during read, encrypting again");
                match self.start_encryption(ctx, connection, EncryptionPurpose::RespondToRead) {
                    Ok(()) => return,
                    Err(err) => Err(err),
                }
            }
            (Ok(SirkRead::Deferred), Ok(ciphertext)) => {
                Ok(SirkDistributor::encrypted_value(&ciphertext).to_vec())
            }
        };
        self.respond_read(connection, response);
    }

    /// `Ok(None)` when the response is deferred to an encryption completion.
    fn read_sirk(&self, connection: ConnectionId) -> Result<Option<SirkValue>, CsisError> {
        match self.sirk.read()? {
            SirkRead::Immediate(value) => Ok(Some(value)),
            SirkRead::Deferred => {
                let mut ctx = self.context.lock();
                self.start_encryption(&mut ctx, connection, EncryptionPurpose::RespondToRead)?;
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Client configuration
    // =========================================================================

    fn write_ccc(
        &mut self,
        connection: ConnectionId,
        characteristic: Characteristic,
        value: &[u8],
    ) -> Result<(), CsisError> {
        let update = self
            .registry
            .set_notify_flag(connection, characteristic, value)?;
        debug!(
            service = %self.handle,
            %connection,
            %characteristic,
            changed = update.changed,
            "CCC written"
        );

        if characteristic == Characteristic::Lock && update.changed {
            self.events.publish(CsisEvent::ConfigChanged {
                service: self.handle,
                connection,
                complete: update.complete,
            });
        }
        Ok(())
    }
}

impl CoordinatedSetApi for CoordinatedSetService {
    fn on_client_connected(&mut self, connection: ConnectionId) -> Result<(), CsisError> {
        self.add_client_with_config(connection, ClientConfig::default())
    }

    fn on_client_disconnected(&mut self, connection: ConnectionId) -> Option<ClientConfig> {
        let (index, config) = self.registry.remove_client(connection)?;
        self.context
            .lock()
            .encryption_mut()
            .on_client_removed(self.handle, connection, index);
        log_peer_event!(info, self.handle, "Client disconnected", connection);
        Some(config)
    }

    fn on_characteristic_read(&mut self, connection: ConnectionId, attribute: Attribute) {
        if !self.registry.contains(connection) {
            error!(service = %self.handle, %connection, ?attribute, "Read from unknown connection dropped");
            return;
        }

        let result = match attribute {
            Attribute::ServiceDeclaration => Ok(Vec::new()),
            Attribute::Value(Characteristic::Lock) => {
                Ok(self.context.lock().lock_state().wire_value().to_vec())
            }
            Attribute::Value(Characteristic::Size) => Ok(vec![self.sirk.identity().size]),
            Attribute::Value(Characteristic::Rank) => Ok(vec![self.sirk.identity().rank]),
            Attribute::Value(Characteristic::Sirk) => match self.read_sirk(connection) {
                Ok(Some(value)) => Ok(value.to_vec()),
                Ok(None) => return,
                Err(err) => Err(err),
            },
            Attribute::ClientConfig(characteristic) => self
                .registry
                .ccc_value(connection, characteristic)
                .map(|v| v.to_vec())
                .ok_or(CsisError::InvalidHandle),
        };
        self.respond_read(connection, result);
    }

    fn on_characteristic_write(&mut self, connection: ConnectionId, attribute: Attribute, value: &[u8]) {
        if !self.registry.contains(connection) {
            error!(service = %self.handle, %connection, ?attribute, "Write from unknown connection dropped");
            return;
        }

        match attribute {
            Attribute::Value(Characteristic::Lock) => self.write_lock(connection, value),
            Attribute::ClientConfig(characteristic) => {
                let result = self.write_ccc(connection, characteristic, value);
                self.respond_write(connection, result);
            }
            Attribute::ServiceDeclaration => {
                self.respond_write(connection, Err(CsisError::WriteNotPermitted));
            }
            Attribute::Value(_) => {
                self.respond_write(connection, Err(CsisError::RequestNotSupported));
            }
        }
    }

    fn on_encryption_complete(&mut self, completion: EncryptionCompletion) {
        let context = Arc::clone(&self.context);
        let mut ctx = context.lock();

        let Some(pending) = ctx
            .encryption_mut()
            .take_matching(self.handle, completion.connection)
        else {
            debug!(
                service = %self.handle,
                connection = %completion.connection,
                "Encryption completion does not match the pending request, ignored"
            );
            return;
        };

        let connection = pending.connection;
        if completion.result.is_err() {
            self.metrics.record_encryption_failed();
        }
        match (pending.purpose, completion.result) {
            (EncryptionPurpose::RespondToRead, result) => {
                self.finish_read(&mut ctx, &pending, result);
            }
            (EncryptionPurpose::NotifyAfterChange { .. }, Ok(_))
                if !self.sirk.accepts_fan_out(&pending) =>
            {
                info!(
                    service = %self.handle,
                    %connection,
                    mode = ?self.sirk.identity().sharing_mode,
                    "Set identity changed, SIRK notification fan-out stopped"
                );
            }
            (EncryptionPurpose::NotifyAfterChange { cursor }, Ok(ciphertext)) => {
                if self.registry.is_subscribed(connection, Characteristic::Sirk) {
                    let value = SirkDistributor::encrypted_value(&ciphertext);
                    self.notify(connection, Characteristic::Sirk, &value);
                }
                self.continue_fan_out(&mut ctx, cursor);
            }
            (EncryptionPurpose::NotifyAfterChange { .. }, Err(err)) => {
                warn!(
                    service = %self.handle,
                    %connection,
                    error = %err,
                    "SIRK encryption failed, remaining notifications dropped"
                );
            }
        }
    }

    fn on_lease_expired(&mut self, lease: LeaseId) {
        let Some(expiry) = self.context.lock().expire_lease(lease) else {
            debug!(service = %self.handle, %lease, "Stale lease expiry ignored");
            return;
        };

        self.metrics.record_lease_expired();
        log_lock_event!(
            info,
            self.handle,
            "Lease expired, lock released",
            expiry.previous_owner,
            %lease
        );

        self.notify_subscribers(Characteristic::Lock, &[LockValue::Unlocked.to_wire()], None);
        self.events.publish(CsisEvent::LockReleased {
            service: expiry.service,
            previous_owner: expiry.previous_owner,
        });
    }

    fn reconfigure(&mut self, identity: SetIdentity) -> Result<IdentityChanges, CsisError> {
        validate_membership(identity.size, identity.rank)?;
        let changes = self.sirk.diff(&identity);
        let context = Arc::clone(&self.context);
        let mut ctx = context.lock();

        let needs_encryption = changes.sirk
            && identity.sharing_mode == SharingMode::EncryptedOnly
            && self.registry.subscribed(Characteristic::Sirk).next().is_some();
        if needs_encryption && ctx.encryption().is_busy() {
            self.metrics.record_encryption_busy();
            warn!(service = %self.handle, "SIRK change refused while an encryption is in flight");
            return Err(CsisError::EncryptionBusy);
        }

        self.sirk.apply(identity);
        info!(
            service = %self.handle,
            sirk_changed = changes.sirk,
            mode_changed = changes.sharing_mode,
            size_changed = changes.size,
            rank_changed = changes.rank,
            "Set identity reconfigured"
        );

        if changes.size {
            let size = self.sirk.identity().size;
            self.notify_subscribers(Characteristic::Size, &[size], None);
        }

        if changes.sirk {
            match self.sirk.fan_out() {
                SirkFanOut::None => {}
                SirkFanOut::Plaintext(value) => {
                    self.notify_subscribers(Characteristic::Sirk, &value, None);
                }
                SirkFanOut::Encrypted => self.continue_fan_out(&mut ctx, 0),
            }
        }

        Ok(changes)
    }

    fn set_sirk(&mut self, sirk: Sirk) -> Result<IdentityChanges, CsisError> {
        let mut identity = self.sirk.identity().clone();
        identity.sirk = sirk;
        self.reconfigure(identity)
    }

    fn set_sharing_mode(&mut self, mode: SharingMode) -> Result<IdentityChanges, CsisError> {
        let mut identity = self.sirk.identity().clone();
        identity.sharing_mode = mode;
        self.reconfigure(identity)
    }

    fn set_size(&mut self, size: u8) -> Result<IdentityChanges, CsisError> {
        let mut identity = self.sirk.identity().clone();
        identity.size = size;
        self.reconfigure(identity)
    }

    fn set_rank(&mut self, rank: u8) -> Result<IdentityChanges, CsisError> {
        let mut identity = self.sirk.identity().clone();
        identity.rank = rank;
        self.reconfigure(identity)
    }

    fn identity(&self) -> &SetIdentity {
        self.sirk.identity()
    }

    fn set_lock(&mut self, value: LockValue, timeout_secs: u16) {
        let changed = self
            .context
            .lock()
            .override_lock(self.handle, value, timeout_secs);
        info!(service = %self.handle, %value, timeout_secs, changed, "Lock set by application");

        if changed {
            self.notify_subscribers(Characteristic::Lock, &[value.to_wire()], None);
        }
    }

    fn lock_state(&self) -> LockState {
        self.context.lock().lock_state().clone()
    }

    fn generate_rsi(&self) -> Rsi {
        self.rsi.generate(self.sirk.sirk())
    }

    fn client_config(&self, connection: ConnectionId) -> Option<ClientConfig> {
        self.registry.client_config(connection)
    }

    fn add_client_with_config(
        &mut self,
        connection: ConnectionId,
        config: ClientConfig,
    ) -> Result<(), CsisError> {
        if connection.is_none() {
            return Err(CsisError::UnknownConnection(connection));
        }
        if !self.registry.add_client_with_config(connection, config) {
            self.metrics.record_client_rejected();
            log_peer_event!(warn, self.handle, "Client rejected, registry full", connection);
            return Err(CsisError::RegistryFull {
                capacity: self.registry.capacity(),
            });
        }
        log_peer_event!(info, self.handle, "Client connected", connection);
        Ok(())
    }
}
