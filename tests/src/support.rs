//! # Test Fixtures
//!
//! A simulated device: one runtime, any number of service instances, a
//! transport that records every PDU and a static identity table.

use csis_bus::InMemoryEventBus;
use csis_crypto::BlockKey;
use csis_server::adapters::DEFAULT_EVENT_CAPACITY;
use csis_server::{
    event_channel, CoordinatedSetService, CsisConfig, CsisError, CsisRuntime, GattTransport,
    IdentityResolver, LocalCryptoGateway, ServiceDependencies, ServiceEvent, SetContext,
    TokioLeaseTimer,
};
use csis_telemetry::TelemetryConfig;
use csis_types::{AttStatus, Attribute, Characteristic, ConnectionId, PeerAddress, ServiceHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Once};
use tokio::sync::mpsc;

/// Notify-enable CCC value.
pub const NOTIFY: [u8; 2] = [0x01, 0x00];

static LOGGING: Once = Once::new();

/// Install a debug-level subscriber once per test binary.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let config = TelemetryConfig::default().with_log_level("csis_server=debug");
        // Another test harness may already own the global subscriber
        let _ = csis_telemetry::init_tracing(&config);
    });
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// PDU captured by [`RecordingTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pdu {
    Read {
        service: ServiceHandle,
        connection: ConnectionId,
        status: AttStatus,
        value: Vec<u8>,
    },
    Write {
        service: ServiceHandle,
        connection: ConnectionId,
        status: AttStatus,
    },
    Notify {
        service: ServiceHandle,
        connection: ConnectionId,
        characteristic: Characteristic,
        value: Vec<u8>,
    },
}

/// Records every PDU in order.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Pdu>>,
}

impl RecordingTransport {
    /// Remove and return everything sent so far.
    pub fn take(&self) -> Vec<Pdu> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Notification values sent to `connection` for `characteristic`.
    pub fn notifications_to(
        &self,
        connection: ConnectionId,
        characteristic: Characteristic,
    ) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .iter()
            .filter_map(|pdu| match pdu {
                Pdu::Notify {
                    connection: c,
                    characteristic: ch,
                    value,
                    ..
                } if *c == connection && *ch == characteristic => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of notifications of `characteristic` to anyone.
    pub fn notification_count(&self, characteristic: Characteristic) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|pdu| matches!(pdu, Pdu::Notify { characteristic: c, .. } if *c == characteristic))
            .count()
    }

    /// Most recent read response to `connection`.
    pub fn last_read(&self, connection: ConnectionId) -> Option<(AttStatus, Vec<u8>)> {
        self.sent.lock().iter().rev().find_map(|pdu| match pdu {
            Pdu::Read {
                connection: c,
                status,
                value,
                ..
            } if *c == connection => Some((*status, value.clone())),
            _ => None,
        })
    }

    /// Most recent write response status to `connection`.
    pub fn last_write(&self, connection: ConnectionId) -> Option<AttStatus> {
        self.sent.lock().iter().rev().find_map(|pdu| match pdu {
            Pdu::Write {
                connection: c,
                status,
                ..
            } if *c == connection => Some(*status),
            _ => None,
        })
    }
}

impl GattTransport for RecordingTransport {
    fn send_read_response(
        &self,
        service: ServiceHandle,
        connection: ConnectionId,
        status: AttStatus,
        value: &[u8],
    ) -> Result<(), CsisError> {
        self.sent.lock().push(Pdu::Read {
            service,
            connection,
            status,
            value: value.to_vec(),
        });
        Ok(())
    }

    fn send_write_response(
        &self,
        service: ServiceHandle,
        connection: ConnectionId,
        status: AttStatus,
    ) -> Result<(), CsisError> {
        self.sent.lock().push(Pdu::Write {
            service,
            connection,
            status,
        });
        Ok(())
    }

    fn send_notification(
        &self,
        service: ServiceHandle,
        connection: ConnectionId,
        characteristic: Characteristic,
        value: &[u8],
    ) -> Result<(), CsisError> {
        self.sent.lock().push(Pdu::Notify {
            service,
            connection,
            characteristic,
            value: value.to_vec(),
        });
        Ok(())
    }
}

// =============================================================================
// IDENTITIES
// =============================================================================

/// Static peer table standing in for the security manager.
#[derive(Default)]
pub struct IdentityTable {
    peers: Mutex<HashMap<ConnectionId, (PeerAddress, Option<BlockKey>)>>,
}

impl IdentityTable {
    /// Identity for peer number `n`.
    pub fn address(n: u8) -> PeerAddress {
        PeerAddress::public([0xC0, 0xFF, 0xEE, 0x00, 0x00, n])
    }

    /// Link key for peer number `n`.
    pub fn key(n: u8) -> BlockKey {
        BlockKey::from_bytes([n; 16])
    }

    /// Bonded peer `n` on `connection`.
    pub fn bond(&self, connection: ConnectionId, n: u8) {
        self.peers
            .lock()
            .insert(connection, (Self::address(n), Some(Self::key(n))));
    }

    /// Peer `n` on `connection` with a resolved identity but no link key.
    pub fn identify(&self, connection: ConnectionId, n: u8) {
        self.peers.lock().insert(connection, (Self::address(n), None));
    }
}

impl IdentityResolver for IdentityTable {
    fn resolve_identity(&self, connection: ConnectionId) -> Option<PeerAddress> {
        self.peers.lock().get(&connection).map(|(address, _)| *address)
    }

    fn link_key(&self, connection: ConnectionId) -> Option<BlockKey> {
        self.peers
            .lock()
            .get(&connection)
            .and_then(|(_, key)| key.clone())
    }
}

// =============================================================================
// DEVICE
// =============================================================================

/// A device hosting one or more CSIS instances. Must be built inside a
/// tokio runtime.
pub struct Device {
    pub runtime: CsisRuntime,
    pub sender: mpsc::Sender<ServiceEvent>,
    pub transport: Arc<RecordingTransport>,
    pub identities: Arc<IdentityTable>,
    pub bus: Arc<InMemoryEventBus>,
}

impl Device {
    /// One instance per entry of `handles`, all configured from `config`.
    pub fn new(config: &CsisConfig, handles: &[u16]) -> anyhow::Result<Self> {
        init_logging();

        let (sender, receiver) = event_channel(DEFAULT_EVENT_CAPACITY);
        let timer = Arc::new(TokioLeaseTimer::new(sender.clone()));
        let context = SetContext::new(config.lock_timeout_secs, timer).into_shared();
        let transport = Arc::new(RecordingTransport::default());
        let identities = Arc::new(IdentityTable::default());
        let bus = Arc::new(InMemoryEventBus::new());

        let deps = ServiceDependencies {
            transport: transport.clone(),
            crypto: Arc::new(LocalCryptoGateway::new(sender.clone())),
            identities: identities.clone(),
            events: bus.clone(),
        };

        let mut runtime = CsisRuntime::new(context.clone(), receiver);
        for &handle in handles {
            let service = CoordinatedSetService::new(
                ServiceHandle(handle),
                config,
                context.clone(),
                deps.clone(),
            )?;
            runtime.register(service);
        }

        Ok(Self {
            runtime,
            sender,
            transport,
            identities,
            bus,
        })
    }

    /// Connect bonded peer `n` as `connection` and enable notifications.
    pub fn connect(
        &mut self,
        service: u16,
        connection: ConnectionId,
        n: u8,
        subscribe: &[Characteristic],
    ) {
        self.identities.bond(connection, n);
        self.runtime.dispatch(ServiceEvent::ClientConnected {
            service: ServiceHandle(service),
            connection,
        });
        for &characteristic in subscribe {
            self.write(
                service,
                connection,
                Attribute::ClientConfig(characteristic),
                &NOTIFY,
            );
        }
    }

    /// Disconnect `connection`.
    pub fn disconnect(&mut self, service: u16, connection: ConnectionId) {
        self.runtime.dispatch(ServiceEvent::ClientDisconnected {
            service: ServiceHandle(service),
            connection,
        });
    }

    /// Issue a read and let any completions it causes run.
    pub fn read(&mut self, service: u16, connection: ConnectionId, attribute: Attribute) {
        self.runtime.dispatch(ServiceEvent::Read {
            service: ServiceHandle(service),
            connection,
            attribute,
        });
        self.runtime.drain();
    }

    /// Issue a write and let any completions it causes run.
    pub fn write(&mut self, service: u16, connection: ConnectionId, attribute: Attribute, value: &[u8]) {
        self.runtime.dispatch(ServiceEvent::Write {
            service: ServiceHandle(service),
            connection,
            attribute,
            value: value.to_vec(),
        });
        self.runtime.drain();
    }

    /// Write the lock characteristic and return the response status.
    pub fn write_lock(&mut self, service: u16, connection: ConnectionId, value: u8) -> Option<AttStatus> {
        self.write(
            service,
            connection,
            Attribute::Value(Characteristic::Lock),
            &[value],
        );
        self.transport.last_write(connection)
    }

    /// Application handle on an instance.
    pub fn service(&mut self, handle: u16) -> &mut CoordinatedSetService {
        match self.runtime.service_mut(ServiceHandle(handle)) {
            Some(service) => service,
            None => panic!("no service instance {handle}"),
        }
    }
}
