//! # Runtime
//!
//! Single-task event loop owning every service instance on the device.
//! Transport events, encryption completions and lease expiries all arrive as
//! [`ServiceEvent`]s on one channel and are handled one at a time.

use crate::context::SharedSetContext;
use crate::domain::LeaseId;
use crate::ports::inbound::CoordinatedSetApi;
use crate::ports::outbound::EncryptionCompletion;
use crate::service::CoordinatedSetService;
use csis_types::{Attribute, ConnectionId, ServiceHandle};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default capacity of the runtime event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Input to the runtime.
#[derive(Clone, Debug)]
pub enum ServiceEvent {
    /// A client connected to `service`.
    ClientConnected {
        service: ServiceHandle,
        connection: ConnectionId,
    },
    /// A client disconnected from `service`.
    ClientDisconnected {
        service: ServiceHandle,
        connection: ConnectionId,
    },
    /// ATT read request.
    Read {
        service: ServiceHandle,
        connection: ConnectionId,
        attribute: Attribute,
    },
    /// ATT write request.
    Write {
        service: ServiceHandle,
        connection: ConnectionId,
        attribute: Attribute,
        value: Vec<u8>,
    },
    /// The crypto gateway finished a block.
    EncryptionComplete(EncryptionCompletion),
    /// A lease timer fired.
    LeaseExpired(LeaseId),
    /// Stop the loop.
    Shutdown,
}

/// Create the runtime channel.
pub fn event_channel(capacity: usize) -> (mpsc::Sender<ServiceEvent>, mpsc::Receiver<ServiceEvent>) {
    mpsc::channel(capacity)
}

/// Event loop for the CSIS instances of one device.
pub struct CsisRuntime {
    context: SharedSetContext,
    services: HashMap<ServiceHandle, CoordinatedSetService>,
    receiver: mpsc::Receiver<ServiceEvent>,
}

impl CsisRuntime {
    /// Create a runtime with no instances.
    pub fn new(context: SharedSetContext, receiver: mpsc::Receiver<ServiceEvent>) -> Self {
        Self {
            context,
            services: HashMap::new(),
            receiver,
        }
    }

    /// Add an instance. Returns the instance it replaced, if any.
    pub fn register(&mut self, service: CoordinatedSetService) -> Option<CoordinatedSetService> {
        let handle = service.handle();
        info!(service = %handle, "Service instance registered");
        self.services.insert(handle, service)
    }

    /// The shared set context.
    pub fn context(&self) -> &SharedSetContext {
        &self.context
    }

    /// Look up an instance.
    pub fn service(&self, handle: ServiceHandle) -> Option<&CoordinatedSetService> {
        self.services.get(&handle)
    }

    /// Look up an instance for application calls.
    pub fn service_mut(&mut self, handle: ServiceHandle) -> Option<&mut CoordinatedSetService> {
        self.services.get_mut(&handle)
    }

    /// Handle one event. Returns false on shutdown.
    pub fn dispatch(&mut self, event: ServiceEvent) -> bool {
        match event {
            ServiceEvent::ClientConnected { service, connection } => {
                if let Some(instance) = self.instance(service) {
                    if let Err(err) = instance.on_client_connected(connection) {
                        debug!(%service, %connection, error = %err, "Connection not registered");
                    }
                }
            }
            ServiceEvent::ClientDisconnected { service, connection } => {
                if let Some(instance) = self.instance(service) {
                    instance.on_client_disconnected(connection);
                }
            }
            ServiceEvent::Read {
                service,
                connection,
                attribute,
            } => {
                if let Some(instance) = self.instance(service) {
                    instance.on_characteristic_read(connection, attribute);
                }
            }
            ServiceEvent::Write {
                service,
                connection,
                attribute,
                value,
            } => {
                if let Some(instance) = self.instance(service) {
                    instance.on_characteristic_write(connection, attribute, &value);
                }
            }
            ServiceEvent::EncryptionComplete(completion) => {
                if let Some(instance) = self.instance(completion.service) {
                    instance.on_encryption_complete(completion);
                }
            }
            ServiceEvent::LeaseExpired(lease) => {
                // The lease belongs to whichever instance took the lock
                let owner = self.context.lock().lock_state().owner_service;
                match self.services.get_mut(&owner) {
                    Some(instance) => instance.on_lease_expired(lease),
                    None => debug!(%lease, "Lease expiry with no owning instance ignored"),
                }
            }
            ServiceEvent::Shutdown => {
                info!("CSIS runtime shutting down");
                return false;
            }
        }
        true
    }

    /// Wait for and handle the next event. Returns false once the loop
    /// should stop.
    pub async fn step(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(event) => self.dispatch(event),
            None => false,
        }
    }

    /// Handle every event already queued, without waiting. Returns how many
    /// were handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            handled += 1;
            if !self.dispatch(event) {
                break;
            }
        }
        handled
    }

    /// Run until shutdown or until every sender is dropped.
    pub async fn run(mut self) {
        info!(instances = self.services.len(), "CSIS runtime started");
        while self.step().await {}
        info!("CSIS runtime stopped");
    }

    fn instance(&mut self, handle: ServiceHandle) -> Option<&mut CoordinatedSetService> {
        let instance = self.services.get_mut(&handle);
        if instance.is_none() {
            warn!(service = %handle, "Event for unknown service instance dropped");
        }
        instance
    }
}
