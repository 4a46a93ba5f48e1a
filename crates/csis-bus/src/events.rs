//! # CSIS Events
//!
//! Indications a CSIS service instance raises towards the local application.

use csis_types::{ConnectionId, LockValue, ServiceHandle};
use serde::{Deserialize, Serialize};

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsisEvent {
    /// A remote client acquired or released the set member lock.
    LockStateChanged {
        /// Service instance that handled the write.
        service: ServiceHandle,
        /// Client that wrote the lock.
        connection: ConnectionId,
        /// The committed lock value.
        value: LockValue,
    },

    /// The lease ran out and the lock was forced back to unlocked.
    LockReleased {
        /// Service instance that owned the lease.
        service: ServiceHandle,
        /// Connection that held the lock when the lease ran out.
        previous_owner: ConnectionId,
    },

    /// A client changed its Lock CCC descriptor.
    ConfigChanged {
        /// Service instance the descriptor belongs to.
        service: ServiceHandle,
        /// Client that wrote the descriptor.
        connection: ConnectionId,
        /// True once the client has written all three CCC descriptors.
        complete: bool,
    },
}

impl CsisEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::LockStateChanged { .. } | Self::LockReleased { .. } => EventTopic::Lock,
            Self::ConfigChanged { .. } => EventTopic::ClientConfig,
        }
    }

    /// Get the originating service instance.
    #[must_use]
    pub fn service(&self) -> ServiceHandle {
        match self {
            Self::LockStateChanged { service, .. }
            | Self::LockReleased { service, .. }
            | Self::ConfigChanged { service, .. } => *service,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Lock transitions and lease expiry.
    Lock,
    /// CCC descriptor changes.
    ClientConfig,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Service instances to include. Empty means all instances.
    pub services: Vec<ServiceHandle>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            services: Vec::new(),
        }
    }

    /// Create a filter for events from specific service instances.
    #[must_use]
    pub fn from_services(services: Vec<ServiceHandle>) -> Self {
        Self {
            topics: Vec::new(),
            services,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &CsisEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let service_match = self.services.is_empty() || self.services.contains(&event.service());

        topic_match && service_match
    }
}
