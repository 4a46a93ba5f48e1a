//! # Client Registry
//!
//! Bounded, dense table of connected clients and their CCC descriptors.
//! Removal shifts later entries down, so table order is insertion order and
//! the first `len()` slots are always occupied.

use super::entities::{CccState, ClientConfig, ClientEntry};
use super::errors::CsisError;
use csis_types::{wire, Characteristic, ConnectionId};

/// Result of a CCC descriptor write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CccUpdate {
    /// Whether the stored state changed.
    pub changed: bool,
    /// Whether the client has now written all three descriptors.
    pub complete: bool,
}

/// Connected clients of one service instance.
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    entries: Vec<ClientEntry>,
    capacity: usize,
}

impl ClientRegistry {
    /// Create an empty registry holding at most `capacity` clients.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of clients.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of connected clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no client is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if no further client can be added.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// All entries in table order.
    #[must_use]
    pub fn entries(&self) -> &[ClientEntry] {
        &self.entries
    }

    /// Entry for `connection`.
    #[must_use]
    pub fn get(&self, connection: ConnectionId) -> Option<&ClientEntry> {
        self.entries.iter().find(|e| e.connection == connection)
    }

    /// True if `connection` is registered.
    #[must_use]
    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.get(connection).is_some()
    }

    /// Register a client with nothing subscribed.
    ///
    /// Returns false if the table is full or `connection` is the reserved zero
    /// id. Adding an already registered connection is a no-op returning true.
    pub fn add_client(&mut self, connection: ConnectionId) -> bool {
        self.add_client_with_config(connection, ClientConfig::default())
    }

    /// Register a client with a previously saved configuration.
    pub fn add_client_with_config(&mut self, connection: ConnectionId, config: ClientConfig) -> bool {
        if connection.is_none() {
            return false;
        }
        if self.contains(connection) {
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.entries.push(ClientEntry { connection, config });
        true
    }

    /// Remove a client, compacting the table.
    ///
    /// Returns the index the entry occupied and its configuration.
    pub fn remove_client(&mut self, connection: ConnectionId) -> Option<(usize, ClientConfig)> {
        let index = self.entries.iter().position(|e| e.connection == connection)?;
        let entry = self.entries.remove(index);
        Some((index, entry.config))
    }

    /// Apply a CCC descriptor write.
    ///
    /// # Errors
    ///
    /// - `UnknownConnection` if the client is not registered
    /// - `InvalidHandle` for Rank, which has no descriptor
    /// - `InvalidLength` unless exactly two bytes are written
    /// - `CccImproperlyConfigured` for an attempt to enable indications
    ///
    /// The decision is made on the first (low) byte. Values other than
    /// disabled, notify and indicate are acknowledged and ignored.
    pub fn set_notify_flag(
        &mut self,
        connection: ConnectionId,
        characteristic: Characteristic,
        raw: &[u8],
    ) -> Result<CccUpdate, CsisError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.connection == connection)
            .ok_or(CsisError::UnknownConnection(connection))?;

        let bytes: [u8; wire::CCC_LEN] = raw.try_into().map_err(|_| CsisError::InvalidLength {
            expected: wire::CCC_LEN,
            actual: raw.len(),
        })?;

        let slot = entry
            .config
            .slot_mut(characteristic)
            .ok_or(CsisError::InvalidHandle)?;

        // Only the low byte carries the notify/indicate bits
        let new_state = match bytes[0] {
            wire::CCC_INDICATE => return Err(CsisError::CccImproperlyConfigured),
            wire::CCC_NOTIFY => CccState::Notify,
            wire::CCC_DISABLED => CccState::Disabled,
            _ => *slot,
        };

        let changed = *slot != new_state;
        *slot = new_state;

        Ok(CccUpdate {
            changed,
            complete: entry.config.is_complete(),
        })
    }

    /// Descriptor value as the client reads it back.
    #[must_use]
    pub fn ccc_value(
        &self,
        connection: ConnectionId,
        characteristic: Characteristic,
    ) -> Option<[u8; wire::CCC_LEN]> {
        self.get(connection)?
            .config
            .get(characteristic)
            .map(CccState::to_wire)
    }

    /// Whether `connection` is subscribed to `characteristic`.
    #[must_use]
    pub fn is_subscribed(&self, connection: ConnectionId, characteristic: Characteristic) -> bool {
        self.get(connection)
            .is_some_and(|e| e.is_subscribed(characteristic))
    }

    /// Subscribed connections in table order.
    pub fn subscribed(
        &self,
        characteristic: Characteristic,
    ) -> impl Iterator<Item = ConnectionId> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.is_subscribed(characteristic))
            .map(|e| e.connection)
    }

    /// Call `f` for every subscribed connection, in table order.
    pub fn for_each_subscribed<F>(&self, characteristic: Characteristic, mut f: F)
    where
        F: FnMut(ConnectionId),
    {
        for connection in self.subscribed(characteristic) {
            f(connection);
        }
    }

    /// First subscribed client at or after table index `from`.
    #[must_use]
    pub fn next_subscribed_from(
        &self,
        characteristic: Characteristic,
        from: usize,
    ) -> Option<(usize, ConnectionId)> {
        self.entries
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, e)| e.is_subscribed(characteristic))
            .map(|(index, e)| (index, e.connection))
    }

    /// Saved configuration of `connection`.
    #[must_use]
    pub fn client_config(&self, connection: ConnectionId) -> Option<ClientConfig> {
        self.get(connection).map(|e| e.config)
    }
}
