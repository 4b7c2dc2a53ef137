use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::stats::ConnectionStats;
use super::types::{ConnectionHandle, ConnectionState};

/// Maps each identity to its live connections (one user may have several devices).
///
/// Every structural change to an identity's set happens while holding that
/// entry's shard lock, and an entry is dropped in the same critical section
/// that empties it.
pub struct ConnectionRegistry {
    /// identity -> connection_id -> ConnectionHandle
    by_identity: DashMap<String, HashMap<Uuid, Arc<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            by_identity: DashMap::new(),
        }
    }

    /// Add a connection to the set for `identity`, binding the connection to it.
    ///
    /// Idempotent for the same pair. Returns false, leaving the registry untouched,
    /// when the connection is already bound to a different identity or is no
    /// longer open.
    pub fn register(&self, identity: &str, handle: &Arc<ConnectionHandle>) -> bool {
        if handle.state() != ConnectionState::Open {
            tracing::debug!(
                connection_id = %handle.id,
                "Ignoring registration of closing connection"
            );
            return false;
        }

        if !handle.bind_identity(identity) && handle.identity() != Some(identity) {
            tracing::warn!(
                connection_id = %handle.id,
                bound_to = ?handle.identity(),
                requested = %identity,
                "Connection already bound to another identity"
            );
            return false;
        }

        let previous = self
            .by_identity
            .entry(identity.to_string())
            .or_default()
            .insert(handle.id, handle.clone());

        // Teardown may have run between the state check and the insert
        if handle.state() != ConnectionState::Open {
            self.unregister(handle);
            return false;
        }

        if previous.is_none() {
            tracing::info!(
                connection_id = %handle.id,
                user_id = %identity,
                "Connection registered"
            );
        }

        true
    }

    /// Remove a connection from the set of the identity it is bound to.
    ///
    /// Deletes the entry when this empties it. Unbound or already removed
    /// connections are a no-op. Returns whether anything was removed.
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let Some(identity) = handle.identity() else {
            return false;
        };

        let removed = match self.by_identity.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                let removed = entry.get_mut().remove(&handle.id).is_some();
                if entry.get().is_empty() {
                    entry.remove();
                }
                removed
            }
            Entry::Vacant(_) => false,
        };

        if removed {
            handle.set_state(ConnectionState::Closed);
            tracing::info!(
                connection_id = %handle.id,
                user_id = %identity,
                "Connection unregistered"
            );
        }

        removed
    }

    /// Snapshot of the live connections for an identity
    pub fn connections_for(&self, identity: &str) -> Vec<Arc<ConnectionHandle>> {
        self.by_identity
            .get(identity)
            .map(|conns| conns.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_live_connections(&self, identity: &str) -> bool {
        self.by_identity.contains_key(identity)
    }

    /// Snapshot of every registered connection
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_identity
            .iter()
            .flat_map(|entry| entry.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn stats(&self) -> ConnectionStats {
        let mut total_connections = 0;
        let mut unique_users = 0;
        for entry in self.by_identity.iter() {
            total_connections += entry.value().len();
            unique_users += 1;
        }

        ConnectionStats {
            total_connections,
            unique_users,
        }
    }

    /// Drop every entry, marking all connections closed. Returns the number released.
    pub fn clear(&self) -> usize {
        let mut released = 0;
        self.by_identity.retain(|_, conns| {
            for handle in conns.values() {
                handle.set_state(ConnectionState::Closed);
            }
            released += conns.len();
            false
        });

        if released > 0 {
            tracing::info!(released = released, "Connection registry cleared");
        }

        released
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
