//! Connection statistics

use serde::Serialize;

/// Snapshot of the registry's size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    /// Bound connections across all identities
    pub total_connections: usize,
    /// Identities with at least one live connection
    pub unique_users: usize,
}
