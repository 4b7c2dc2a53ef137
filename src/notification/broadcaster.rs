use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::connection_manager::ConnectionRegistry;
use crate::metrics::BroadcastMetrics;
use crate::websocket::OutboundMessage;

use super::TaskEvent;

/// Outcome of one broadcast. Informational only; broadcast never fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    /// Connections the frame was queued to
    pub delivered: usize,
    /// Connections skipped because they were no longer open
    pub skipped: usize,
}

/// Statistics for the event broadcaster
#[derive(Debug, Default)]
pub struct BroadcastStats {
    pub events_broadcast: AtomicU64,
    pub total_delivered: AtomicU64,
    pub total_skipped: AtomicU64,
    /// Events whose target had no live connection
    pub unrouted: AtomicU64,
}

impl BroadcastStats {
    pub fn snapshot(&self) -> BroadcastStatsSnapshot {
        BroadcastStatsSnapshot {
            events_broadcast: self.events_broadcast.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_skipped: self.total_skipped.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of broadcaster statistics
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastStatsSnapshot {
    pub events_broadcast: u64,
    pub total_delivered: u64,
    pub total_skipped: u64,
    pub unrouted: u64,
}

/// Fans events out to every live connection of one identity.
///
/// Delivery is best effort: the event is serialized once, the shared frame is
/// queued on each open connection, and anything not open is skipped. Queuing
/// never waits on a peer, so one stalled socket cannot delay the others, and
/// per-connection FIFO queues keep events for an identity in broadcast order.
pub struct EventBroadcaster {
    registry: Arc<ConnectionRegistry>,
    stats: BroadcastStats,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            stats: BroadcastStats::default(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> BroadcastStatsSnapshot {
        self.stats.snapshot()
    }

    /// Deliver `event` to every open connection bound to `identity`
    #[tracing::instrument(
        name = "broadcaster.broadcast",
        skip(self, event),
        fields(user_id = %identity, kind = event.kind())
    )]
    pub fn broadcast(&self, identity: &str, event: &TaskEvent) -> DeliveryResult {
        let connections = self.registry.connections_for(identity);
        let mut result = DeliveryResult::default();

        if !connections.is_empty() {
            let frame = match OutboundMessage::preserialized(event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize event, dropping it");
                    return result;
                }
            };

            for conn in &connections {
                if !conn.is_open() {
                    result.skipped += 1;
                    continue;
                }
                match conn.send(frame.clone()) {
                    Ok(()) => result.delivered += 1,
                    Err(e) => {
                        tracing::debug!(connection_id = %conn.id, error = %e, "Skipping recipient");
                        result.skipped += 1;
                    }
                }
            }
        }

        self.stats.events_broadcast.fetch_add(1, Ordering::Relaxed);
        self.stats
            .total_delivered
            .fetch_add(result.delivered as u64, Ordering::Relaxed);
        self.stats
            .total_skipped
            .fetch_add(result.skipped as u64, Ordering::Relaxed);
        if connections.is_empty() {
            self.stats.unrouted.fetch_add(1, Ordering::Relaxed);
        }
        BroadcastMetrics::record(event.kind(), result.delivered, result.skipped);

        tracing::debug!(
            delivered = result.delivered,
            skipped = result.skipped,
            "Broadcast event"
        );

        result
    }
}
