//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use crate::connection_manager::ConnectionStats;

use super::{
    CONNECTIONS_TOTAL, EVENTS_BROADCAST_TOTAL, EVENTS_DELIVERED_TOTAL, EVENTS_SKIPPED_TOTAL,
    EVENTS_UNROUTED_TOTAL, USERS_CONNECTED, WS_CONTROL_MESSAGES,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Connection gauges, sampled from the registry at scrape time
pub struct ConnectionMetrics;

impl ConnectionMetrics {
    pub fn sample(stats: &ConnectionStats) {
        CONNECTIONS_TOTAL.set(stats.total_connections as i64);
        USERS_CONNECTED.set(stats.unique_users as i64);
    }
}

/// Helper struct for recording broadcast metrics
pub struct BroadcastMetrics;

impl BroadcastMetrics {
    /// Record one broadcast and its per-recipient outcome
    pub fn record(kind: &str, delivered: usize, skipped: usize) {
        EVENTS_BROADCAST_TOTAL.with_label_values(&[kind]).inc();
        EVENTS_DELIVERED_TOTAL.inc_by(delivered as u64);
        EVENTS_SKIPPED_TOTAL.inc_by(skipped as u64);
        if delivered == 0 && skipped == 0 {
            EVENTS_UNROUTED_TOTAL.inc();
        }
    }
}

/// Helper struct for recording inbound control message outcomes
pub struct ControlMetrics;

impl ControlMetrics {
    pub fn record_bound() {
        WS_CONTROL_MESSAGES.with_label_values(&["bound"]).inc();
    }

    pub fn record_already_bound() {
        WS_CONTROL_MESSAGES.with_label_values(&["already_bound"]).inc();
    }

    pub fn record_rejected() {
        WS_CONTROL_MESSAGES.with_label_values(&["rejected"]).inc();
    }

    pub fn record_malformed() {
        WS_CONTROL_MESSAGES.with_label_values(&["malformed"]).inc();
    }
}
