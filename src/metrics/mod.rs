//! Prometheus metrics for the realtime service.
//!
//! This module provides metrics for monitoring event delivery:
//! - Connection metrics (opened, closed, duration, bound connections per user)
//! - Broadcast metrics (events by kind, deliveries, skipped recipients)
//! - Control message metrics (AUTH outcomes, malformed frames)

mod helpers;

pub use helpers::{encode_metrics, BroadcastMetrics, ConnectionMetrics, ControlMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "taskflow_realtime";

lazy_static! {
    // ============================================================================
    // Connection Metrics
    // ============================================================================

    /// Connections bound to an identity
    pub static ref CONNECTIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_connections_total", METRIC_PREFIX),
        "Number of WebSocket connections bound to a user"
    ).unwrap();

    /// Number of unique connected users
    pub static ref USERS_CONNECTED: IntGauge = register_int_gauge!(
        format!("{}_users_connected", METRIC_PREFIX),
        "Number of users with at least one live connection"
    ).unwrap();

    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_opened_total", METRIC_PREFIX),
        "Total WebSocket connections accepted"
    ).unwrap();

    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "Total WebSocket connections closed"
    ).unwrap();

    /// Connection lifetime in seconds
    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_ws_connection_duration_seconds", METRIC_PREFIX),
        "WebSocket connection lifetime in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0, 14400.0]
    ).unwrap();

    // ============================================================================
    // Broadcast Metrics
    // ============================================================================

    /// Events broadcast by kind
    pub static ref EVENTS_BROADCAST_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_broadcast_total", METRIC_PREFIX),
        "Total events broadcast",
        &["kind"]
    ).unwrap();

    /// Frames queued to open connections
    pub static ref EVENTS_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_delivered_total", METRIC_PREFIX),
        "Total event frames queued to open connections"
    ).unwrap();

    /// Recipients skipped because they were no longer open
    pub static ref EVENTS_SKIPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_skipped_total", METRIC_PREFIX),
        "Total recipients skipped because their connection was not open"
    ).unwrap();

    /// Events whose target had no live connection
    pub static ref EVENTS_UNROUTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_unrouted_total", METRIC_PREFIX),
        "Total events broadcast to a user with no live connection"
    ).unwrap();

    // ============================================================================
    // Control Message Metrics
    // ============================================================================

    /// Inbound control messages by outcome
    pub static ref WS_CONTROL_MESSAGES: IntCounterVec = register_int_counter_vec!(
        format!("{}_ws_control_messages_total", METRIC_PREFIX),
        "Inbound control messages by outcome",
        &["outcome"]
    ).unwrap();
}
