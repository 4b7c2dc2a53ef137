//! Graceful shutdown handling for the realtime service.
//!
//! Shutdown runs in three phases:
//! 1. Signal every connection task to send a close frame and exit
//! 2. Wait for connections to unregister themselves
//! 3. Release whatever is still registered

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::config::ShutdownSettings;
use crate::connection_manager::ConnectionRegistry;

/// Poll interval while waiting for the registry to drain
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Configuration for graceful shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Time to wait for connections to close on their own (default: 10 seconds)
    pub drain_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ShutdownSettings> for ShutdownConfig {
    fn from(settings: &ShutdownSettings) -> Self {
        Self {
            drain_timeout: Duration::from_secs(settings.drain_timeout_secs),
        }
    }
}

/// Handles graceful shutdown of the realtime service
pub struct GracefulShutdown {
    registry: Arc<ConnectionRegistry>,
    shutdown_tx: broadcast::Sender<()>,
    config: ShutdownConfig,
}

impl GracefulShutdown {
    pub fn new(registry: Arc<ConnectionRegistry>, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self::with_config(registry, shutdown_tx, ShutdownConfig::default())
    }

    pub fn with_config(
        registry: Arc<ConnectionRegistry>,
        shutdown_tx: broadcast::Sender<()>,
        config: ShutdownConfig,
    ) -> Self {
        Self {
            registry,
            shutdown_tx,
            config,
        }
    }

    /// Execute the shutdown sequence
    #[tracing::instrument(
        name = "graceful_shutdown",
        skip(self),
        fields(total_connections = self.registry.stats().total_connections)
    )]
    pub async fn execute(&self, reason: &str) -> ShutdownResult {
        let start = std::time::Instant::now();
        let mut result = ShutdownResult {
            connections_at_start: self.registry.stats().total_connections,
            ..Default::default()
        };

        // Phase 1: tell connection tasks to close
        tracing::info!(
            reason = %reason,
            "Starting graceful shutdown - Phase 1: Closing connections"
        );
        let signalled = self.shutdown_tx.send(()).unwrap_or(0);
        tracing::debug!(receivers = signalled, "Shutdown signal sent");

        // Phase 2: wait for them to unregister
        tracing::info!("Phase 2: Waiting for connections to close");
        result.connections_closed = self.wait_for_connections_to_close().await;

        // Phase 3: release anything left behind
        result.connections_released = self.registry.clear();
        if result.connections_released > 0 {
            tracing::warn!(
                remaining_connections = result.connections_released,
                "Some connections did not close gracefully"
            );
        }

        result.duration = start.elapsed();

        tracing::info!(
            connections_closed = result.connections_closed,
            connections_released = result.connections_released,
            duration_ms = result.duration.as_millis(),
            "Graceful shutdown completed"
        );

        result
    }

    async fn wait_for_connections_to_close(&self) -> usize {
        let initial = self.registry.stats().total_connections;
        if initial == 0 {
            return 0;
        }

        let registry = self.registry.clone();
        let wait_future = async move {
            while registry.stats().total_connections > 0 {
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        };

        let _ = timeout(self.config.drain_timeout, wait_future).await;

        initial.saturating_sub(self.registry.stats().total_connections)
    }
}

/// Result of a graceful shutdown operation
#[derive(Debug, Default)]
pub struct ShutdownResult {
    /// Registered connections when shutdown began
    pub connections_at_start: usize,
    /// Connections that closed on their own
    pub connections_closed: usize,
    /// Connections forcibly released after the drain timeout
    pub connections_released: usize,
    /// Total time taken for shutdown
    pub duration: Duration,
}
