// Infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain layer
pub mod connection_manager;
pub mod notification;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;
pub mod websocket;

// Supporting modules
pub mod shutdown;
