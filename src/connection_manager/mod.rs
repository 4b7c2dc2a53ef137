//! Connection registry for WebSocket connections
//!
//! This module provides:
//! - Connection handles with a bind-once identity and lifecycle state
//! - The identity -> connections index used to target event delivery
//! - Connection statistics

mod registry;
mod stats;
mod types;

pub use registry::ConnectionRegistry;
pub use stats::ConnectionStats;
pub use types::{ConnectionHandle, ConnectionState, SendError};
