//! Connection handle and related types

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::websocket::OutboundMessage;

/// Lifecycle state of a connection as seen by the broadcaster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Open = 0,
    Closing = 1,
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Error returned when a message cannot be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection is not open")]
    NotOpen,
    #[error("connection writer has gone away")]
    WriterGone,
}

/// Handle for a single WebSocket connection.
///
/// Outbound messages go through an unbounded queue drained by the connection's
/// own writer task, so queuing never waits on the peer.
pub struct ConnectionHandle {
    pub id: Uuid,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::UnboundedSender<OutboundMessage>,
    /// Set once, by the first accepted AUTH
    identity: OnceLock<String>,
    state: AtomicU8,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            connected_at: Utc::now(),
            sender,
            identity: OnceLock::new(),
            state: AtomicU8::new(ConnectionState::Open as u8),
        }
    }

    /// Create a handle together with the receiving end of its outbound queue
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self::new(tx)), rx)
    }

    /// Identity this connection is bound to, if any
    pub fn identity(&self) -> Option<&str> {
        self.identity.get().map(String::as_str)
    }

    pub fn is_bound(&self) -> bool {
        self.identity.get().is_some()
    }

    /// Record the bound identity. Returns false if the connection was already bound.
    pub(crate) fn bind_identity(&self, identity: &str) -> bool {
        self.identity.set(identity.to_string()).is_ok()
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Open and with a live writer task
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open && !self.sender.is_closed()
    }

    /// Queue a message for this connection without waiting on the socket
    pub fn send(&self, message: OutboundMessage) -> Result<(), SendError> {
        if self.state() != ConnectionState::Open {
            return Err(SendError::NotOpen);
        }
        self.sender.send(message).map_err(|_| SendError::WriterGone)
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("identity", &self.identity())
            .field("state", &self.state())
            .field("connected_at", &self.connected_at)
            .finish()
    }
}
