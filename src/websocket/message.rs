use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};

/// Control messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Bind this connection to a user identity
    #[serde(rename = "AUTH")]
    Auth {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Frames queued for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Pre-serialized text frame; clones share one buffer down to the socket write
    Text(Utf8Bytes),
    /// Transport-level ping
    Ping,
    /// Close the connection
    Close,
}

impl OutboundMessage {
    pub fn text(text: impl Into<Utf8Bytes>) -> Self {
        Self::Text(text.into())
    }

    /// Serialize once so the same bytes can be cloned into many queues
    pub fn preserialized<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        Ok(Self::Text(Utf8Bytes::from(json)))
    }
}
