//! Binds freshly opened connections to a user identity on `AUTH`.

use std::sync::Arc;

use crate::connection_manager::{ConnectionHandle, ConnectionRegistry, ConnectionState};
use crate::metrics::ControlMetrics;

use super::message::ClientMessage;

/// What happened to one inbound control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// Connection is now registered under this identity
    Bound(String),
    /// Connection was already bound; the message was ignored
    AlreadyBound,
    /// AUTH carried an empty identity, or arrived while the connection was closing
    Rejected,
    /// Not a recognizable control message
    Malformed,
}

/// Consumes control messages and registers connections under their identity.
///
/// A connection binds once. A later AUTH, whatever identity it names, is
/// ignored and the connection keeps receiving events for its first identity.
#[derive(Clone)]
pub struct IdentityBinder {
    registry: Arc<ConnectionRegistry>,
}

impl IdentityBinder {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Handle one inbound text frame. Never fails; bad input is logged and dropped.
    pub fn handle_text(&self, handle: &Arc<ConnectionHandle>, text: &str) -> BindOutcome {
        match ClientMessage::parse(text) {
            Ok(ClientMessage::Auth { user_id }) => self.bind(handle, &user_id),
            Err(e) => {
                tracing::warn!(
                    connection_id = %handle.id,
                    error = %e,
                    "Discarding malformed control message"
                );
                ControlMetrics::record_malformed();
                BindOutcome::Malformed
            }
        }
    }

    /// Bind `handle` to `user_id` unless it is already bound
    pub fn bind(&self, handle: &Arc<ConnectionHandle>, user_id: &str) -> BindOutcome {
        if user_id.is_empty() {
            tracing::warn!(connection_id = %handle.id, "AUTH with empty userId ignored");
            ControlMetrics::record_rejected();
            return BindOutcome::Rejected;
        }

        if let Some(bound) = handle.identity() {
            tracing::debug!(
                connection_id = %handle.id,
                user_id = %bound,
                requested = %user_id,
                "Connection already bound, ignoring AUTH"
            );
            ControlMetrics::record_already_bound();
            return BindOutcome::AlreadyBound;
        }

        if !self.registry.register(user_id, handle) {
            if handle.state() != ConnectionState::Open {
                ControlMetrics::record_rejected();
                return BindOutcome::Rejected;
            }
            // Lost a race with a concurrent AUTH on the same connection
            ControlMetrics::record_already_bound();
            return BindOutcome::AlreadyBound;
        }

        ControlMetrics::record_bound();
        BindOutcome::Bound(user_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<ConnectionRegistry>, IdentityBinder) {
        let registry = Arc::new(ConnectionRegistry::new());
        let binder = IdentityBinder::new(registry.clone());
        (registry, binder)
    }

    #[test]
    fn test_auth_binds_connection() {
        let (registry, binder) = setup();
        let (handle, _rx) = ConnectionHandle::channel();

        let outcome = binder.handle_text(&handle, r#"{"type":"AUTH","userId":"u1"}"#);

        assert_eq!(outcome, BindOutcome::Bound("u1".to_string()));
        assert_eq!(handle.identity(), Some("u1"));
        assert_eq!(registry.connections_for("u1").len(), 1);
    }

    #[test]
    fn test_empty_user_id_rejected() {
        let (registry, binder) = setup();
        let (handle, _rx) = ConnectionHandle::channel();

        let outcome = binder.handle_text(&handle, r#"{"type":"AUTH","userId":""}"#);

        assert_eq!(outcome, BindOutcome::Rejected);
        assert!(!handle.is_bound());
        assert_eq!(registry.stats().total_connections, 0);
    }

    #[test]
    fn test_malformed_messages_leave_connection_usable() {
        let (registry, binder) = setup();
        let (handle, _rx) = ConnectionHandle::channel();

        for text in ["", "{", "null", r#"{"type":"PING"}"#, r#"{"type":"AUTH","userId":null}"#] {
            assert_eq!(binder.handle_text(&handle, text), BindOutcome::Malformed);
        }
        assert!(handle.is_open());
        assert!(!handle.is_bound());

        // Still bindable afterwards
        let outcome = binder.handle_text(&handle, r#"{"type":"AUTH","userId":"u1"}"#);
        assert_eq!(outcome, BindOutcome::Bound("u1".to_string()));
        assert!(registry.has_live_connections("u1"));
    }

    #[test]
    fn test_second_auth_is_ignored() {
        let (registry, binder) = setup();
        let (handle, _rx) = ConnectionHandle::channel();

        binder.handle_text(&handle, r#"{"type":"AUTH","userId":"u1"}"#);
        let outcome = binder.handle_text(&handle, r#"{"type":"AUTH","userId":"u2"}"#);

        assert_eq!(outcome, BindOutcome::AlreadyBound);
        assert_eq!(handle.identity(), Some("u1"));
        assert!(registry.connections_for("u2").is_empty());
        assert_eq!(registry.connections_for("u1").len(), 1);
    }

    #[test]
    fn test_auth_after_close_is_rejected() {
        let (registry, binder) = setup();
        let (handle, _rx) = ConnectionHandle::channel();
        handle.set_state(ConnectionState::Closing);

        let outcome = binder.handle_text(&handle, r#"{"type":"AUTH","userId":"u1"}"#);

        assert_eq!(outcome, BindOutcome::Rejected);
        assert!(!registry.has_live_connections("u1"));
    }

    #[test]
    fn test_malformed_after_bind_keeps_binding() {
        let (registry, binder) = setup();
        let (handle, _rx) = ConnectionHandle::channel();

        binder.handle_text(&handle, r#"{"type":"AUTH","userId":"u1"}"#);
        binder.handle_text(&handle, "garbage");

        assert_eq!(registry.connections_for("u1").len(), 1);
    }
}
