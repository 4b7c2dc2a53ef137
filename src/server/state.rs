use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Settings;
use crate::connection_manager::ConnectionRegistry;
use crate::notification::{EventBroadcaster, MutationEmitter};
use crate::websocket::IdentityBinder;

/// Shared application state.
///
/// One registry per state; the accept path (via the binder) and the mutation
/// emitters both hold the same instance.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<ConnectionRegistry>,
    pub binder: IdentityBinder,
    pub broadcaster: Arc<EventBroadcaster>,
    pub emitter: MutationEmitter,
    /// Fired once at shutdown; every connection task closes its socket on it
    pub shutdown: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let binder = IdentityBinder::new(registry.clone());
        let broadcaster = Arc::new(EventBroadcaster::new(registry.clone()));
        let emitter = MutationEmitter::new(broadcaster.clone());
        let (shutdown, _) = broadcast::channel(1);

        Self {
            settings: Arc::new(settings),
            registry,
            binder,
            broadcaster,
            emitter,
            shutdown,
        }
    }
}
