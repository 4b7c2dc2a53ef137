use std::sync::Arc;

use serde::Serialize;

use super::broadcaster::{DeliveryResult, EventBroadcaster};
use super::types::{TaskEvent, TaskId, TaskShare};

/// Call boundary for request handlers after a storage mutation has committed.
///
/// Each method broadcasts exactly one event. Task lifecycle events target the
/// task's owner; share events target the recipient, never the sharer. The
/// caller is trusted to pass the right identities.
#[derive(Clone)]
pub struct MutationEmitter {
    broadcaster: Arc<EventBroadcaster>,
}

impl MutationEmitter {
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { broadcaster }
    }

    pub fn task_created<T: Serialize>(&self, owner: &str, task: &T) -> DeliveryResult {
        match serde_json::to_value(task) {
            Ok(record) => self.emit(owner, &TaskEvent::TaskCreated(record)),
            Err(e) => {
                tracing::error!(user_id = %owner, error = %e, "Failed to serialize created task");
                DeliveryResult::default()
            }
        }
    }

    pub fn task_updated<T: Serialize>(&self, owner: &str, task: &T) -> DeliveryResult {
        match serde_json::to_value(task) {
            Ok(record) => self.emit(owner, &TaskEvent::TaskUpdated(record)),
            Err(e) => {
                tracing::error!(user_id = %owner, error = %e, "Failed to serialize updated task");
                DeliveryResult::default()
            }
        }
    }

    pub fn task_deleted(&self, owner: &str, task_id: TaskId) -> DeliveryResult {
        self.emit(owner, &TaskEvent::TaskDeleted { id: task_id })
    }

    pub fn task_shared(&self, share: &TaskShare) -> DeliveryResult {
        self.emit(&share.shared_with, &share.to_event())
    }

    /// Broadcast an already built event to `target`
    pub fn emit(&self, target: &str, event: &TaskEvent) -> DeliveryResult {
        self.broadcaster.broadcast(target, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_manager::{ConnectionHandle, ConnectionRegistry};
    use crate::websocket::OutboundMessage;
    use serde_json::json;

    #[derive(Serialize)]
    struct Task {
        id: TaskId,
        title: String,
        done: bool,
    }

    fn setup() -> (Arc<ConnectionRegistry>, MutationEmitter) {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(EventBroadcaster::new(registry.clone()));
        (registry, MutationEmitter::new(broadcaster))
    }

    fn next_json(
        rx: &mut tokio::sync::mpsc::UnboundedReceiver<OutboundMessage>,
    ) -> serde_json::Value {
        match rx.try_recv().unwrap() {
            OutboundMessage::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_task_created_targets_owner_with_record() {
        let (registry, emitter) = setup();
        let (owner, mut rx) = ConnectionHandle::channel();
        registry.register("owner", &owner);

        let task = Task {
            id: 7,
            title: "Write report".to_string(),
            done: false,
        };
        let result = emitter.task_created("owner", &task);

        assert_eq!(result.delivered, 1);
        assert_eq!(
            next_json(&mut rx),
            json!({
                "type": "TASK_CREATED",
                "payload": {"id": 7, "title": "Write report", "done": false}
            })
        );
    }

    #[test]
    fn test_task_updated_and_deleted() {
        let (registry, emitter) = setup();
        let (owner, mut rx) = ConnectionHandle::channel();
        registry.register("owner", &owner);

        emitter.task_updated("owner", &json!({"id": 7, "done": true}));
        emitter.task_deleted("owner", 7);

        assert_eq!(next_json(&mut rx)["type"], "TASK_UPDATED");
        assert_eq!(next_json(&mut rx), json!({"type": "TASK_DELETED", "payload": {"id": 7}}));
    }

    #[test]
    fn test_task_shared_targets_recipient_not_actor() {
        let (registry, emitter) = setup();
        let (sharer, mut sharer_rx) = ConnectionHandle::channel();
        let (recipient, mut recipient_rx) = ConnectionHandle::channel();
        registry.register("u1", &sharer);
        registry.register("u2", &recipient);

        let result = emitter.task_shared(&TaskShare {
            task_id: 5,
            shared_by: "u1".to_string(),
            shared_with: "u2".to_string(),
        });

        assert_eq!(result.delivered, 1);
        assert_eq!(
            next_json(&mut recipient_rx),
            json!({"type": "TASK_SHARED", "payload": {"taskId": 5, "sharedBy": "u1"}})
        );
        assert!(sharer_rx.try_recv().is_err());
    }
}
