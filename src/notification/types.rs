use serde::{Deserialize, Serialize};

/// Task identifier as issued by the storage layer
pub type TaskId = i64;

/// Event pushed to clients after a committed task mutation.
///
/// Wire shape is `{"type":"<KIND>","payload":<json>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskEvent {
    /// Payload is the created task record
    TaskCreated(serde_json::Value),
    /// Payload is the updated task record
    TaskUpdated(serde_json::Value),
    TaskDeleted {
        id: TaskId,
    },
    TaskShared {
        #[serde(rename = "taskId")]
        task_id: TaskId,
        #[serde(rename = "sharedBy")]
        shared_by: String,
    },
}

impl TaskEvent {
    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskCreated(_) => "TASK_CREATED",
            Self::TaskUpdated(_) => "TASK_UPDATED",
            Self::TaskDeleted { .. } => "TASK_DELETED",
            Self::TaskShared { .. } => "TASK_SHARED",
        }
    }
}

/// A committed share of a task with another user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskShare {
    pub task_id: TaskId,
    /// Identity of the user who performed the share
    pub shared_by: String,
    /// Identity of the recipient
    pub shared_with: String,
}

impl TaskShare {
    pub fn to_event(&self) -> TaskEvent {
        TaskEvent::TaskShared {
            task_id: self.task_id,
            shared_by: self.shared_by.clone(),
        }
    }
}
