use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::notification::{DeliveryResult, TaskEvent, TaskShare};
use crate::server::AppState;

/// Request to deliver one committed mutation event to a user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitEventRequest {
    /// Identity whose connections receive the event
    pub target_user_id: String,
    /// The event, in its wire shape
    pub event: TaskEvent,
}

/// Response for event emit operations
#[derive(Debug, Serialize)]
pub struct EmitEventResponse {
    /// The event was accepted; delivery itself is best effort
    pub success: bool,
    /// Connections the event was queued to
    pub delivered: usize,
    /// Connections skipped because they were closing
    pub skipped: usize,
    /// Timestamp of the operation
    pub timestamp: DateTime<Utc>,
}

impl From<DeliveryResult> for EmitEventResponse {
    fn from(result: DeliveryResult) -> Self {
        Self {
            success: true,
            delivered: result.delivered,
            skipped: result.skipped,
            timestamp: Utc::now(),
        }
    }
}

/// POST /api/v1/events - broadcast an event to the target user's connections
#[tracing::instrument(
    name = "trigger.emit_event",
    skip(state, request),
    fields(user_id = %request.target_user_id, kind = request.event.kind())
)]
pub async fn emit_event(
    State(state): State<AppState>,
    Json(request): Json<EmitEventRequest>,
) -> Result<Json<EmitEventResponse>> {
    if request.target_user_id.is_empty() {
        return Err(AppError::Validation("targetUserId must not be empty".to_string()));
    }

    let result = state.emitter.emit(&request.target_user_id, &request.event);
    Ok(Json(result.into()))
}

/// POST /api/v1/events/task-shared - notify the recipient of a share
#[tracing::instrument(
    name = "trigger.task_shared",
    skip(state, share),
    fields(task_id = share.task_id, shared_with = %share.shared_with)
)]
pub async fn emit_task_shared(
    State(state): State<AppState>,
    Json(share): Json<TaskShare>,
) -> Result<Json<EmitEventResponse>> {
    if share.shared_with.is_empty() || share.shared_by.is_empty() {
        return Err(AppError::Validation(
            "sharedBy and sharedWith must not be empty".to_string(),
        ));
    }

    let result = state.emitter.task_shared(&share);
    Ok(Json(result.into()))
}
