//! Webhook payload builder.
//!
//! The payload is derived from the orchestrator's task snapshot at dispatch
//! time and never stored.

use serde::{Deserialize, Serialize};

use crate::orchestrator::{ProcessingMeta, Task};

/// Body sent to the webhook endpoint when a task reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub task_id: String,
    /// Plain status string, e.g. "success"
    pub status: String,
    /// Plain task type string, e.g. "convert"
    #[serde(rename = "type")]
    pub task_type: String,
    pub processing_meta: ProcessingMeta,
    /// Where the result can be fetched, if the orchestrator knows
    pub result_locator: Option<String>,
}

impl WebhookPayload {
    /// Build the payload for a task snapshot.
    pub fn from_task(task: &Task, result_locator: Option<String>) -> Self {
        Self {
            task_id: task.task_id.clone(),
            status: task.task_status.to_string(),
            task_type: task.task_type.to_string(),
            processing_meta: task.processing_meta.clone(),
            result_locator,
        }
    }
}
