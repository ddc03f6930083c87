//! The orchestrator's view of tasks, as consumed by notifiers.
//!
//! The orchestrator owns task state; notifiers only read snapshots of it
//! through the [`Orchestrator`] trait when a lifecycle hook fires.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Started,
    Success,
    Failure,
}

impl TaskStatus {
    /// Whether no further processing will occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "started" => Ok(Self::Started),
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// Kind of work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Convert,
    Chunk,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Convert => "convert",
            Self::Chunk => "chunk",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "convert" => Ok(Self::Convert),
            "chunk" => Ok(Self::Chunk),
            _ => Err(format!("Unknown task type: {}", s)),
        }
    }
}

/// Document counters reported by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingMeta {
    pub num_docs: u64,
    pub num_processed: u64,
    pub num_succeeded: u64,
    pub num_failed: u64,
}

/// Snapshot of a task at the time it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub task_type: TaskType,
    pub task_status: TaskStatus,
    pub processing_meta: ProcessingMeta,
}

impl Task {
    pub fn new(task_id: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            task_id: task_id.into(),
            task_type,
            task_status: TaskStatus::Pending,
            processing_meta: ProcessingMeta::default(),
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task_status = status;
        self
    }

    pub fn with_meta(mut self, meta: ProcessingMeta) -> Self {
        self.processing_meta = meta;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.task_status.is_terminal()
    }
}

/// Read access to task state, implemented by the task orchestrator.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Fetch the current state of a task.
    async fn task_status(&self, task_id: &str) -> anyhow::Result<Task>;

    /// Best-effort lookup of where the task's result is stored.
    fn result_locator(&self, _task_id: &str) -> Option<String> {
        None
    }
}

/// Orchestrator backed by an in-process map.
///
/// Used by the `--send-test` command and in tests.
#[derive(Debug, Default)]
pub struct InMemoryOrchestrator {
    tasks: DashMap<String, Task>,
    result_keys: DashMap<String, String>,
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a task snapshot.
    pub fn upsert(&self, task: Task) {
        self.tasks.insert(task.task_id.clone(), task);
    }

    pub fn set_status(&self, task_id: &str, status: TaskStatus) {
        if let Some(mut task) = self.tasks.get_mut(task_id) {
            task.task_status = status;
        }
    }

    pub fn set_result_locator(&self, task_id: &str, locator: impl Into<String>) {
        self.result_keys.insert(task_id.to_string(), locator.into());
    }
}

#[async_trait]
impl Orchestrator for InMemoryOrchestrator {
    async fn task_status(&self, task_id: &str) -> anyhow::Result<Task> {
        self.tasks
            .get(task_id)
            .map(|task| task.value().clone())
            .ok_or_else(|| anyhow::anyhow!("Task {} not found", task_id))
    }

    fn result_locator(&self, task_id: &str) -> Option<String> {
        self.result_keys.get(task_id).map(|key| key.value().clone())
    }
}
