//! Task lifecycle notifications.
//!
//! Notifier backends react to task lifecycle events raised by the
//! orchestrator. The orchestrator only ever holds a [`MultiNotifier`], which
//! broadcasts each event to every backend it was built with.
//!
//! - [`Notifier`]: the contract every backend (and the composer) implements
//! - [`PushNotifier`]: a backend that also tracks live subscribers per task
//! - [`fanout`]: the composer and the tagged backend list it holds

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

pub mod fanout;

pub use fanout::{MultiNotifier, NotifierBackend};

/// Live subscribers of a push channel, keyed by task id.
pub type TaskSubscribers = Arc<DashMap<String, HashSet<Uuid>>>;

/// Task lifecycle hooks called by the orchestrator.
///
/// Backends should log their own failures. An `Err` is reported by the
/// composer and never reaches the orchestrator.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A task was submitted (or resubmitted under the same id).
    async fn add_task(&self, task_id: &str) -> anyhow::Result<()>;

    /// A task and everything tracked for it should be forgotten.
    async fn remove_task(&self, task_id: &str) -> anyhow::Result<()>;

    /// The task's state changed; subscribers may need to hear about it.
    async fn notify_task_subscribers(&self, task_id: &str) -> anyhow::Result<()>;

    /// Queue positions of pending tasks changed.
    async fn notify_queue_positions(&self) -> anyhow::Result<()>;
}

/// A real-time push backend (e.g. websockets).
pub trait PushNotifier: Notifier {
    /// Handle to the backend's live subscriber bookkeeping.
    fn task_subscribers(&self) -> TaskSubscribers;
}
