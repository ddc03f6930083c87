//! Fan-out of lifecycle events to multiple notifier backends.
//!
//! ```text
//! orchestrator
//!   └─ MultiNotifier.notify_task_subscribers(task_id)
//!        ├─ join_all ──┬─ WebhookDispatcher  (spawns delivery, returns at once)
//!        │             ├─ push backend
//!        │             └─ other backends
//!        └─ log each failed backend, return Ok
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, join_all};
use metrics::counter;

use super::{Notifier, PushNotifier, TaskSubscribers};
use crate::webhooks::{WebhookConfig, WebhookDispatcher};

/// A backend held by the composer, tagged with what it can do beyond the
/// common [`Notifier`] hooks.
#[derive(Clone)]
pub enum NotifierBackend {
    /// Receives webhook registrations.
    Webhook(Arc<WebhookDispatcher>),
    /// Exposes live subscriber bookkeeping.
    Push {
        notifier: Arc<dyn Notifier>,
        subscribers: TaskSubscribers,
    },
    Other(Arc<dyn Notifier>),
}

impl NotifierBackend {
    pub fn push<N: PushNotifier + 'static>(notifier: Arc<N>) -> Self {
        let subscribers = notifier.task_subscribers();
        Self::Push { notifier, subscribers }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Webhook(_) => "webhook",
            Self::Push { .. } => "push",
            Self::Other(_) => "other",
        }
    }

    fn notifier(&self) -> &dyn Notifier {
        match self {
            Self::Webhook(dispatcher) => dispatcher.as_ref(),
            Self::Push { notifier, .. } => notifier.as_ref(),
            Self::Other(notifier) => notifier.as_ref(),
        }
    }
}

impl std::fmt::Debug for NotifierBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NotifierBackend").field(&self.kind()).finish()
    }
}

/// Broadcasts every lifecycle event to all held backends concurrently.
///
/// The backend list is fixed at construction. A failing backend never stops
/// the others from running or being awaited.
#[derive(Debug)]
pub struct MultiNotifier {
    backends: Vec<NotifierBackend>,
    task_subscribers: Option<TaskSubscribers>,
}

impl MultiNotifier {
    pub fn new(backends: Vec<NotifierBackend>) -> Self {
        let task_subscribers = backends.iter().find_map(|backend| match backend {
            NotifierBackend::Push { subscribers, .. } => Some(subscribers.clone()),
            _ => None,
        });

        Self {
            backends,
            task_subscribers,
        }
    }

    pub fn backends(&self) -> &[NotifierBackend] {
        &self.backends
    }

    /// Subscriber map of the push backend, if one is held.
    pub fn task_subscribers(&self) -> Option<&TaskSubscribers> {
        self.task_subscribers.as_ref()
    }

    /// The first held webhook dispatcher, if any.
    pub fn webhook_dispatcher(&self) -> Option<&Arc<WebhookDispatcher>> {
        self.backends.iter().find_map(|backend| match backend {
            NotifierBackend::Webhook(dispatcher) => Some(dispatcher),
            _ => None,
        })
    }

    /// Route a webhook registration to the webhook backends only.
    pub fn register_webhook(&self, task_id: &str, config: Option<WebhookConfig>) {
        for backend in &self.backends {
            if let NotifierBackend::Webhook(dispatcher) = backend {
                dispatcher.register_webhook(task_id, config.clone());
            }
        }
    }

    /// Run `call` on every backend concurrently and wait for all of them.
    ///
    /// Returns the failures, already logged, in backend order.
    async fn broadcast<'a, F>(&'a self, hook: &'static str, call: F) -> Vec<anyhow::Error>
    where
        F: Fn(&'a dyn Notifier) -> BoxFuture<'a, anyhow::Result<()>>,
    {
        let outcomes = join_all(self.backends.iter().map(|backend| call(backend.notifier()))).await;

        let mut failures = Vec::new();
        for (backend, outcome) in self.backends.iter().zip(outcomes) {
            if let Err(e) = outcome {
                counter!("hookcast_notifier_hook_failures_total", "backend" => backend.kind(), "hook" => hook).increment(1);
                tracing::warn!(backend = backend.kind(), hook, error = %e, "Notifier hook failed");
                failures.push(e);
            }
        }
        failures
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn add_task(&self, task_id: &str) -> anyhow::Result<()> {
        self.broadcast("add_task", |n| n.add_task(task_id)).await;
        Ok(())
    }

    async fn remove_task(&self, task_id: &str) -> anyhow::Result<()> {
        self.broadcast("remove_task", |n| n.remove_task(task_id)).await;
        Ok(())
    }

    async fn notify_task_subscribers(&self, task_id: &str) -> anyhow::Result<()> {
        self.broadcast("notify_task_subscribers", |n| n.notify_task_subscribers(task_id))
            .await;
        Ok(())
    }

    async fn notify_queue_positions(&self) -> anyhow::Result<()> {
        self.broadcast("notify_queue_positions", |n| n.notify_queue_positions()).await;
        Ok(())
    }
}
