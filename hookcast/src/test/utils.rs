//! Test doubles shared by unit and end-to-end tests
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Barrier;
use uuid::Uuid;

use crate::notifications::{Notifier, PushNotifier, TaskSubscribers};
use crate::orchestrator::{Orchestrator, Task};
use crate::webhooks::http::{HttpClient, HttpRequest, HttpResponse};

/// A request seen by [`MockHttpClient`], with the (tokio) time it arrived.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: HttpRequest,
    pub at: tokio::time::Instant,
}

/// Scripted [`HttpClient`]: replays queued outcomes, then answers with a fixed status.
pub struct MockHttpClient {
    default_status: u16,
    delay: Option<Duration>,
    scripted: Mutex<VecDeque<Result<u16, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockHttpClient {
    pub fn with_status(status: u16) -> Self {
        Self {
            default_status: status,
            delay: None,
            scripted: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_status(&self, status: u16) {
        self.scripted.lock().push_back(Ok(status));
    }

    pub fn push_error(&self, error: &str) {
        self.scripted.lock().push_back(Err(error.to_string()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: &HttpRequest, _timeout: Duration) -> anyhow::Result<HttpResponse> {
        self.calls.lock().push(RecordedCall {
            request: request.clone(),
            at: tokio::time::Instant::now(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.scripted.lock().pop_front().unwrap_or(Ok(self.default_status));
        match outcome {
            Ok(status) => Ok(HttpResponse {
                status,
                body: String::new(),
            }),
            Err(e) => Err(anyhow::anyhow!(e)),
        }
    }
}

/// Orchestrator whose lookups always fail.
pub struct FailingOrchestrator;

#[async_trait]
impl Orchestrator for FailingOrchestrator {
    async fn task_status(&self, task_id: &str) -> anyhow::Result<Task> {
        anyhow::bail!("orchestrator unavailable while loading {}", task_id)
    }
}

/// Notifier that records every hook call, optionally failing each one.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<String>>,
    fail: bool,
    barrier: Option<Arc<Barrier>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Make every hook wait on `barrier` before returning.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn record(&self, call: String) -> anyhow::Result<()> {
        self.calls.lock().push(call);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail {
            anyhow::bail!("backend unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn add_task(&self, task_id: &str) -> anyhow::Result<()> {
        self.record(format!("add_task:{task_id}")).await
    }

    async fn remove_task(&self, task_id: &str) -> anyhow::Result<()> {
        self.record(format!("remove_task:{task_id}")).await
    }

    async fn notify_task_subscribers(&self, task_id: &str) -> anyhow::Result<()> {
        self.record(format!("notify_task_subscribers:{task_id}")).await
    }

    async fn notify_queue_positions(&self) -> anyhow::Result<()> {
        self.record("notify_queue_positions".to_string()).await
    }
}

/// Push backend stand-in with real subscriber bookkeeping.
pub struct FakePushNotifier {
    subscribers: TaskSubscribers,
    inner: RecordingNotifier,
}

impl FakePushNotifier {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            inner: RecordingNotifier::new(),
        }
    }

    pub fn subscribe(&self, task_id: &str, subscriber: Uuid) {
        self.subscribers
            .entry(task_id.to_string())
            .or_insert_with(HashSet::new)
            .insert(subscriber);
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.calls()
    }
}

#[async_trait]
impl Notifier for FakePushNotifier {
    async fn add_task(&self, task_id: &str) -> anyhow::Result<()> {
        self.inner.add_task(task_id).await
    }

    async fn remove_task(&self, task_id: &str) -> anyhow::Result<()> {
        self.subscribers.remove(task_id);
        self.inner.remove_task(task_id).await
    }

    async fn notify_task_subscribers(&self, task_id: &str) -> anyhow::Result<()> {
        self.inner.notify_task_subscribers(task_id).await
    }

    async fn notify_queue_positions(&self) -> anyhow::Result<()> {
        self.inner.notify_queue_positions().await
    }
}

impl PushNotifier for FakePushNotifier {
    fn task_subscribers(&self) -> TaskSubscribers {
        self.subscribers.clone()
    }
}
