//! Webhook dispatch: register, claim, sign, send, retry.
//!
//! ```text
//! register_webhook(task_id, config)          // stored per task
//!
//! notify_task_subscribers(task_id)
//!   ├─ no config / already dispatched ──────► return
//!   ├─ orchestrator.task_status()            // error or not terminal ► return
//!   ├─ dispatched.insert(task_id)            // single winner per task
//!   └─ tracker.spawn(deliver) ───────────────┐
//!                                            ▼
//!      deliver (tracked background task):
//!        ├─ serialize payload once, take timestamp, sign
//!        └─ for attempt in 0..=max_retries:
//!             ├─ HTTP request (10s timeout)
//!             ├─ 2xx → done
//!             └─ else → sleep(backoff_factor * 2^attempt)
//! ```
//!
//! Delivery is best-effort and at-most-once per task per process: nothing is
//! persisted and the orchestrator never hears about delivery failures.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use metrics::counter;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tokio_util::task::TaskTracker;

use crate::notifications::Notifier;
use crate::orchestrator::Orchestrator;
use crate::webhooks::config::WebhookConfig;
use crate::webhooks::events::WebhookPayload;
use crate::webhooks::http::{HttpClient, HttpRequest};
use crate::webhooks::signing::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Per-attempt HTTP timeout unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends signed webhook callbacks when tasks reach a terminal state.
pub struct WebhookDispatcher {
    orchestrator: Arc<dyn Orchestrator>,
    http_client: Arc<dyn HttpClient>,
    request_timeout: Duration,
    configs: DashMap<String, WebhookConfig>,
    dispatched: DashSet<String>,
    tracker: TaskTracker,
}

impl WebhookDispatcher {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            orchestrator,
            http_client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            configs: DashMap::new(),
            dispatched: DashSet::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Store or replace the webhook for a task. `None` (or a config without a
    /// URL) means the task has no webhook and leaves any registration as is.
    pub fn register_webhook(&self, task_id: &str, config: Option<WebhookConfig>) {
        let Some(config) = config.filter(WebhookConfig::is_enabled) else {
            return;
        };
        tracing::debug!(task_id = %task_id, "Registered webhook");
        self.configs.insert(task_id.to_string(), config);
    }

    pub fn is_registered(&self, task_id: &str) -> bool {
        self.configs.contains_key(task_id)
    }

    /// Whether a delivery sequence has been started for the task.
    pub fn is_dispatched(&self, task_id: &str) -> bool {
        self.dispatched.contains(task_id)
    }

    /// Number of delivery sequences still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every running delivery sequence to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[async_trait]
impl Notifier for WebhookDispatcher {
    async fn add_task(&self, task_id: &str) -> anyhow::Result<()> {
        // Task ids are reused on resubmission
        self.dispatched.remove(task_id);
        Ok(())
    }

    async fn remove_task(&self, task_id: &str) -> anyhow::Result<()> {
        self.configs.remove(task_id);
        self.dispatched.remove(task_id);
        Ok(())
    }

    async fn notify_task_subscribers(&self, task_id: &str) -> anyhow::Result<()> {
        let Some(config) = self.configs.get(task_id).map(|entry| entry.value().clone()) else {
            return Ok(());
        };
        if self.dispatched.contains(task_id) {
            return Ok(());
        }

        let task = match self.orchestrator.task_status(task_id).await {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Failed to load task for webhook");
                return Ok(());
            }
        };

        if !task.is_completed() {
            tracing::debug!(task_id = %task_id, status = %task.task_status, "Task not terminal yet, webhook deferred");
            return Ok(());
        }

        let payload = WebhookPayload::from_task(&task, self.orchestrator.result_locator(task_id));

        // A concurrent notification may have won while we were fetching the task
        if !self.dispatched.insert(task_id.to_string()) {
            return Ok(());
        }

        counter!("hookcast_webhook_dispatches_total").increment(1);
        self.tracker.spawn(deliver(
            self.http_client.clone(),
            self.request_timeout,
            task_id.to_string(),
            config,
            payload,
        ));

        Ok(())
    }

    async fn notify_queue_positions(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Compose request headers: custom headers first, then the generated ones,
/// which replace any custom header of the same name.
fn build_headers(custom: &BTreeMap<String, String>, timestamp: i64, signature: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in custom {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid custom webhook header"),
        }
    }

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(HeaderName::from_static(TIMESTAMP_HEADER), HeaderValue::from(timestamp));
    if let Some(signature) = signature.and_then(|s| HeaderValue::from_str(s).ok()) {
        headers.insert(HeaderName::from_static(SIGNATURE_HEADER), signature);
    }

    headers
}

/// One delivery sequence: up to `max_retries + 1` strictly sequential attempts.
async fn deliver(
    http_client: Arc<dyn HttpClient>,
    request_timeout: Duration,
    task_id: String,
    config: WebhookConfig,
    payload: WebhookPayload,
) {
    let Some(url) = config.url.clone() else {
        return;
    };

    // Serialized once; every attempt sends the same bytes
    let body = match serde_json::to_vec(&payload) {
        Ok(body) => Bytes::from(body),
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "Failed to serialize webhook payload");
            return;
        }
    };

    let timestamp = Utc::now().timestamp();
    // An empty secret counts as no secret
    let signature = config
        .secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .and_then(|secret| signing::sign_payload(timestamp, &body, secret));

    let request = HttpRequest {
        method: config.method.into(),
        url,
        headers: build_headers(&config.headers, timestamp, signature.as_deref()),
        body,
    };

    let attempts = config.attempts();
    for attempt in 0..attempts {
        tracing::debug!(task_id = %task_id, url = %request.url, attempt = attempt + 1, "Sending webhook HTTP request");

        match http_client.execute(&request, request_timeout).await {
            Ok(response) if response.is_success() => {
                counter!("hookcast_webhook_deliveries_total", "outcome" => "success").increment(1);
                tracing::info!(task_id = %task_id, status = response.status, "Webhook delivered successfully");
                return;
            }
            Ok(response) => {
                tracing::warn!(
                    task_id = %task_id,
                    status = response.status,
                    attempt = attempt + 1,
                    body = %response.body,
                    "Webhook delivery failed"
                );
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, attempt = attempt + 1, error = %e, "Webhook delivery failed (network error)");
            }
        }

        if attempt + 1 < attempts {
            let delay = config.backoff_delay(attempt);
            tracing::debug!(task_id = %task_id, delay = ?delay, "Backing off before webhook retry");
            tokio::time::sleep(delay).await;
        }
    }

    counter!("hookcast_webhook_deliveries_total", "outcome" => "exhausted").increment(1);
    tracing::error!(task_id = %task_id, attempts, signed = signature.is_some(), "Exhausted webhook retries");
}
