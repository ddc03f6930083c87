//! # hookcast: Task Completion Notifications
//!
//! `hookcast` tells the outside world when document-processing tasks finish. A task orchestrator
//! raises lifecycle events (task added, state changed, task removed, queue moved) and hookcast
//! fans each event out to every configured notifier backend: an outbound webhook dispatcher, a
//! real-time push channel, or anything else implementing [`Notifier`].
//!
//! ## Overview
//!
//! The orchestrator holds exactly one [`MultiNotifier`]. Each lifecycle call is broadcast to all
//! backends concurrently; a failing backend is logged and never stops the others or the caller.
//!
//! The [`WebhookDispatcher`] backend keeps a webhook target per task. When a registered task
//! reaches a terminal state it builds a JSON payload, signs it with HMAC-SHA256 if a secret is
//! configured, and delivers it in a background task with exponential-backoff retries. A task is
//! delivered at most once per registration, no matter how many times its subscribers are notified.
//!
//! ### Core Components
//!
//! - [`webhooks`]: target configuration, URL allow-lists, signing, payloads, the HTTP seam and
//!   the dispatcher
//! - [`notifications`]: the [`Notifier`] contract and the fan-out composer
//! - [`orchestrator`]: task state as seen by notifiers, plus an in-memory orchestrator
//! - [`config`]: YAML + environment configuration (see [`Config`])
//! - [`telemetry`]: tracing setup
//!
//! ## Receiving webhooks
//!
//! Receivers verify the `x-docling-signature` header by recomputing
//! `hex(HMAC-SHA256(secret, "{x-docling-timestamp}.{body}"))`; see
//! [`webhooks::verify_signature`].

pub mod config;
pub mod errors;
pub mod notifications;
pub mod orchestrator;
pub mod telemetry;
pub mod webhooks;

#[cfg(test)]
mod test;

pub use config::Config;
pub use errors::Error;
pub use notifications::{MultiNotifier, Notifier, NotifierBackend, PushNotifier, TaskSubscribers};
pub use orchestrator::{InMemoryOrchestrator, Orchestrator, ProcessingMeta, Task, TaskStatus, TaskType};
pub use webhooks::{WebhookConfig, WebhookDispatcher, WebhookError, WebhookOverride, WebhookPayload};
