//! Webhook notification system for task completion events.
//!
//! - [`config`]: Target configuration, per-task overrides and URL allow-lists
//! - [`signing`]: HMAC-SHA256 signature generation and verification
//! - [`events`]: Payload sent to the webhook endpoint
//! - [`http`]: Transport seam between the dispatcher and the HTTP client
//! - [`dispatcher`]: Registration bookkeeping and the sign/send/retry loop

pub mod config;
pub mod dispatcher;
pub mod events;
pub mod http;
pub mod signing;

pub use config::{UrlPolicy, WebhookConfig, WebhookMethod, WebhookOverride, validate_webhook_url};
pub use dispatcher::WebhookDispatcher;
pub use events::WebhookPayload;
pub use http::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use signing::{sign_payload, verify_signature};

/// Errors raised while configuring a webhook.
///
/// These block the configuration from taking effect. Delivery failures are
/// never surfaced as errors; the dispatcher logs and retries them.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook URL scheme '{scheme}' is not allowed. Allowed schemes: {allowed}.")]
    SchemeNotAllowed { scheme: String, allowed: String },

    #[error("Webhook host '{host}' is not in the allowed host list.")]
    HostNotAllowed { host: String },

    #[error("Webhook backoff factor must be a finite number >= 0, got {0}")]
    InvalidBackoff(f64),

    #[error("Invalid webhook header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}
