//! Webhook target configuration.
//!
//! A [`WebhookConfig`] describes where and how to deliver a task's completion
//! payload. The service holds one default config; a task may replace its URL
//! and secret with a [`WebhookOverride`]. Both are checked against a
//! [`UrlPolicy`] at the moment they are set, so a disallowed endpoint never
//! reaches the dispatcher.

use std::collections::BTreeMap;
use std::time::Duration;

use bon::Builder;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use super::WebhookError;

/// HTTP method used to invoke the webhook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookMethod {
    #[default]
    Post,
    Put,
    Patch,
}

impl WebhookMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
        }
    }
}

impl std::fmt::Display for WebhookMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WebhookMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            _ => Err(format!("Unsupported webhook method: {}", s)),
        }
    }
}

impl From<WebhookMethod> for reqwest::Method {
    fn from(method: WebhookMethod) -> Self {
        match method {
            WebhookMethod::Post => reqwest::Method::POST,
            WebhookMethod::Put => reqwest::Method::PUT,
            WebhookMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Check a webhook URL against host and scheme allow-lists.
///
/// An empty list places no restriction on that component.
pub fn validate_webhook_url(url: &Url, allowed_hosts: &[String], allowed_schemes: &[String]) -> Result<(), WebhookError> {
    let scheme = url.scheme();
    if !allowed_schemes.is_empty() && !allowed_schemes.iter().any(|s| s == scheme) {
        return Err(WebhookError::SchemeNotAllowed {
            scheme: scheme.to_string(),
            allowed: allowed_schemes.join(", "),
        });
    }

    if !allowed_hosts.is_empty() {
        let host = match url.host() {
            // host_str() keeps the brackets around IPv6 literals
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => String::new(),
        };
        if !allowed_hosts.iter().any(|h| *h == host) {
            return Err(WebhookError::HostNotAllowed { host });
        }
    }

    Ok(())
}

/// Schemes a webhook can be delivered over, whatever the allow-lists say.
const DELIVERABLE_SCHEMES: [&str; 2] = ["http", "https"];

fn check_deliverable(url: &Url) -> Result<(), WebhookError> {
    if DELIVERABLE_SCHEMES.contains(&url.scheme()) {
        return Ok(());
    }
    Err(WebhookError::SchemeNotAllowed {
        scheme: url.scheme().to_string(),
        allowed: DELIVERABLE_SCHEMES.join(", "),
    })
}

/// Allow-lists applied to every configured or overridden webhook URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPolicy {
    pub allowed_hosts: Vec<String>,
    pub allowed_schemes: Vec<String>,
}

impl UrlPolicy {
    pub fn new(allowed_hosts: Vec<String>, allowed_schemes: Vec<String>) -> Self {
        Self {
            allowed_hosts,
            allowed_schemes,
        }
    }

    pub fn check(&self, url: &Url) -> Result<(), WebhookError> {
        validate_webhook_url(url, &self.allowed_hosts, &self.allowed_schemes)
    }
}

/// Webhook delivery configuration.
///
/// Treat as immutable once validated: the dispatcher stores its own copy per
/// task and never changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    /// Callback endpoint. Webhooks are disabled when unset.
    pub url: Option<Url>,
    #[builder(default)]
    pub method: WebhookMethod,
    /// Shared secret used to sign the payload
    pub secret: Option<String>,
    /// Extra request headers. Generated headers win on a name clash.
    #[builder(default)]
    pub headers: BTreeMap<String, String>,
    /// Retries after the first failed attempt (default: 0)
    #[builder(default)]
    pub max_retries: u32,
    /// Seconds to wait before the first retry; doubles on each subsequent one (default: 1.0)
    #[builder(default = 1.0)]
    pub backoff_factor: f64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            method: WebhookMethod::default(),
            secret: None,
            headers: BTreeMap::new(),
            max_retries: 0,
            backoff_factor: 1.0,
        }
    }
}

impl WebhookConfig {
    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Validate the URL against `policy` and the retry policy for sanity.
    pub fn validated(self, policy: &UrlPolicy) -> Result<Self, WebhookError> {
        if let Some(url) = &self.url {
            policy.check(url)?;
            check_deliverable(url)?;
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(WebhookError::InvalidBackoff(self.backoff_factor));
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| WebhookError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            HeaderValue::from_str(value).map_err(|e| WebhookError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(self)
    }

    /// Effective configuration for a task that supplied `over`.
    ///
    /// The URL is replaced, the secret only when the override carries one.
    /// Method, headers and retry policy are inherited.
    pub fn with_override(&self, over: &WebhookOverride) -> Self {
        Self {
            url: Some(over.url.clone()),
            secret: over.secret.clone().or_else(|| self.secret.clone()),
            ..self.clone()
        }
    }

    /// Total number of delivery attempts.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after the zero-based `attempt` failed: `backoff_factor * 2^attempt` seconds.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = if self.backoff_factor.is_finite() {
            self.backoff_factor.max(0.0)
        } else {
            0.0
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(factor * 2f64.powi(exponent)).unwrap_or(Duration::MAX)
    }
}

/// Per-task replacement of the default webhook target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookOverride {
    pub url: Url,
    #[serde(default)]
    pub secret: Option<String>,
}

impl WebhookOverride {
    pub fn new(url: Url, secret: Option<String>) -> Self {
        Self { url, secret }
    }

    /// Overrides are validated on their own, independent of the default config.
    pub fn validated(self, policy: &UrlPolicy) -> Result<Self, WebhookError> {
        policy.check(&self.url)?;
        check_deliverable(&self.url)?;
        Ok(self)
    }
}
