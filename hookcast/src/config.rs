//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `HOOKCAST_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `HOOKCAST_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `HOOKCAST_WEBHOOK__MAX_RETRIES=3` sets the `webhook.max_retries` field.
//!
//! ## Example
//!
//! ```yaml
//! webhook:
//!   url: https://hooks.example.com/docling
//!   method: POST
//!   secret: change-me
//!   headers:
//!     X-Team: docs
//!   max_retries: 2
//!   backoff_factor: 1.0
//! allowed_hosts: [hooks.example.com]
//! allowed_schemes: [https]
//! delivery:
//!   request_timeout: 10s
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Error;
use crate::webhooks::dispatcher::DEFAULT_REQUEST_TIMEOUT;
use crate::webhooks::{UrlPolicy, WebhookConfig, WebhookError, WebhookOverride};

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "HOOKCAST_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit.
    #[arg(long)]
    pub validate: bool,

    /// Deliver a test notification for a synthetic completed task with this id
    /// to the configured default webhook, then exit.
    #[arg(long, value_name = "TASK_ID")]
    pub send_test: Option<String>,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default webhook applied to tasks that don't bring their own
    pub webhook: WebhookConfig,
    /// Hosts webhook URLs may point at. Empty allows any host.
    pub allowed_hosts: Vec<String>,
    /// Schemes webhook URLs may use. Empty allows any scheme.
    pub allowed_schemes: Vec<String>,
    pub delivery: DeliveryConfig,
}

/// HTTP delivery settings shared by all webhooks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Timeout for each delivery attempt (default: 10s)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // HOOKCAST_CONFIG names the file, it is not a config key
            .merge(Env::prefixed("HOOKCAST_").ignore(&["config"]).split("__"))
    }

    pub fn url_policy(&self) -> UrlPolicy {
        UrlPolicy::new(self.allowed_hosts.clone(), self.allowed_schemes.clone())
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        self.webhook.clone().validated(&self.url_policy())?;

        if self.delivery.request_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                message: "delivery.request_timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Effective webhook for a new task.
    ///
    /// An override is validated against the allow-lists and applied on top of
    /// the default. Without one, the default is used if it has a URL.
    pub fn task_webhook(&self, over: Option<WebhookOverride>) -> Result<Option<WebhookConfig>, WebhookError> {
        match over {
            Some(over) => {
                let over = over.validated(&self.url_policy())?;
                Ok(Some(self.webhook.with_override(&over)))
            }
            None => Ok(Some(self.webhook.clone()).filter(WebhookConfig::is_enabled)),
        }
    }
}
