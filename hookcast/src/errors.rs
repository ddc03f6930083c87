use crate::webhooks::WebhookError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Configuration loaded but is inconsistent
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Webhook URL, header or retry setting rejected
    #[error(transparent)]
    Webhook(#[from] WebhookError),

    /// Configuration could not be read or parsed
    #[error(transparent)]
    Config(#[from] figment::Error),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether the error came from configuration rather than runtime.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig { .. } | Error::Webhook(_) | Error::Config(_))
    }
}
