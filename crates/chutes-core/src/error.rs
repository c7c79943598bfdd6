use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::OperationFamily;

pub type Result<T> = std::result::Result<T, Error>;

/// Retry bookkeeping attached to transport results and errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryMetadata {
    /// Number of retries performed (0 when the first attempt was final)
    pub attempts: u32,
    /// Delay slept before each retry, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delays: Vec<Duration>,
}

impl RetryMetadata {
    pub fn record(&mut self, delay: Duration) {
        self.attempts += 1;
        self.delays.push(delay);
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Operation '{family}' is not available for chute {base_url}")]
    UnsupportedOperation {
        family: OperationFamily,
        base_url: String,
    },

    #[error("Rate limited after {} retries: {message}", .retries.attempts)]
    RateLimited {
        message: String,
        retries: RetryMetadata,
    },

    #[error("Chute rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        retries: RetryMetadata,
    },

    #[error("Chute unavailable{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Unavailable {
        status: Option<u16>,
        message: String,
        retries: RetryMetadata,
    },

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use chutes_core::Error;
    /// let err = Error::config_error("base_url is missing");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating general errors with a message
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }

    /// Whether the transport layer would retry this error on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// HTTP status reported by the chute, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RateLimited { .. } => Some(429),
            Error::Rejected { status, .. } => Some(*status),
            Error::Unavailable { status, .. } => *status,
            _ => None,
        }
    }

    /// Retry metadata for transport errors.
    pub fn retries(&self) -> Option<&RetryMetadata> {
        match self {
            Error::RateLimited { retries, .. }
            | Error::Rejected { retries, .. }
            | Error::Unavailable { retries, .. } => Some(retries),
            _ => None,
        }
    }

    /// Classify a non-success HTTP status into the error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>, retries: RetryMetadata) -> Self {
        let message = message.into();
        match status {
            429 => Error::RateLimited { message, retries },
            400..=499 => Error::Rejected {
                status,
                message,
                retries,
            },
            _ => Error::Unavailable {
                status: Some(status),
                message,
                retries,
            },
        }
    }
}

/// Pull a human readable message out of an error body.
///
/// Chutes are mostly FastAPI apps, so `detail` comes first; plain text bodies
/// are returned as-is.
pub fn error_message_from_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body).trim().to_string();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        for key in ["detail", "error", "message"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(serde_json::Value::Object(obj)) => {
                    if let Some(serde_json::Value::String(s)) = obj.get("message") {
                        return s.clone();
                    }
                }
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        text
    }
}
