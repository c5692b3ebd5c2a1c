//! Client error types

use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to the inventory system
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connect, timeout, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Inventory API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// 200 response carrying an application error code
    #[error("Inventory API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode inventory response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The whole drain ran past its deadline
    #[error("Inventory fetch exceeded deadline of {}s", .0.as_secs())]
    DeadlineExceeded(Duration),
}

impl ClientError {
    /// Whether another attempt may succeed: network errors, 429 and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(e) => !e.is_decode() && !e.is_builder(),
            ClientError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Source rejected the credential (401/403)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status: 401 | 403, .. })
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
