//! Error types for the Kairos client

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error taxonomy
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response from the API (connect failure, timeout, reset)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Server error {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Server { status: u16, detail: Option<String> },

    /// The response body was not the JSON we expected
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A local precondition failed before anything was sent
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The caller stopped waiting before the API answered
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn precondition(message: impl Into<String>) -> Self {
        ClientError::Precondition(message.into())
    }

    /// HTTP status for server-reported failures
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable detail supplied by the server, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// Transport failures and 5xx responses are worth one more read attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
