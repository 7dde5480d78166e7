//! Error types for chore modelling and synchronization.
//!
//! Every failure surfaces to the caller unchanged; nothing in this crate
//! retries or recovers locally.

use thiserror::Error;

/// Errors produced by the chore model and the synchronization service.
#[derive(Error, Debug)]
pub enum ChoreError {
    /// A duration, timestamp, or server payload could not be decoded.
    #[error("format error: {0}")]
    Format(String),

    /// The targeted chore (or one of its sub-resources) does not exist.
    #[error("chore not found: {0}")]
    NotFound(String),

    /// A chore with the same name already exists.
    #[error("chore already exists: {0}")]
    Conflict(String),

    /// A structural problem detected locally.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Opaque failure from the transport or the remote server.
    #[error("transport error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        /// HTTP status when a response was received.
        status: Option<u16>,
        /// Server error text or the underlying client error.
        message: String,
    },
}

/// Result type alias for chore operations.
pub type ChoreResult<T> = Result<T, ChoreError>;

impl ChoreError {
    /// Create a transport error for a failed HTTP exchange.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Whether this error reports a missing chore.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error reports a name clash on create.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<reqwest::Error> for ChoreError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        if err.is_timeout() {
            Self::transport(status, format!("Request timed out: {err}"))
        } else if err.is_connect() {
            Self::transport(status, format!("Connection failed: {err}"))
        } else {
            Self::transport(status, err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err.to_string())
    }
}
