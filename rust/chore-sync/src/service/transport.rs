//! Transport seam between the chore service and the planning server.
//!
//! The service only ever talks to the server through [`RestTransport`].
//! Authentication, sessions, timeouts and connection reuse belong to the
//! implementation; [`super::http::HttpTransport`] is the reqwest-backed one.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::ChoreResult;

/// Raw answer from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body, `None` for empty bodies.
    pub body: Option<Value>,
}

impl RestResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// Create a bodiless response.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human-readable error text from an OData error body.
    ///
    /// Prefers `error.message`, then a plain string body, then the whole
    /// body rendered as JSON.
    pub fn error_message(&self) -> String {
        match &self.body {
            Some(body) => body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .or_else(|| body.as_str())
                .map_or_else(|| body.to_string(), str::to_string),
            None => format!("HTTP {}", self.status),
        }
    }
}

/// Authenticated request/response channel keyed by resource path.
///
/// Implementations return `Ok` for every response the server sends,
/// whatever its status; mapping statuses to errors is the caller's job.
/// `Err` is reserved for failures where no response was obtained.
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// Send `method` to `path` (relative to the REST root, starting with
    /// `/`) with an optional JSON body.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ChoreResult<RestResponse>;
}
