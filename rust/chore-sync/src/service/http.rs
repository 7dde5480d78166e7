//! reqwest-backed [`RestTransport`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;

use super::transport::{RestResponse, RestTransport};
use crate::config::ServerConfig;
use crate::error::{ChoreError, ChoreResult};

const SESSION_CONTEXT_HEADER: HeaderName = HeaderName::from_static("tm1-sessioncontext");

/// HTTP transport for the planning server's REST API.
///
/// The server answers the first authenticated request with a session
/// cookie; the client keeps it in its cookie store so later calls reuse the
/// session instead of logging in again.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport from connection settings.
    pub fn new(config: &ServerConfig) -> ChoreResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ChoreError::Validation(format!("invalid base URL '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .default_headers(default_headers(config)?)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// REST root every path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn default_headers(config: &ServerConfig) -> ChoreResult<HeaderMap> {
    let invalid = |what: &str, e: reqwest::header::InvalidHeaderValue| {
        ChoreError::Validation(format!("{what} is not a valid HTTP header value: {e}"))
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; odata.streaming=true; charset=utf-8"),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json;odata.metadata=none,text/plain"),
    );
    headers.insert(
        SESSION_CONTEXT_HEADER,
        HeaderValue::from_str(&config.session_context).map_err(|e| invalid("session_context", e))?,
    );

    if let Some(auth) = authorization(config) {
        let mut value = HeaderValue::from_str(&auth).map_err(|e| invalid("credentials", e))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// `Basic` for native users, `CAMNamespace` when a namespace is configured.
fn authorization(config: &ServerConfig) -> Option<String> {
    let user = config.user.as_deref()?;
    let password = config.password.as_deref().unwrap_or_default();
    Some(match config.namespace.as_deref() {
        Some(namespace) => format!(
            "CAMNamespace {}",
            STANDARD.encode(format!("{user}:{password}:{namespace}"))
        ),
        None => format!("Basic {}", STANDARD.encode(format!("{user}:{password}"))),
    })
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ChoreResult<RestResponse> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        tracing::debug!(method = %method, path = %path, status, "Planning server responded");

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        };
        Ok(RestResponse::new(status, body))
    }
}
