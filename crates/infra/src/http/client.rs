//! Single-shot HTTP transport over reqwest
//!
//! No retries, no redirects. Every response body is read in full.

use std::time::Duration;

use armis_domain::constants::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use armis_domain::{ArmisError, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::redirect::Policy;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use tracing::debug;

use crate::errors::InfraError;

/// Fully read HTTP response.
///
/// The body is drained before the status is looked at, so non-2xx bodies are
/// available verbatim for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Numeric `Retry-After` header, when the server sent one
    pub retry_after: Option<Duration>,
    /// Body bytes, read in full
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Status in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single-shot HTTP transport.
///
/// Performs exactly one exchange per [`HttpClient::send`]; retry decisions
/// belong to the request executor, which knows the error taxonomy.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send the request and read the whole body.
    ///
    /// # Errors
    /// [`ArmisError::Transport`] for DNS, connect, timeout and body-read
    /// failures; [`ArmisError::Validation`] when the request cannot be built.
    pub async fn send(&self, builder: RequestBuilder) -> Result<RawResponse> {
        let request = builder.build().map_err(|err| ArmisError::from(InfraError::from(err)))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, url = %redacted_url(&url), "sending HTTP request");

        let response = self.client.execute(request).await.map_err(|err| {
            debug!(%method, url = %redacted_url(&url), error = %err, "HTTP request failed");
            ArmisError::from(InfraError::from(err))
        })?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|err| ArmisError::Transport(format!("failed to read response body: {err}")))?
            .to_vec();

        debug!(%method, url = %redacted_url(&url), status, bytes = body.len(), "received HTTP response");
        Ok(RawResponse { status, retry_after, body })
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
    accept_invalid_certs: bool,
    no_proxy: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: None,
            default_headers: None,
            accept_invalid_certs: false,
            no_proxy: false,
        }
    }
}

impl HttpClientBuilder {
    /// Bound on one complete exchange, body included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `User-Agent` header; defaults to the crate's own.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Headers added to every request sent through the client.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Test-only helper to allow insecure TLS (e.g., self-signed certs).
    #[cfg(test)]
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// Test-only helper to bypass `HTTP(S)_PROXY` for loopback mock servers.
    #[cfg(test)]
    pub fn no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    /// # Errors
    /// [`ArmisError::Transport`] if the TLS backend cannot be initialised.
    pub fn build(self) -> Result<HttpClient> {
        // Redirects are reported as non-2xx responses, not followed.
        let mut builder = ReqwestClient::builder().timeout(self.timeout).redirect(Policy::none());

        builder = builder.user_agent(self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.into()));

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if self.no_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|err| match InfraError::from(err).0 {
            ArmisError::Transport(msg) | ArmisError::Validation(msg) => {
                ArmisError::Transport(format!("failed to build HTTP client: {msg}"))
            }
            other => other,
        })?;

        Ok(HttpClient { client })
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// URL without query string, for logs.
fn redacted_url(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
