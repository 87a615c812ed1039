//! Request executor: one logical HTTP exchange turned into a typed envelope
//!
//! Builds the URL and headers, sends through [`HttpClient`], classifies the
//! status and decodes `Envelope<T>`. Transport failures, 429 and 5xx are
//! retried with backoff; everything else fails fast. The whole call is
//! bounded by the caller's [`CancellationToken`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use armis_common::resilience::{
    BackoffStrategy, Jitter, RetryConfig, RetryDecision, RetryExecutor, RetryPolicy,
};
use armis_domain::constants::{CONTENT_TYPE_FORM, CONTENT_TYPE_JSON};
use armis_domain::{ArmisConfig, ArmisError, Envelope, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::InfraError;
use crate::http::{HttpClient, RawResponse};

/// Configuration for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Tenant root, e.g. `https://acme.armis.com`
    pub base_url: String,
    /// Path segment after `/api/`
    pub api_version: String,
    /// Bound on each attempt
    pub timeout: Duration,
    /// `User-Agent` for every request
    pub user_agent: String,
    /// Attempts, backoff and the cap on server `Retry-After` hints
    pub retry: RetryConfig,
}

impl ApiClientConfig {
    /// Executor settings derived from client configuration.
    pub fn from_armis(config: &ArmisConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_version: config.api_version.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: config.user_agent.clone(),
            retry: RetryConfig {
                max_attempts: config.max_attempts.max(1),
                ..default_retry()
            },
        }
    }
}

/// 3 attempts, exponential backoff from 200ms capped at 10s, equal jitter.
/// `Retry-After` hints are honoured up to 60s.
pub fn default_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        backoff: BackoffStrategy::Exponential {
            initial_delay: Duration::from_millis(200),
            base: 2.0,
            max_delay: Duration::from_secs(10),
        },
        jitter: Jitter::Equal,
        max_total_time: None,
        max_retry_after: MAX_RETRY_AFTER,
    }
}

const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Failure of one attempt, with the server's `Retry-After` hint if any.
#[derive(Debug)]
struct AttemptFailure {
    error: ArmisError,
    retry_after: Option<Duration>,
}

impl From<ArmisError> for AttemptFailure {
    fn from(error: ArmisError) -> Self {
        Self { error, retry_after: None }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// Retries `Transport`, `Api{429}` and `Api{5xx}` only.
#[derive(Debug, Clone, Copy, Default)]
struct ArmisRetryPolicy;

impl RetryPolicy<AttemptFailure> for ArmisRetryPolicy {
    fn should_retry(&self, failure: &AttemptFailure, _attempt: u32) -> RetryDecision {
        if !failure.error.is_retryable() {
            return RetryDecision::Stop;
        }
        match failure.retry_after {
            Some(delay) => RetryDecision::RetryAfter(delay),
            None => RetryDecision::Retry,
        }
    }
}

/// Body of an outbound request
enum Payload<'a> {
    None,
    Json(serde_json::Value),
    Form(&'a [(&'a str, &'a str)]),
}

/// Typed HTTP request executor
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<HttpClient>,
    api_root: Url,
    retry: RetryExecutor<ArmisRetryPolicy>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_root", &self.api_root.as_str())
            .field("retry", self.retry.config())
            .finish()
    }
}

impl ApiClient {
    /// # Errors
    /// [`ArmisError::Config`] for an unusable base URL or retry setting,
    /// [`ArmisError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        config
            .retry
            .validate()
            .map_err(|e| ArmisError::Config(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(CONTENT_TYPE_JSON));

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http: Arc::new(http),
            api_root: api_root(&config.base_url, &config.api_version)?,
            retry: RetryExecutor::new(config.retry, ArmisRetryPolicy),
        })
    }

    /// Executor for `config`, which is validated first.
    ///
    /// # Errors
    /// See [`ArmisConfig::validate`] and [`ApiClient::new`].
    pub fn from_config(config: &ArmisConfig) -> Result<Self> {
        config.validate()?;
        Self::new(ApiClientConfig::from_armis(config))
    }

    /// `{base}/api/{version}/`
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Absolute URL of `path` (leading `/` optional).
    ///
    /// # Errors
    /// [`ArmisError::Validation`] when `path` cannot be joined onto the root.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_root
            .join(path.trim_start_matches('/'))
            .map_err(|e| ArmisError::Validation(format!("invalid request path {path:?}: {e}")))
    }

    /// Perform one JSON exchange and decode the envelope.
    ///
    /// Every request accepts JSON. With a token, sends `Authorization: <token>`
    /// and `Content-Type: application/json` even when there is no body;
    /// without one, no `Authorization` header is sent.
    /// `success=false` is returned as-is for the caller to inspect.
    ///
    /// # Errors
    /// - [`ArmisError::Api`] for any status outside `[200, 300)`, body verbatim
    /// - [`ArmisError::Transport`] when the exchange itself fails
    /// - [`ArmisError::Decode`] when a 2xx body is not a valid envelope
    /// - [`ArmisError::Cancelled`] when `cancel` fires first
    #[instrument(skip(self, body, token, cancel), fields(method = %method, path = %path, authenticated = token.is_some()))]
    pub async fn execute<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = match body {
            Some(body) => Payload::Json(
                serde_json::to_value(body).map_err(|e| {
                    ArmisError::Validation(format!("failed to serialize request body: {e}"))
                })?,
            ),
            None => Payload::None,
        };

        let raw = self.exchange(method, path, &payload, token, cancel).await?;
        decode_envelope(&raw.body)
    }

    /// Form-encoded POST without authorization, used by the token endpoint.
    ///
    /// # Errors
    /// Same classification as [`ApiClient::execute`].
    #[instrument(skip(self, form, cancel), fields(path = %path))]
    pub async fn post_form<T>(
        &self,
        path: &str,
        form: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Envelope<T>>
    where
        T: DeserializeOwned,
    {
        let raw = self.exchange(Method::POST, path, &Payload::Form(form), None, cancel).await?;
        decode_envelope(&raw.body)
    }

    async fn exchange(
        &self,
        method: Method,
        path: &str,
        payload: &Payload<'_>,
        token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        if cancel.is_cancelled() {
            return Err(ArmisError::Cancelled);
        }
        let url = self.endpoint(path)?;

        let attempts = self.retry.execute(|| {
            let request = self.build_request(method.clone(), url.clone(), payload, token);
            async move {
                let raw = self.http.send(request).await?;
                if raw.is_success() {
                    return Ok(raw);
                }
                let failure = AttemptFailure {
                    retry_after: raw.retry_after,
                    error: ArmisError::api(raw.status, raw.body),
                };
                if failure.error.is_retryable() {
                    warn!(status = failure.error.status_code(), "retryable API response");
                }
                Err(failure)
            }
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("request cancelled by caller");
                Err(ArmisError::Cancelled)
            }
            outcome = attempts => outcome.map_err(|e| e.into_source().error),
        }
    }

    fn build_request(
        &self,
        method: Method,
        url: Url,
        payload: &Payload<'_>,
        token: Option<&str>,
    ) -> RequestBuilder {
        let mut request = self.http.request(method, url);

        if let Some(token) = token {
            request = request.header(AUTHORIZATION, token);
        }

        match payload {
            Payload::None if token.is_some() => request.header(CONTENT_TYPE, CONTENT_TYPE_JSON),
            Payload::None => request,
            Payload::Json(value) => {
                request.header(CONTENT_TYPE, CONTENT_TYPE_JSON).body(value.to_string())
            }
            Payload::Form(fields) => {
                request.header(CONTENT_TYPE, CONTENT_TYPE_FORM).body(encode_form(fields))
            }
        }
    }
}

/// `{base}/api/{version}/` with exactly one slash between segments.
fn api_root(base_url: &str, api_version: &str) -> Result<Url> {
    let root = format!(
        "{}/api/{}/",
        base_url.trim().trim_end_matches('/'),
        api_version.trim().trim_matches('/')
    );
    let url = Url::parse(&root).map_err(|e| ArmisError::from(InfraError::from(e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ArmisError::Config(format!("unsupported URL scheme: {other}"))),
    }
}

fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<Envelope<T>> {
    if body.is_empty() {
        return Err(ArmisError::Decode("empty response body".into()));
    }
    serde_json::from_slice(body).map_err(|e| ArmisError::from(InfraError::from(e)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    fn fast_config(base_url: String) -> ApiClientConfig {
        ApiClientConfig {
            base_url,
            api_version: "v1".into(),
            timeout: Duration::from_secs(5),
            user_agent: "armis-test".into(),
            retry: RetryConfig::builder()
                .max_attempts(3)
                .fixed_backoff(Duration::from_millis(1))
                .jitter(Jitter::None)
                .build()
                .unwrap(),
        }
    }

    #[test]
    fn test_api_root_normalises_slashes() {
        let url = api_root("https://t.armis.com/", "/v1/").unwrap();
        assert_eq!(url.as_str(), "https://t.armis.com/api/v1/");

        assert!(matches!(api_root("ftp://t.armis.com", "v1"), Err(ArmisError::Config(_))));
        assert!(matches!(api_root("not a url", "v1"), Err(ArmisError::Config(_))));
    }

    #[test]
    fn test_endpoint_joins_relative_paths() {
        let client = ApiClient::new(fast_config("https://t.armis.com".into())).unwrap();
        assert_eq!(
            client.endpoint("/policies/7/").unwrap().as_str(),
            "https://t.armis.com/api/v1/policies/7/"
        );
        assert_eq!(
            client.endpoint("access_token/").unwrap().as_str(),
            "https://t.armis.com/api/v1/access_token/"
        );
    }

    #[test]
    fn test_form_encoding_escapes_values() {
        assert_eq!(encode_form(&[("secret_key", "a b&c=d")]), "secret_key=a%20b%26c%3Dd");
    }

    #[tokio::test]
    async fn test_execute_sends_auth_and_json_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/policies/"))
            .and(header("authorization", "tok123"))
            .and(header("content-type", "application/json"))
            .and(header("accept", "application/json"))
            .and(body_string(r#"{"name":"p"}"#))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 9}, "success": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(fast_config(server.uri())).unwrap();
        let env: Envelope<serde_json::Value> = client
            .execute(
                Method::POST,
                "policies/",
                Some(&json!({"name": "p"})),
                Some("tok123"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(env.success);
        assert_eq!(env.data["id"], 9);

        Mock::given(method("GET"))
            .and(path("/api/v1/policies/9/"))
            .and(header("authorization", "tok123"))
            .and(header("content-type", "application/json"))
            .and(header("accept", "application/json"))
            .and(body_string(""))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 9}, "success": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let env: Envelope<serde_json::Value> = client
            .execute::<(), _>(
                Method::GET,
                "policies/9/",
                None,
                Some("tok123"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(env.data["id"], 9);
    }

    #[tokio::test]
    async fn test_execute_without_token_omits_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/ping/"))
            .respond_with(move |req: &Request| {
                let authorized = req.headers.contains_key("authorization");
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": authorized, "success": true}))
            })
            .mount(&server)
            .await;

        let client = ApiClient::new(fast_config(server.uri())).unwrap();
        let env: Envelope<bool> = client
            .execute::<(), _>(Method::GET, "ping/", None, None, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!env.data);
    }

    #[tokio::test]
    async fn test_success_false_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": null, "success": false})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(fast_config(server.uri())).unwrap();
        let env: Envelope<Option<u32>> = client
            .execute::<(), _>(Method::GET, "x/", None, Some("t"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!env.success);
        assert_eq!(env.into_data(), Err(ArmisError::Unsuccessful));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(fast_config(server.uri())).unwrap();
        let result: Result<Envelope<serde_json::Value>> = client
            .execute::<(), _>(Method::GET, "x/", None, Some("t"), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ArmisError::Decode(_))), "got {result:?}");
    }

    #[tokio::test]
    async fn test_form_post_has_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token/"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("secret_key=k"))
            .respond_with(move |req: &Request| {
                let status = if req.headers.contains_key("authorization") { 400 } else { 200 };
                ResponseTemplate::new(status).set_body_json(json!({"data": {}, "success": true}))
            })
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(fast_config(server.uri())).unwrap();
        let env: Envelope<serde_json::Value> = client
            .post_form("access_token/", &[("secret_key", "k")], &CancellationToken::new())
            .await
            .unwrap();
        assert!(env.success);
    }

    #[tokio::test]
    async fn test_client_errors_fail_fast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(fast_config(server.uri())).unwrap();
        let result: Result<Envelope<serde_json::Value>> = client
            .execute::<(), _>(Method::GET, "x/", None, Some("t"), &CancellationToken::new())
            .await;

        assert_eq!(result.unwrap_err(), ArmisError::api(404, "missing"));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(header_exists("accept"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ApiClient::new(fast_config(server.uri())).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<Envelope<serde_json::Value>> =
            client.execute::<(), _>(Method::GET, "x/", None, Some("t"), &cancel).await;
        assert_eq!(result.unwrap_err(), ArmisError::Cancelled);
    }

    #[test]
    fn test_retry_policy_classification() {
        let policy = ArmisRetryPolicy;
        let decide = |error: ArmisError, retry_after| {
            policy.should_retry(&AttemptFailure { error, retry_after }, 0)
        };

        assert_eq!(decide(ArmisError::Transport("reset".into()), None), RetryDecision::Retry);
        assert_eq!(decide(ArmisError::api(503, ""), None), RetryDecision::Retry);
        assert_eq!(
            decide(ArmisError::api(429, ""), Some(Duration::from_secs(2))),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(decide(ArmisError::api(401, ""), None), RetryDecision::Stop);
        assert_eq!(decide(ArmisError::api(404, ""), None), RetryDecision::Stop);
        assert_eq!(decide(ArmisError::Decode("x".into()), None), RetryDecision::Stop);
    }

    #[test]
    fn test_configured_attempts_keep_retry_after_cap() {
        let config = ArmisConfig { max_attempts: 7, ..ArmisConfig::new("https://t.armis.com", "k") };
        let retry = ApiClientConfig::from_armis(&config).retry;

        assert_eq!(retry.max_attempts, 7);
        assert_eq!(retry.max_retry_after, Duration::from_secs(60));
        assert!(retry.validate().is_ok());
    }
}
