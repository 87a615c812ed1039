#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use armis_common::resilience::RetryConfig;
use armis_common::time::MockClock;
use armis_infra::{ApiClient, ApiClientConfig, ArmisClient, ArmisCommands, SessionManager};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-secret";
pub const TOKEN_PATH: &str = "/api/v1/access_token/";

/// Parse an RFC3339 instant; panics on malformed test input.
pub fn at(instant: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(instant).expect("valid test timestamp").with_timezone(&Utc)
}

/// Clock pinned to `instant`.
pub fn clock_at(instant: &str) -> Arc<MockClock> {
    Arc::new(MockClock::new(at(instant)))
}

/// Retry settings that keep integration tests fast.
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(max_attempts)
        .fixed_backoff(Duration::from_millis(5))
        .build()
        .expect("valid retry config")
}

pub fn executor_config(server: &MockServer, max_attempts: u32) -> ApiClientConfig {
    ApiClientConfig {
        base_url: server.uri(),
        api_version: "v1".into(),
        timeout: Duration::from_secs(5),
        user_agent: "armis-tests".into(),
        retry: fast_retry(max_attempts),
    }
}

/// Request executor against `server` with a fixed 5ms backoff.
pub fn executor(server: &MockServer, max_attempts: u32) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(executor_config(server, max_attempts)).expect("executor builds"))
}

pub fn session(server: &MockServer, clock: Arc<MockClock>) -> Arc<SessionManager> {
    Arc::new(SessionManager::with_clock(executor(server, 1), API_KEY, clock))
}

/// Authenticated client and commands sharing one session manager.
pub fn armis_commands(server: &MockServer, clock: Arc<MockClock>) -> (ArmisCommands, Arc<SessionManager>) {
    let manager = session(server, clock);
    let client = ArmisClient::new(executor(server, 1), manager.clone());
    (ArmisCommands::new(Arc::new(client)), manager)
}

/// Successful token endpoint body.
pub fn token_body(token: &str, expiration_utc: &str) -> Value {
    json!({
        "data": {"access_token": token, "expiration_utc": expiration_utc},
        "success": true
    })
}

/// Token endpoint answering `token` for the test credential, expecting
/// exactly `calls` exchanges.
pub async fn mount_token(server: &MockServer, token: &str, expiration_utc: &str, calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains(format!("secret_key={API_KEY}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(token, expiration_utc)))
        .expect(calls)
        .mount(server)
        .await;
}

pub fn envelope(data: Value) -> Value {
    json!({"data": data, "success": true})
}

/// Number of requests the server has seen for `request_path`.
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
