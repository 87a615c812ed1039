//! Integration tests for the access-token session lifecycle
//!
//! Runs the session manager against a wiremock token endpoint with a mock
//! clock, covering expiry skew, single-flight refresh and failure handling.

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use armis_domain::ArmisError;
use armis_infra::{AccessTokenProvider, SessionManager};
use chrono::Duration as ChronoDuration;
use futures::future::join_all;
use serde_json::json;
use support::{at, clock_at, executor, mount_token, session, token_body, API_KEY, TOKEN_PATH};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_token_is_cached_until_skew_adjusted_expiry() {
    let server = MockServer::start().await;
    mount_token(&server, "tok123", "2025-01-01T00:10:00Z", 2).await;

    let clock = clock_at("2025-01-01T00:00:00Z");
    let manager = session(&server, clock.clone());
    let cancel = CancellationToken::new();

    let token = manager.ensure_authenticated(&cancel).await.expect("first authentication");
    assert_eq!(token, "tok123");
    assert_eq!(manager.token_expiry(), Some(at("2025-01-01T00:05:00Z")));
    assert_eq!(support::hits(&server, TOKEN_PATH).await, 1);

    clock.advance(ChronoDuration::minutes(4));
    let cached = manager.ensure_authenticated(&cancel).await.expect("cached token");
    assert_eq!(cached, "tok123");
    assert_eq!(support::hits(&server, TOKEN_PATH).await, 1);

    clock.advance(ChronoDuration::minutes(2));
    manager.ensure_authenticated(&cancel).await.expect("re-authentication");
    assert_eq!(support::hits(&server, TOKEN_PATH).await, 2);
}

#[tokio::test]
async fn test_token_at_exact_expiry_is_refreshed() {
    let server = MockServer::start().await;
    mount_token(&server, "tok", "2025-01-01T00:10:00.123456789Z", 2).await;

    let clock = clock_at("2025-01-01T00:00:00Z");
    let manager = session(&server, clock.clone());
    let cancel = CancellationToken::new();

    manager.ensure_authenticated(&cancel).await.unwrap();
    assert_eq!(manager.token_expiry(), Some(at("2025-01-01T00:05:00.123456789Z")));

    clock.set(at("2025-01-01T00:05:00.123456789Z"));
    assert_eq!(manager.current_token(), None);
    manager.ensure_authenticated(&cancel).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_callers_share_one_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("shared", "2025-01-01T01:00:00Z"))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = session(&server, clock_at("2025-01-01T00:00:00Z"));
    let cancel = CancellationToken::new();

    let tokens = join_all((0..8).map(|_| manager.ensure_authenticated(&cancel))).await;

    for token in tokens {
        assert_eq!(token.expect("token"), "shared");
    }
}

#[tokio::test]
async fn test_concurrent_callers_across_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("spawned", "2025-01-01T01:00:00Z"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = session(&server, clock_at("2025-01-01T00:00:00Z"));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager.ensure_authenticated(&CancellationToken::new()).await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.expect("task joins").expect("token"), "spawned");
    }
}

#[tokio::test]
async fn test_unparseable_expiry_is_not_cached() {
    let server = MockServer::start().await;
    mount_token(&server, "tok", "next tuesday", 2).await;

    let manager = session(&server, clock_at("2025-01-01T00:00:00Z"));
    let cancel = CancellationToken::new();

    let first = manager.ensure_authenticated(&cancel).await;
    assert!(matches!(first, Err(ArmisError::TimeParse(_))));
    assert_eq!(manager.current_token(), None);
    assert_eq!(manager.token_expiry(), None);

    let second = manager.ensure_authenticated(&cancel).await;
    assert!(matches!(second, Err(ArmisError::TimeParse(_))));
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": null, "success": false})),
        )
        .mount(&server)
        .await;

    let manager = session(&server, clock_at("2025-01-01T00:00:00Z"));
    let result = manager.ensure_authenticated(&CancellationToken::new()).await;

    assert_eq!(result, Err(ArmisError::Auth("authentication failed".into())));
    assert_eq!(manager.current_token(), None);
}

#[tokio::test]
async fn test_rejected_credentials_surface_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let manager = session(&server, clock_at("2025-01-01T00:00:00Z"));
    let err = manager.ensure_authenticated(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.status_code(), Some(401));
    assert_eq!(err.body(), Some(&b"bad key"[..]));
}

#[tokio::test]
async fn test_empty_key_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(any()).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;

    let manager = SessionManager::with_clock(
        executor(&server, 1),
        "",
        clock_at("2025-01-01T00:00:00Z"),
    );

    let result = manager.ensure_authenticated(&CancellationToken::new()).await;
    assert!(matches!(result, Err(ArmisError::Validation(_))));
}

#[tokio::test]
async fn test_token_request_is_form_encoded_without_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("t", "2025-01-01T01:00:00Z")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = session(&server, clock_at("2025-01-01T00:00:00Z"));
    manager.authenticate(&CancellationToken::new()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(String::from_utf8_lossy(&requests[0].body), format!("secret_key={API_KEY}"));
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_invalidate_forces_a_new_exchange() {
    let server = MockServer::start().await;
    mount_token(&server, "tok", "2025-01-01T01:00:00Z", 2).await;

    let manager = session(&server, clock_at("2025-01-01T00:00:00Z"));
    let cancel = CancellationToken::new();

    let token = manager.access_token(&cancel).await.unwrap();
    manager.invalidate("some-other-token");
    assert_eq!(manager.current_token().as_deref(), Some("tok"));

    manager.invalidate(&token);
    assert_eq!(manager.current_token(), None);
    manager.access_token(&cancel).await.unwrap();
}

#[tokio::test]
async fn test_cancellation_interrupts_slow_token_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("late", "2025-01-01T01:00:00Z"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let manager = Arc::new(SessionManager::with_clock(
        executor(&server, 1),
        API_KEY,
        clock_at("2025-01-01T00:00:00Z"),
    ));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = manager.ensure_authenticated(&cancel).await;

    assert_eq!(result, Err(ArmisError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(manager.current_token(), None);
}
