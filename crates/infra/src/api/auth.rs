//! Access-token lifecycle
//!
//! [`SessionManager`] exchanges the credential key for a bearer token at the
//! token endpoint, caches it with a 5 minute early expiry and refreshes it
//! lazily. Concurrent callers that find the token stale share one refresh.

use std::fmt;
use std::sync::Arc;

use armis_common::time::{Clock, SystemClock};
use armis_domain::constants::{ACCESS_TOKEN_PATH, SECRET_KEY_FIELD};
use armis_domain::{AccessTokenData, ArmisError, Result, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::ApiClient;
use crate::errors::InfraError;

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get a valid access token, authenticating if needed.
    async fn access_token(&self, cancel: &CancellationToken) -> Result<String>;

    /// Drop `token` if it is still the cached one, so the next
    /// [`access_token`](Self::access_token) call re-authenticates.
    fn invalidate(&self, token: &str);
}

/// Token source backed by the Armis token endpoint
pub struct SessionManager {
    executor: Arc<ApiClient>,
    credential_key: String,
    clock: Arc<dyn Clock>,
    session: RwLock<Session>,
    refresh_lock: Mutex<()>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("executor", &self.executor)
            .field("credential_key", &"[REDACTED]")
            .field("session", &*self.session.read())
            .finish()
    }
}

impl SessionManager {
    /// Session manager exchanging `credential_key` for tokens, timed by the
    /// system clock.
    pub fn new(executor: Arc<ApiClient>, credential_key: impl Into<String>) -> Self {
        Self::with_clock(executor, credential_key, Arc::new(SystemClock))
    }

    /// Session manager reading wall-clock time from `clock`.
    pub fn with_clock(
        executor: Arc<ApiClient>,
        credential_key: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            executor,
            credential_key: credential_key.into(),
            clock,
            session: RwLock::new(Session::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Return a token that is valid now, authenticating only when the cached
    /// one is missing or past its skew-adjusted expiry.
    ///
    /// # Errors
    /// [`ArmisError::Validation`] for an empty credential key (no network
    /// call), otherwise anything [`SessionManager::authenticate`] returns.
    #[instrument(skip(self, cancel))]
    pub async fn ensure_authenticated(&self, cancel: &CancellationToken) -> Result<String> {
        self.require_key()?;

        if let Some(token) = self.current_token() {
            return Ok(token);
        }

        let _refresh = self.lock_refresh(cancel).await?;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.current_token() {
            debug!("reusing token refreshed by a concurrent caller");
            return Ok(token);
        }

        self.exchange_credentials(cancel).await
    }

    /// Unconditionally exchange the credential key for a new token.
    ///
    /// The cached session is replaced only when the response carries a token
    /// with a parseable expiry.
    ///
    /// # Errors
    /// - [`ArmisError::Validation`] for an empty credential key
    /// - [`ArmisError::Transport`], [`ArmisError::Api`], [`ArmisError::Decode`]
    ///   from the exchange
    /// - [`ArmisError::Auth`] when the envelope reports `success=false`
    /// - [`ArmisError::TimeParse`] when `expiration_utc` is unusable
    #[instrument(skip(self, cancel))]
    pub async fn authenticate(&self, cancel: &CancellationToken) -> Result<String> {
        self.require_key()?;
        let _refresh = self.lock_refresh(cancel).await?;
        self.exchange_credentials(cancel).await
    }

    /// Cached token if it is valid at the clock's current time.
    pub fn current_token(&self) -> Option<String> {
        let now = self.clock.now();
        let session = self.session.read();
        session.is_valid_at(now).then(|| session.access_token().to_string())
    }

    /// Skew-adjusted expiry of the cached token.
    pub fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.session.read().token_expiry()
    }

    /// Forget the cached token unconditionally.
    pub fn clear(&self) {
        *self.session.write() = Session::default();
    }

    fn require_key(&self) -> Result<()> {
        if self.credential_key.is_empty() {
            return Err(ArmisError::Validation("credential key required".into()));
        }
        Ok(())
    }

    async fn lock_refresh(&self, cancel: &CancellationToken) -> Result<MutexGuard<'_, ()>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ArmisError::Cancelled),
            guard = self.refresh_lock.lock() => Ok(guard),
        }
    }

    /// Caller must hold `refresh_lock`.
    async fn exchange_credentials(&self, cancel: &CancellationToken) -> Result<String> {
        let form = [(SECRET_KEY_FIELD, self.credential_key.as_str())];
        let envelope = self.executor.post_form::<Value>(ACCESS_TOKEN_PATH, &form, cancel).await?;

        if !envelope.success {
            warn!("token endpoint reported success=false");
            return Err(ArmisError::Auth("authentication failed".into()));
        }

        let data: AccessTokenData = serde_json::from_value(envelope.data)
            .map_err(|e| ArmisError::from(InfraError::from(e)))?;
        let expiry = data.expiry()?;

        let session = Session::issued(data.access_token, expiry);
        let token = session.access_token().to_string();
        let valid_for = session.seconds_until_expiry(self.clock.now());
        *self.session.write() = session;

        info!(valid_for_secs = valid_for, "authenticated against Armis API");
        Ok(token)
    }
}

#[async_trait]
impl AccessTokenProvider for SessionManager {
    async fn access_token(&self, cancel: &CancellationToken) -> Result<String> {
        self.ensure_authenticated(cancel).await
    }

    fn invalidate(&self, token: &str) {
        let mut session = self.session.write();
        if session.access_token() == token {
            debug!("invalidating cached access token");
            *session = Session::default();
        }
    }
}

/// Pre-issued token that is never refreshed
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Provider that always hands out `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider").field("token", &"[REDACTED]").finish()
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(ArmisError::Cancelled);
        }
        if self.token.is_empty() {
            return Err(ArmisError::Validation("access token required".into()));
        }
        Ok(self.token.clone())
    }

    fn invalidate(&self, _token: &str) {}
}
