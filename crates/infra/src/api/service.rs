//! Authenticated client facade
//!
//! Pairs a token source with the request executor. A 401 response drops the
//! token that was rejected, re-authenticates and replays the request once.

use std::fmt;
use std::sync::Arc;

use armis_common::time::Clock;
use armis_domain::{ArmisConfig, ArmisError, Envelope, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use super::auth::{AccessTokenProvider, SessionManager};
use super::client::ApiClient;

/// Armis API client used by resource operations
#[derive(Clone)]
pub struct ArmisClient {
    executor: Arc<ApiClient>,
    auth: Arc<dyn AccessTokenProvider>,
}

impl fmt::Debug for ArmisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmisClient").field("executor", &self.executor).finish_non_exhaustive()
    }
}

impl ArmisClient {
    /// Client sending requests through `executor` with tokens from `auth`.
    pub fn new(executor: Arc<ApiClient>, auth: Arc<dyn AccessTokenProvider>) -> Self {
        Self { executor, auth }
    }

    /// Client authenticating with `config.api_key` through a [`SessionManager`].
    ///
    /// # Errors
    /// [`ArmisError::Config`] when the configuration is invalid.
    pub fn from_config(config: &ArmisConfig) -> Result<Self> {
        Self::builder().config(config.clone()).build()
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ArmisClientBuilder {
        ArmisClientBuilder::default()
    }

    /// Underlying request executor.
    pub fn executor(&self) -> &Arc<ApiClient> {
        &self.executor
    }

    /// Token source used for every request.
    pub fn auth(&self) -> &Arc<dyn AccessTokenProvider> {
        &self.auth
    }

    /// Authenticated request returning the raw envelope.
    ///
    /// `success=false` is not treated as an error here; use
    /// [`Envelope::into_data`] for strict access.
    ///
    /// # Errors
    /// Token errors from the provider, and the executor's classification of
    /// the exchange. A 401 is returned only if the replay is rejected too.
    #[instrument(skip(self, body, cancel), fields(method = %method, path = %path))]
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let token = self.auth.access_token(cancel).await?;
        match self.executor.execute(method.clone(), path, body, Some(&token), cancel).await {
            Err(err) if err.requires_reauth() => {
                warn!("access token rejected, re-authenticating once");
                self.auth.invalidate(&token);
                let fresh = self.auth.access_token(cancel).await?;
                self.executor.execute(method, path, body, Some(&fresh), cancel).await
            }
            other => other,
        }
    }

    /// Authenticated `GET` of `path`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Envelope<T>> {
        self.request::<(), T>(Method::GET, path, None, cancel).await
    }

    /// Authenticated `POST` of `body` as JSON.
    pub async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body), cancel).await
    }

    /// Authenticated `PUT` of `body` as JSON.
    pub async fn put<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(body), cancel).await
    }

    /// Authenticated `DELETE` of `path`.
    ///
    /// # Errors
    /// Same as [`ArmisClient::request`].
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Envelope<T>> {
        self.request::<(), T>(Method::DELETE, path, None, cancel).await
    }
}

/// Builder for [`ArmisClient`]
#[derive(Default)]
pub struct ArmisClientBuilder {
    config: Option<ArmisConfig>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ArmisClientBuilder {
    /// Set the API configuration
    pub fn config(mut self, config: ArmisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the default [`SessionManager`] token source
    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Clock for the default [`SessionManager`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// # Errors
    /// [`ArmisError::Config`] when no configuration was given or it is
    /// invalid.
    pub fn build(self) -> Result<ArmisClient> {
        let config =
            self.config.ok_or_else(|| ArmisError::Config("configuration not set".to_string()))?;
        let executor = Arc::new(ApiClient::from_config(&config)?);

        let auth = match self.auth {
            Some(auth) => auth,
            None => {
                let manager = match self.clock {
                    Some(clock) => {
                        SessionManager::with_clock(executor.clone(), config.api_key.clone(), clock)
                    }
                    None => SessionManager::new(executor.clone(), config.api_key.clone()),
                };
                Arc::new(manager) as Arc<dyn AccessTokenProvider>
            }
        };

        Ok(ArmisClient::new(executor, auth))
    }
}
