//! Generic retry executor with backoff and jitter
//!
//! Runs an async operation until it succeeds, the [`RetryPolicy`] says stop,
//! the attempt budget is spent or the optional time budget runs out. Unlike a
//! wrapper-error design, every terminal failure hands back the operation's
//! own last error so callers keep their error taxonomy.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Terminal outcome of a failed retry sequence
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// All attempts were used; carries the last error
    #[error("All retry attempts exhausted after {attempts} tries: {last_error:?}")]
    AttemptsExhausted { attempts: u32, last_error: E },

    /// The policy declined to retry this error
    #[error("Operation failed with non-retryable error: {source:?}")]
    NonRetryable { source: E },

    /// The time budget ran out before another attempt could start
    #[error("Retry timeout exceeded after {elapsed:?}: {last_error:?}")]
    TimeoutExceeded { elapsed: Duration, last_error: E },
}

impl<E> RetryError<E> {
    /// The operation error that ended the sequence.
    pub fn into_source(self) -> E {
        match self {
            Self::AttemptsExhausted { last_error, .. } | Self::TimeoutExceeded { last_error, .. } => {
                last_error
            }
            Self::NonRetryable { source } => source,
        }
    }
}

/// Invalid [`RetryConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid retry configuration: {message}")]
pub struct InvalidRetryConfig {
    pub message: String,
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// `attempt` is the 0-based index of the attempt that just failed.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

impl<E, F> RetryPolicy<E> for F
where
    F: Fn(&E, u32) -> RetryDecision,
{
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
        self(error, attempt)
    }
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the configured backoff
    Retry,
    /// Retry after a server-supplied delay (e.g. `Retry-After`)
    RetryAfter(Duration),
    /// Give up and surface the error
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// `initial_delay * base^retry`, capped at `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `retry` (0-based).
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let delay_ms = initial_delay.as_millis() as f64 * base.powi(exponent);
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }
}

/// Randomisation applied on top of the backoff delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    None,
    /// Uniform in `[0, delay]`
    Full,
    /// Uniform in `[delay/2, delay]`
    Equal,
}

impl Jitter {
    pub fn apply(&self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(random_up_to(millis)),
            Self::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + random_up_to(millis - half))
            }
        }
    }
}

fn random_up_to(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=max)
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, initial try included
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub jitter: Jitter,
    /// No new attempt starts once this much time has elapsed
    pub max_total_time: Option<Duration>,
    /// Upper bound on a policy-supplied [`RetryDecision::RetryAfter`] delay
    pub max_retry_after: Duration,
}

/// Default cap on server-requested retry delays.
pub const DEFAULT_MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(200),
                base: 2.0,
                max_delay: Duration::from_secs(10),
            },
            jitter: Jitter::Equal,
            max_total_time: Some(Duration::from_secs(120)),
            max_retry_after: DEFAULT_MAX_RETRY_AFTER,
        }
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// # Errors
    /// Zero attempts or a non-positive exponential base.
    pub fn validate(&self) -> Result<(), InvalidRetryConfig> {
        if self.max_attempts == 0 {
            return Err(InvalidRetryConfig {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }
        if let BackoffStrategy::Exponential { base, .. } = &self.backoff {
            if *base <= 0.0 {
                return Err(InvalidRetryConfig {
                    message: "exponential base must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`RetryConfig`]
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, base, max_delay };
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.config.jitter = jitter;
        self
    }

    pub fn max_total_time(mut self, duration: Duration) -> Self {
        self.config.max_total_time = Some(duration);
        self
    }

    pub fn unlimited_time(mut self) -> Self {
        self.config.max_total_time = None;
        self
    }

    /// Cap applied to `RetryAfter` hints.
    pub fn max_retry_after(mut self, cap: Duration) -> Self {
        self.config.max_retry_after = cap;
        self
    }

    /// # Errors
    /// See [`RetryConfig::validate`].
    pub fn build(self) -> Result<RetryConfig, InvalidRetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    ///
    /// `operation` is re-invoked for every attempt so it can rebuild any
    /// non-reusable state (request bodies, tokens).
    ///
    /// # Errors
    /// See [`RetryError`]; every variant carries the last operation error.
    #[instrument(level = "debug", skip(self, operation), fields(max_attempts = self.config.max_attempts))]
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            debug!(attempt = attempt + 1, max_attempts, "executing operation");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if attempt + 1 >= max_attempts {
                warn!(attempts = attempt + 1, error = %error, "all retry attempts exhausted");
                return Err(RetryError::AttemptsExhausted { attempts: attempt + 1, last_error: error });
            }

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(error = %error, "retry policy declined to retry");
                    return Err(RetryError::NonRetryable { source: error });
                }
                RetryDecision::Retry => {
                    self.config.jitter.apply(self.config.backoff.calculate_delay(attempt))
                }
                RetryDecision::RetryAfter(delay) => {
                    if delay > self.config.max_retry_after {
                        debug!(
                            requested = ?delay,
                            cap = ?self.config.max_retry_after,
                            "clamping retry-after delay"
                        );
                    }
                    delay.min(self.config.max_retry_after)
                }
            };

            if let Some(budget) = self.config.max_total_time {
                let elapsed = started.elapsed();
                if elapsed.saturating_add(delay) >= budget {
                    warn!(?elapsed, ?budget, error = %error, "retry time budget exceeded");
                    return Err(RetryError::TimeoutExceeded { elapsed, last_error: error });
                }
            }

            warn!(attempt = attempt + 1, ?delay, error = %error, "operation failed, retrying");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}
