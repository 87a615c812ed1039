//! Resilience patterns for transient failures
//!
//! Only retry lives here today: a generic executor parameterised by a
//! [`RetryPolicy`] that classifies the caller's own error type. Callers keep
//! their error enum; the executor hands back the last error when it gives up.

pub mod retry;

pub use retry::{
    BackoffStrategy, InvalidRetryConfig, Jitter, RetryConfig, RetryConfigBuilder, RetryDecision,
    RetryError, RetryExecutor, RetryPolicy, DEFAULT_MAX_RETRY_AFTER,
};
