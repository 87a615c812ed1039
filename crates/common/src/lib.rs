//! Runtime building blocks shared by the Armis client crates.
//!
//! # Feature Tiers
//!
//! - `foundation`: clock abstraction
//! - `runtime`: async retry executor with backoff and jitter

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![allow(missing_docs)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod time;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

#[cfg(feature = "runtime")]
pub use resilience::{
    BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError,
    RetryExecutor, RetryPolicy,
};
#[cfg(feature = "foundation")]
pub use time::{Clock, MockClock, SystemClock};
