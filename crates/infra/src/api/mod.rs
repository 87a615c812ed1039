//! Armis Centrix REST client
//!
//! # Architecture
//!
//! - [`client::ApiClient`] performs one classified HTTP exchange per call,
//!   retrying transport failures, 429 and 5xx with backoff
//! - [`auth::SessionManager`] caches the access token with a 5 minute skew
//!   and refreshes it at most once per expiry across concurrent callers
//! - [`service::ArmisClient`] attaches the token and re-authenticates once on
//!   401
//! - [`commands::ArmisCommands`] exposes typed policy and boundary operations
//! - [`diagnostics`] renders errors for humans

pub mod auth;
pub mod client;
pub mod commands;
pub mod diagnostics;
pub mod service;

pub use auth::{AccessTokenProvider, SessionManager, StaticTokenProvider};
pub use client::{default_retry, ApiClient, ApiClientConfig};
pub use commands::ArmisCommands;
pub use diagnostics::describe;
pub use service::{ArmisClient, ArmisClientBuilder};
