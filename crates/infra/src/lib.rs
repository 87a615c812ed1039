//! # Armis Infrastructure
//!
//! Network and environment layer of the Armis Centrix API client.
//!
//! This crate contains:
//! - The HTTP transport and the typed request executor
//! - Access-token session management and the authenticated client facade
//! - Policy and boundary operations
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Depends on `armis-domain` for data and errors, `armis-common` for retry
//!   and clock abstractions
//! - Contains all "impure" code (network, filesystem, environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{
    describe, AccessTokenProvider, ApiClient, ApiClientConfig, ArmisClient, ArmisCommands,
    SessionManager, StaticTokenProvider,
};
pub use http::{HttpClient, RawResponse};
pub use observability::{init_tracing, LogFormat};
