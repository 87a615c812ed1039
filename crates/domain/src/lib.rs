//! # Armis Domain
//!
//! Business domain types for the Armis Centrix API client.
//!
//! This crate contains:
//! - The error taxonomy shared by every layer ([`ArmisError`])
//! - The generic response [`Envelope`]
//! - The access-token [`Session`] record
//! - The recursive AND/OR rule tree used by policies and boundaries
//! - Resource payloads and client configuration
//!
//! ## Architecture
//! - No dependencies on other Armis crates
//! - No I/O: network and environment access live in `armis-infra`

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::ArmisConfig;
pub use errors::*;
pub use types::*;
