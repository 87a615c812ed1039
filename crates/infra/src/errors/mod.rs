//! Error plumbing between third-party crates and [`armis_domain::ArmisError`].

mod conversions;

pub use conversions::InfraError;
