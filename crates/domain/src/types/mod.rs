//! Domain types and models

pub mod envelope;
pub mod resources;
pub mod rules;
pub mod session;

// Re-export for convenience
pub use envelope::Envelope;
pub use resources::{
    Boundary, BoundarySettings, CreatedResource, Policy, PolicyAction, PolicySettings,
};
pub use rules::{Operator, RuleGroup, RuleNode};
pub use session::{AccessTokenData, Session};
