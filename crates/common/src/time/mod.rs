//! Time abstractions
//!
//! Wall-clock access goes through [`Clock`] so token expiry and similar
//! comparisons can be driven deterministically in tests.

mod clock;

pub use clock::{Clock, MockClock, SystemClock};
