//! Macro for implementing string conversions for wire-level enums
//!
//! Several enums in this crate have a canonical lowercase spelling, either on
//! the wire (`"and"`/`"or"` rule keys) or as stable log labels. This macro
//! provides `as_str`, `Display` and case-insensitive `FromStr` from a single
//! variant-to-string table.
//!
//! # Example
//!
//! ```rust
//! use armis_domain::impl_wire_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Direction {
//!     Inbound,
//!     Outbound,
//! }
//!
//! impl_wire_enum_conversions!(Direction {
//!     Inbound => "inbound",
//!     Outbound => "outbound",
//! });
//!
//! assert_eq!(Direction::Inbound.as_str(), "inbound");
//! assert_eq!("OUTBOUND".parse::<Direction>(), Ok(Direction::Outbound));
//! ```

/// Implements `as_str`, `Display` and `FromStr` for fieldless enums
///
/// The string literals must be lowercase: parsing lowercases its input before
/// matching.
#[macro_export]
macro_rules! impl_wire_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase spelling.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!(
                        "Invalid {}: {}",
                        ::std::stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}
