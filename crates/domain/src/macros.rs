//! Macro for implementing string conversions on status enums
//!
//! Status-like enums are persisted as lowercase text columns and embedded in
//! provider metadata, so each needs `as_str`, `Display` and `FromStr`.
//!
//! # Example
//!
//! ```rust
//! use docketsync_domain::impl_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum FilingState {
//!     Draft,
//!     Filed,
//! }
//!
//! impl_status_conversions!(FilingState {
//!     Draft => "draft",
//!     Filed => "filed",
//! });
//!
//! assert_eq!(FilingState::Filed.as_str(), "filed");
//! assert_eq!("DRAFT".parse::<FilingState>(), Ok(FilingState::Draft));
//! ```

/// Implements `as_str`, `Display` and `FromStr` for status enums
///
/// Parsing is case-insensitive and surrounding whitespace is ignored.
/// Output is always the canonical string given in the mapping.
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
