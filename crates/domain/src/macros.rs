//! Macro for implementing Display and FromStr for wire-tag enums
//!
//! Delay tiers, response origins, verification results and call states are
//! logged and configured by name. The macro gives them one consistent
//! lowercase representation with case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use tollgate_domain::impl_tag_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Priority {
//!     Interactive,
//!     Deferred,
//! }
//!
//! impl_tag_conversions!(Priority {
//!     Interactive => "interactive",
//!     Deferred => "deferred",
//! });
//!
//! assert_eq!(Priority::Deferred.to_string(), "deferred");
//! ```

/// Implements Display and FromStr traits for tag enums
///
/// This macro generates:
/// - Display trait: writes the variant's tag
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations
///
/// # Features
///
/// - Case-insensitive parsing (e.g., "LONG", "long", "Long" all work)
/// - Consistent lowercase string output
/// - Descriptive error messages with enum name
#[macro_export]
macro_rules! impl_tag_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
