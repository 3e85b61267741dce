//! Macro for implementing Display and FromStr for token-backed enums
//!
//! Calendar enums travel as short textual tokens (`DAILY` in an RRULE,
//! `following` from a UI dialog, `hour` in a view config). This macro keeps
//! the token table in one place and generates both conversions from it.
//!
//! # Example
//!
//! ```rust
//! use calgrid_domain::impl_token_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Transparency {
//!     Opaque,
//!     Transparent,
//! }
//!
//! impl_token_conversions!(Transparency {
//!     Opaque => "OPAQUE",
//!     Transparent => "TRANSPARENT",
//! });
//!
//! assert_eq!(Transparency::Opaque.to_string(), "OPAQUE");
//! assert_eq!("transparent".parse::<Transparency>().unwrap(), Transparency::Transparent);
//! ```

/// Implements Display, FromStr and a `VARIANTS` table for token enums
///
/// - Display writes the token exactly as declared
/// - FromStr matches tokens ASCII case-insensitively and fails with
///   [`CalendarError::InvalidInput`](crate::errors::CalendarError)
#[macro_export]
macro_rules! impl_token_conversions {
    ($enum_name:ident { $($variant:ident => $token:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Every variant, in declaration order.
            pub const VARIANTS: &'static [$enum_name] = &[$(Self::$variant),+];

            /// The canonical token for this variant.
            pub const fn as_token(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_token())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::errors::CalendarError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($token) {
                        return Ok(Self::$variant);
                    }
                )+
                Err($crate::errors::CalendarError::InvalidInput(format!(
                    "Invalid {}: {}",
                    stringify!($enum_name),
                    s
                )))
            }
        }
    };
}
