//! Domain models for Stockline.
//!
//! These are the core types shared across all crates. Closed enumerations
//! (roles, business/order types, statuses) are parsed at the boundary so
//! that illegal values never reach the policy or transaction logic.

/// Declares a closed enumeration with a canonical string form.
///
/// Parsing is case-insensitive and rejects unknown values with a
/// validation error.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::StocklineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        crate::error::StocklineError::validation(format!(
                            "unknown {}: {s:?}",
                            stringify!($name)
                        ))
                    })
            }
        }
    };
}

pub mod business;
pub mod order;
pub mod product;
pub mod tenant;
pub mod user;
