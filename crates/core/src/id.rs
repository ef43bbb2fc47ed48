//! Strongly-typed identifiers used across the domain.
//!
//! All records are keyed by store-assigned serial numbers. Only strictly
//! positive values can ever name a stored record.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(i64);

/// Identifier of a permission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(i64);

/// Identifier of a user ban record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BanId(i64);

macro_rules! impl_serial_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }

            /// Reject identifiers that can never name a stored record.
            pub fn ensure_positive(self) -> Result<Self, DomainError> {
                if self.0 > 0 {
                    Ok(self)
                } else {
                    Err(DomainError::invalid_input(format!(
                        "{} must be positive (got {})",
                        $name, self.0
                    )))
                }
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_input(format!("{}: {}", $name, e)))?;
                Self(raw).ensure_positive()
            }
        }
    };
}

impl_serial_newtype!(RoleId, "role id");
impl_serial_newtype!(PermissionId, "permission id");
impl_serial_newtype!(BanId, "ban id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids() {
        let id: RoleId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_zero_negative_and_garbage() {
        assert!(matches!("0".parse::<PermissionId>(), Err(DomainError::InvalidInput(_))));
        assert!(matches!("-3".parse::<BanId>(), Err(DomainError::InvalidInput(_))));
        assert!(matches!("abc".parse::<RoleId>(), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn ensure_positive_names_the_kind() {
        let err = PermissionId::new(0).ensure_positive().unwrap_err();
        assert!(err.to_string().contains("permission id"));
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&RoleId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
