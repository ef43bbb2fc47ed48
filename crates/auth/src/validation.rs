//! Input validation as value objects.
//!
//! Every string that crosses into the core is wrapped here first. A value that
//! is empty (or only whitespace), longer than its limit, or carries control
//! characters is `InvalidInput`. Ban reasons may contain line breaks and tabs.
//! Accepted values are stored exactly as given: no trimming, no case folding.

use serde::Serialize;

use gatekeep_core::{DomainError, DomainResult, ValueObject};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_REASON_CHARS: usize = 500;
pub const MAX_USER_REF_CHARS: usize = 255;

fn allowed_control(c: char, multiline: bool) -> bool {
    multiline && matches!(c, '\n' | '\r' | '\t')
}

fn check_bounded(raw: &str, what: &str, max_chars: usize, multiline: bool) -> DomainResult<()> {
    if raw.trim().is_empty() {
        return Err(DomainError::invalid_input(format!("{what} cannot be empty")));
    }
    let len = raw.chars().count();
    if len > max_chars {
        return Err(DomainError::invalid_input(format!(
            "{what} must be at most {max_chars} characters (got {len})"
        )));
    }
    if raw.chars().any(|c| c.is_control() && !allowed_control(c, multiline)) {
        return Err(DomainError::invalid_input(format!(
            "{what} cannot contain control characters"
        )));
    }
    Ok(())
}

/// Key for a read-side lookup by name.
///
/// Blank input is `InvalidInput`. Otherwise returns `None` when `raw` could
/// never have passed validation (too long, control characters), so the caller
/// can answer `NotFound` without asking the store.
pub fn lookup_key<'a>(raw: &'a str, what: &str, max_chars: usize) -> DomainResult<Option<&'a str>> {
    match check_bounded(raw, what, max_chars, false) {
        Ok(()) => Ok(Some(raw)),
        Err(_) if !raw.trim().is_empty() => Ok(None),
        Err(e) => Err(e),
    }
}

macro_rules! bounded_text {
    ($(#[$meta:meta])* $t:ident, $what:literal, $max:expr, $multiline:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $t(String);

        impl $t {
            pub fn parse(raw: impl Into<String>) -> DomainResult<Self> {
                let raw = raw.into();
                check_bounded(&raw, $what, $max, $multiline)?;
                Ok(Self(raw))
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ValueObject for $t {
            fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

bounded_text!(
    /// Display name of a role (unique, case-sensitive).
    RoleName,
    "role name",
    MAX_NAME_CHARS,
    false
);

bounded_text!(
    /// Name of a permission (unique, case-sensitive).
    PermissionName,
    "permission name",
    MAX_NAME_CHARS,
    false
);

bounded_text!(
    /// Free-text justification attached to a ban.
    BanReason,
    "ban reason",
    MAX_REASON_CHARS,
    true
);

bounded_text!(
    /// Opaque identifier of a user owned by another service.
    UserRef,
    "user id",
    MAX_USER_REF_CHARS,
    false
);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_and_preserves_raw_value() {
        let name = RoleName::parse("  Player ").unwrap();
        assert_eq!(name.as_str(), "  Player ");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert!(matches!(RoleName::parse(""), Err(DomainError::InvalidInput(_))));
        assert!(matches!(PermissionName::parse("   \t"), Err(DomainError::InvalidInput(_))));
        assert!(matches!(BanReason::parse(""), Err(DomainError::InvalidInput(_))));
        assert!(matches!(UserRef::parse("\n"), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn error_message_names_the_field() {
        let err = BanReason::parse("").unwrap_err();
        assert_eq!(err.to_string(), "invalid input: ban reason cannot be empty");
    }

    #[test]
    fn length_limit_counts_chars_not_bytes() {
        let hundred_umlauts = "ä".repeat(MAX_NAME_CHARS);
        assert!(PermissionName::parse(hundred_umlauts.clone()).is_ok());
        assert!(PermissionName::parse(format!("{hundred_umlauts}x")).is_err());
    }

    #[test]
    fn reason_allows_longer_text_than_names() {
        let text = "r".repeat(MAX_REASON_CHARS);
        assert!(BanReason::parse(text.clone()).is_ok());
        assert!(RoleName::parse(text).is_err());
    }

    #[test]
    fn rejects_nul_and_control_characters() {
        assert!(matches!(RoleName::parse("a\0b"), Err(DomainError::InvalidInput(_))));
        assert!(matches!(PermissionName::parse("ban\u{7f}"), Err(DomainError::InvalidInput(_))));
        assert!(matches!(UserRef::parse("alice\n"), Err(DomainError::InvalidInput(_))));
        assert!(matches!(BanReason::parse("spam\0"), Err(DomainError::InvalidInput(_))));

        let err = RoleName::parse("a\0b").unwrap_err();
        assert_eq!(err.to_string(), "invalid input: role name cannot contain control characters");
    }

    #[test]
    fn reason_keeps_line_breaks_and_tabs() {
        let reason = BanReason::parse("spam\r\n\tin lobby").unwrap();
        assert_eq!(reason.as_str(), "spam\r\n\tin lobby");
    }

    #[test]
    fn lookup_key_only_rejects_blank() {
        assert!(matches!(
            lookup_key("  ", "role name", MAX_NAME_CHARS),
            Err(DomainError::InvalidInput(_))
        ));
        let long = "x".repeat(MAX_NAME_CHARS + 1);
        assert_eq!(lookup_key(&long, "role name", MAX_NAME_CHARS).unwrap(), None);
        assert_eq!(lookup_key("a\0b", "role name", MAX_NAME_CHARS).unwrap(), None);
        assert_eq!(lookup_key(" admin", "role name", MAX_NAME_CHARS).unwrap(), Some(" admin"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Any non-blank name within the limit is accepted unchanged.
        #[test]
        fn non_blank_names_round_trip(raw in "[a-zA-Z0-9_ .-]{0,100}") {
            let parsed = RoleName::parse(raw.clone());
            if raw.trim().is_empty() {
                prop_assert!(parsed.is_err());
            } else {
                prop_assert_eq!(parsed.unwrap().into_inner(), raw);
            }
        }

        /// Anything over the limit is rejected regardless of content.
        #[test]
        fn oversized_reasons_rejected(extra in 1usize..64) {
            let raw = "x".repeat(MAX_REASON_CHARS + extra);
            prop_assert!(matches!(BanReason::parse(raw), Err(DomainError::InvalidInput(_))));
        }
    }
}
