//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every operation of the authorization core fails with exactly one of these
/// kinds. None of them is retried internally; `Unavailable` is the only kind a
/// caller may reasonably retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or empty argument (caller's fault).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced entity or relation does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness or duplicate-relation violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached or failed unexpectedly.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Stable machine-readable code (used by the HTTP boundary).
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Unavailable(_) => "unavailable",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(DomainError::invalid_input("x").code(), "invalid_input");
        assert_eq!(DomainError::not_found("x").code(), "not_found");
        assert_eq!(DomainError::conflict("x").code(), "conflict");
        assert_eq!(DomainError::unavailable("x").code(), "unavailable");
    }

    #[test]
    fn display_includes_message() {
        let err = DomainError::conflict("role 'admin' already exists");
        assert_eq!(err.to_string(), "conflict: role 'admin' already exists");
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }
}
