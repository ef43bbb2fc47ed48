//! Value object trait: equality by value, not identity.
//!
//! Validated inputs (role names, permission names, ban reasons, external user
//! references) are value objects. Constructing one is the only way to get past
//! input validation, so holding one proves the value is well-formed.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one from a new raw value.
///
/// ```ignore
/// let a = RoleName::parse("admin")?;
/// let b = RoleName::parse("admin")?;
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {
    /// Borrow the underlying raw value.
    fn as_str(&self) -> &str;
}
