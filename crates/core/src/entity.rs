//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Roles, permissions and bans are entities: two records with the same id are
/// the same record even after a rename or a reason change.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
