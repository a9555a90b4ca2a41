//! Entity trait: identity that survives state changes.

/// An object owned by an aggregate and distinguished by its id, not its values.
///
/// Order lines are entities: two lines for the same item at the same price are
/// still different lines.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
