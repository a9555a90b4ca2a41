//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are replaced rather than modified. A
/// postal address is the typical case:
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Address { city: String, street: String, zipcode: String }
///
/// impl ValueObject for Address {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
