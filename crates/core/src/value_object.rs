//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// A requested order line `(product, quantity)` or a purchaser reference has no
/// identity of its own; two of them with the same fields are interchangeable.
/// Entities (see [`crate::Entity`]) are the opposite case.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct LineRequest { product_id: ProductId, quantity: u32 }
///
/// impl ValueObject for LineRequest {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
