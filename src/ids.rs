//! Typed Identifiers
//!
//! Backend identifiers are opaque strings. Wrapping them in a marker-typed
//! newtype keeps a variant id from ever being passed where an address id is
//! expected.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque identifier tagged with the kind of thing it identifies.
pub struct TypedId<T>(String, PhantomData<fn() -> T>);

/// Marker for product variant identifiers.
#[derive(Debug)]
pub enum Variant {}

/// Marker for delivery address identifiers.
#[derive(Debug)]
pub enum Address {}

/// Marker for order identifiers.
#[derive(Debug)]
pub enum Order {}

/// Product variant identifier, unique within a cart.
pub type VariantId = TypedId<Variant>;

/// Delivery address identifier.
pub type AddressId = TypedId<Address>;

/// Server-assigned order identifier.
pub type OrderId = TypedId<Order>;

impl<T> TypedId<T> {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into(), PhantomData)
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Unwrap into the raw identifier.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl<T> Clone for TypedId<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<T> Debug for TypedId<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Debug::fmt(&self.0, f)
    }
}

impl<T> Display for TypedId<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

impl<T> PartialEq for TypedId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for TypedId<T> {}

impl<T> Hash for TypedId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> PartialOrd for TypedId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for TypedId<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> From<String> for TypedId<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T> From<&str> for TypedId<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T> Serialize for TypedId<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de, T> Deserialize<'de> for TypedId<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn blank_ids_are_detected() {
        assert!(VariantId::new("  ").is_blank());
        assert!(!VariantId::new("sku-1").is_blank());
    }

    #[test]
    fn ids_serialise_as_plain_strings() -> TestResult {
        let id: OrderId = serde_json::from_str("\"ord_42\"")?;

        assert_eq!(id.as_str(), "ord_42");
        assert_eq!(serde_json::to_string(&id)?, "\"ord_42\"");

        Ok(())
    }
}
