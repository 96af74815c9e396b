//! This module contains the data model of variable assignments that path
//! conditions are built from.
//!
//! An [`AssignmentMap`] is one conjunction of `address = value` bindings, and
//! an [`AssignmentSet`] is a disjunction of such conjunctions.

pub mod assignment;

use std::{collections::BTreeSet, fmt::Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use crate::data::assignment::{AssignmentMap, AssignmentSet};

/// An opaque key identifying a memory location or register in the traced
/// program.
///
/// Addresses are totally ordered, and that order is what every set operation
/// in the library relies on.
#[derive(
    Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct Address(u64);

impl Address {
    /// Constructs a new address from the raw `value`.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Gets the raw value of the address.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Address> for u64 {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// An ordered set of addresses, used as the domain of an assignment map.
pub type AddressSet = BTreeSet<Address>;

/// Computes the ordered intersection of the address sets `a` and `b`.
#[must_use]
pub fn intersect(a: &AddressSet, b: &AddressSet) -> AddressSet {
    a.intersection(b).copied().collect()
}

/// Computes the addresses in `a` that are not in `b`, in order.
#[must_use]
pub fn difference(a: &AddressSet, b: &AddressSet) -> AddressSet {
    a.difference(b).copied().collect()
}

/// An opaque datum observed at an [`Address`].
///
/// The width is not fixed, and two values are equal only if they have the
/// same bytes.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Value(Vec<u8>);

impl Value {
    /// Constructs a new value from the provided `bytes`.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Gets the bytes that make up the value.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Gets the width of the value in bytes.
    #[must_use]
    pub fn width(&self) -> usize {
        self.0.len()
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

/// Values are serialized as hex strings so that records stay readable.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod test {
    use crate::data::{difference, intersect, Address, AddressSet, Value};

    fn set(addresses: &[u64]) -> AddressSet {
        addresses.iter().copied().map(Address::new).collect()
    }

    #[test]
    fn addresses_display_as_hex() {
        assert_eq!(Address::new(0x1000).to_string(), "0x1000");
    }

    #[test]
    fn values_display_as_hex() {
        assert_eq!(Value::new(vec![0xde, 0xad]).to_string(), "0xdead");
    }

    #[test]
    fn can_intersect_address_sets() {
        let a = set(&[1, 2, 3]);
        let b = set(&[2, 3, 4]);

        assert_eq!(intersect(&a, &b), set(&[2, 3]));
        assert_eq!(intersect(&a, &set(&[])), set(&[]));
    }

    #[test]
    fn can_take_difference_of_address_sets() {
        let a = set(&[1, 2, 3]);
        let b = set(&[2, 3, 4]);

        assert_eq!(difference(&a, &b), set(&[1]));
        assert_eq!(difference(&b, &a), set(&[4]));
        assert_eq!(difference(&a, &a), set(&[]));
    }
}
