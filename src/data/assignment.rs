//! This module contains the assignment map and assignment set types, along
//! with the set algebra that the condition join is built on.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{
    data::{Address, AddressSet, Value},
    error::condition::Error,
};

/// One concrete conjunctive assignment of values to addresses.
///
/// The bindings are kept sorted by address, so two maps compare equal exactly
/// when they bind the same addresses to the same values, regardless of the
/// order in which those bindings were inserted.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct AssignmentMap {
    bindings: BTreeMap<Address, Value>,
}

impl AssignmentMap {
    /// Creates a new, empty, assignment map.
    #[must_use]
    pub fn new() -> Self {
        let bindings = BTreeMap::new();
        Self { bindings }
    }

    /// Binds `address` to `value`, returning the previous value if `address`
    /// was already bound.
    pub fn insert(&mut self, address: Address, value: Value) -> Option<Value> {
        self.bindings.insert(address, value)
    }

    /// Gets the value bound to `address`, if any.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&Value> {
        self.bindings.get(address)
    }

    /// Gets the number of bindings in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Checks if the map binds no addresses at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over the bindings in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Value)> {
        self.bindings.iter()
    }

    /// Gets the domain of the map.
    #[must_use]
    pub fn keys(&self) -> AddressSet {
        self.bindings.keys().copied().collect()
    }

    /// Checks if `self` and `other` bind the same addresses to the same
    /// values.
    #[must_use]
    pub fn identical(&self, other: &Self) -> bool {
        self.len() == other.len() && self.bindings.iter().eq(other.bindings.iter())
    }

    /// Checks if `self` and `other` bind at least one common address.
    #[must_use]
    pub fn shares_address_with(&self, other: &Self) -> bool {
        self.bindings.keys().any(|address| other.bindings.contains_key(address))
    }

    /// Builds a new map containing only the bindings for `keys`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any address in `keys` is not bound by `self`.
    pub fn project(&self, keys: &AddressSet) -> Result<Self, Error> {
        let bindings = keys
            .iter()
            .map(|address| {
                self.bindings
                    .get(address)
                    .map(|value| (*address, value.clone()))
                    .ok_or(Error::MalformedAssignment { address: *address })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self { bindings })
    }

    /// Adds all the bindings of `other` into `self`.
    ///
    /// The domains are expected to be disjoint, but where they are not the
    /// binding from `other` wins.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        self.bindings
            .extend(other.bindings.iter().map(|(address, value)| (*address, value.clone())));
        self
    }
}

impl<A, V> FromIterator<(A, V)> for AssignmentMap
where
    A: Into<Address>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (A, V)>>(iter: T) -> Self {
        let bindings = iter.into_iter().map(|(a, v)| (a.into(), v.into())).collect();
        Self { bindings }
    }
}

/// Builds a map from raw `(address, byte)` pairs, mostly for convenience in
/// tests and fixtures.
impl<const N: usize> From<[(u64, u8); N]> for AssignmentMap {
    fn from(value: [(u64, u8); N]) -> Self {
        value.into_iter().collect()
    }
}

/// A disjunction of alternative [`AssignmentMap`]s.
///
/// The set is ordered, and construction through [`Self::dedup`] or
/// [`Self::project`] keeps the first occurrence of each distinct map. All the
/// maps in a set produced by a single branch projection share one domain.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AssignmentSet {
    maps: Vec<AssignmentMap>,
}

impl AssignmentSet {
    /// Creates a new, empty, assignment set.
    #[must_use]
    pub fn new() -> Self {
        let maps = Vec::new();
        Self { maps }
    }

    /// Appends `map` to the set without checking for duplicates.
    pub fn push(&mut self, map: AssignmentMap) {
        self.maps.push(map);
    }

    /// Gets the number of maps in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Checks if the set contains no maps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Gets the maps in the set, in order.
    #[must_use]
    pub fn maps(&self) -> &[AssignmentMap] {
        self.maps.as_slice()
    }

    /// Iterates over the maps in the set, in order.
    pub fn iter(&self) -> std::slice::Iter<'_, AssignmentMap> {
        self.maps.iter()
    }

    /// Gets the representative map of the set, which is its first element.
    #[must_use]
    pub fn representative(&self) -> Option<&AssignmentMap> {
        self.maps.first()
    }

    /// Gets the domain of the set, as given by its representative map.
    ///
    /// An empty set has an empty domain.
    #[must_use]
    pub fn domain(&self) -> AddressSet {
        self.representative().map(AssignmentMap::keys).unwrap_or_default()
    }

    /// Checks that every map in the set binds exactly the addresses in the
    /// domain of the set.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] naming the first address on which some map disagrees
    /// with the representative.
    pub fn check_uniform_domain(&self) -> Result<(), Error> {
        let domain = self.domain();
        self.maps.iter().try_for_each(|map| {
            match map.keys().symmetric_difference(&domain).next() {
                Some(address) => Err(Error::MalformedAssignment { address: *address }),
                None => Ok(()),
            }
        })
    }

    /// Checks if some element of the set is identical to `map`.
    #[must_use]
    pub fn contains(&self, map: &AssignmentMap) -> bool {
        self.maps.iter().any(|m| m.identical(map))
    }

    /// Returns the set with duplicate maps removed, keeping the first
    /// occurrence of each.
    #[must_use]
    pub fn dedup(&self) -> Self {
        if self.maps.len() <= 1 {
            return self.clone();
        }

        self.maps.iter().unique().cloned().collect()
    }

    /// Projects every map in the set onto `keys`, removing any duplicates that
    /// the projection produces.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any map in the set does not bind every address in
    /// `keys`.
    pub fn project(&self, keys: &AddressSet) -> Result<Self, Error> {
        let projected = self
            .maps
            .iter()
            .map(|map| map.project(keys))
            .collect::<Result<Self, _>>()?;

        Ok(projected.dedup())
    }
}

impl From<Vec<AssignmentMap>> for AssignmentSet {
    fn from(maps: Vec<AssignmentMap>) -> Self {
        Self { maps }
    }
}

impl FromIterator<AssignmentMap> for AssignmentSet {
    fn from_iter<T: IntoIterator<Item = AssignmentMap>>(iter: T) -> Self {
        let maps = iter.into_iter().collect();
        Self { maps }
    }
}

impl<'a> IntoIterator for &'a AssignmentSet {
    type IntoIter = std::slice::Iter<'a, AssignmentMap>;
    type Item = &'a AssignmentMap;

    fn into_iter(self) -> Self::IntoIter {
        self.maps.iter()
    }
}

impl IntoIterator for AssignmentSet {
    type IntoIter = std::vec::IntoIter<AssignmentMap>;
    type Item = AssignmentMap;

    fn into_iter(self) -> Self::IntoIter {
        self.maps.into_iter()
    }
}
