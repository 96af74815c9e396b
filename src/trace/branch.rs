//! This module contains the records kept for conditional direct branches and
//! the registry that owns them.

use std::{
    collections::BTreeMap,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::data::{Address, AssignmentSet};

/// The pair of alternative assignment sets discovered for a resolved branch,
/// one for each of its outcomes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    /// The assignments under which the branch takes its first outcome.
    pub first: AssignmentSet,

    /// The assignments under which the branch takes its second outcome.
    pub second: AssignmentSet,
}

/// Metadata for one conditional direct branch instruction.
///
/// A record is identified by the address of its branch instruction. It is
/// created unresolved when the branch is first observed, and replaced by a
/// resolved record once its controlling inputs are known. The condition
/// calculation only ever reads these records.
#[derive(Clone, Debug)]
pub struct BranchRecord {
    address:    Address,
    resolution: Option<Resolution>,
}

impl BranchRecord {
    /// Constructs a record for the branch at `address` whose controlling
    /// inputs are not yet known.
    #[must_use]
    pub fn unresolved(address: Address) -> Self {
        let resolution = None;
        Self {
            address,
            resolution,
        }
    }

    /// Constructs a record for the branch at `address` that takes its first
    /// outcome under the assignments in `first` and its second outcome under
    /// those in `second`.
    #[must_use]
    pub fn resolved(address: Address, first: AssignmentSet, second: AssignmentSet) -> Self {
        let resolution = Some(Resolution { first, second });
        Self {
            address,
            resolution,
        }
    }

    /// Gets the address of the branch instruction.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Checks if the branch has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Gets the resolution of the branch, if it has one.
    #[must_use]
    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    /// Gets the assignments selected by a path code bit of `taken`, where
    /// `false` selects the first outcome and `true` the second.
    ///
    /// Returns [`None`] if the branch is unresolved.
    #[must_use]
    pub fn projections(&self, taken: bool) -> Option<&AssignmentSet> {
        self.resolution
            .as_ref()
            .map(|r| if taken { &r.second } else { &r.first })
    }
}

/// Records are identified by their branch address alone.
impl PartialEq for BranchRecord {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for BranchRecord {}

impl Hash for BranchRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

/// A shared, immutable, handle to a [`BranchRecord`].
pub type BranchHandle = Arc<BranchRecord>;

/// The interface through which condition calculation finds the record for a
/// conditional branch.
pub trait BranchLookup {
    /// Gets the record for the branch instruction at `address`, if one has been
    /// registered.
    #[must_use]
    fn resolve_branch_record(&self, address: Address) -> Option<&BranchHandle>;
}

/// The path-independent store of every branch record observed so far.
///
/// It is constructed explicitly by whoever drives the tracing, and lent to the
/// condition calculation by reference. Paths only ever hold [`BranchHandle`]s
/// into it.
#[derive(Clone, Debug, Default)]
pub struct BranchRegistry {
    records: BTreeMap<Address, BranchHandle>,
}

impl BranchRegistry {
    /// Creates a new, empty, registry.
    #[must_use]
    pub fn new() -> Self {
        let records = BTreeMap::new();
        Self { records }
    }

    /// Inserts `record` into the registry, replacing any record previously
    /// registered for the same address.
    ///
    /// Handles to a replaced record stay valid and keep seeing the old data.
    pub fn insert(&mut self, record: BranchRecord) -> BranchHandle {
        let handle = Arc::new(record);
        self.records.insert(handle.address(), handle.clone());
        handle
    }

    /// Registers the branch at `address` as observed but not yet resolved,
    /// unless a record already exists for it.
    pub fn observe(&mut self, address: Address) -> BranchHandle {
        self.records
            .entry(address)
            .or_insert_with(|| Arc::new(BranchRecord::unresolved(address)))
            .clone()
    }

    /// Resolves the branch at `address` with the assignment sets for its two
    /// outcomes.
    pub fn resolve(
        &mut self,
        address: Address,
        first: AssignmentSet,
        second: AssignmentSet,
    ) -> BranchHandle {
        self.insert(BranchRecord::resolved(address, first, second))
    }

    /// Gets the record for `address`, if any.
    #[must_use]
    pub fn get(&self, address: Address) -> Option<&BranchHandle> {
        self.records.get(&address)
    }

    /// Gets the number of branches in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks if the registry holds no branches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Gets the number of registered branches that have been resolved.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.records.values().filter(|r| r.is_resolved()).count()
    }

    /// Iterates over the records in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &BranchHandle> {
        self.records.values()
    }
}

impl BranchLookup for BranchRegistry {
    fn resolve_branch_record(&self, address: Address) -> Option<&BranchHandle> {
        self.get(address)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{
        data::{Address, AssignmentMap, AssignmentSet},
        trace::branch::{BranchLookup, BranchRecord, BranchRegistry},
    };

    fn outcome(value: u8) -> AssignmentSet {
        AssignmentSet::from(vec![AssignmentMap::from([(0x10, value)])])
    }

    #[test]
    fn projections_follow_the_path_code_bit() {
        let record = BranchRecord::resolved(Address::new(0x400), outcome(0), outcome(1));

        assert_eq!(record.projections(false), Some(&outcome(0)));
        assert_eq!(record.projections(true), Some(&outcome(1)));
        assert!(BranchRecord::unresolved(Address::new(0x400)).projections(false).is_none());
    }

    #[test]
    fn records_are_identified_by_address() {
        let a = BranchRecord::resolved(Address::new(0x400), outcome(0), outcome(1));
        let b = BranchRecord::unresolved(Address::new(0x400));

        assert_eq!(a, b);
        assert_ne!(a, BranchRecord::unresolved(Address::new(0x401)));
    }

    #[test]
    fn observing_does_not_overwrite_resolution() {
        let mut registry = BranchRegistry::new();
        registry.resolve(Address::new(0x400), outcome(0), outcome(1));
        let handle = registry.observe(Address::new(0x400));

        assert!(handle.is_resolved());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolved_count(), 1);
    }

    #[test]
    fn resolving_leaves_existing_handles_untouched() {
        let mut registry = BranchRegistry::new();
        let old = registry.observe(Address::new(0x400));
        let new = registry.resolve(Address::new(0x400), outcome(0), outcome(1));

        assert!(!old.is_resolved());
        assert!(new.is_resolved());
        let looked_up = registry
            .resolve_branch_record(Address::new(0x400))
            .expect("Branch was registered");
        assert!(Arc::ptr_eq(looked_up, &new));
        assert!(registry.resolve_branch_record(Address::new(0x404)).is_none());
    }
}
