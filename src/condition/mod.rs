//! This module contains the path-condition algebra: the sub-condition and path
//! condition types, the derivation of a raw condition from an execution path,
//! the join of two sub-conditions, and the stabilizer that merges a raw
//! condition into a cartesian product of independent sub-conditions.
//!
//! # How it Works
//!
//! 1. Every resolved conditional branch on a path contributes one
//!    [`SubCondition`], holding the assignments selected by its path code bit.
//! 2. The [`Stabilizer`] repeatedly [`join`]s the first pair of sub-conditions
//!    whose domains intersect, until no such pair is left.
//! 3. The result is a [`PathCondition`] whose sub-conditions have pairwise
//!    disjoint domains, and hence denote independent constraints.

pub mod join;
pub mod record;
pub mod stabilize;

use std::collections::BTreeMap;

use tracing::trace;

pub use crate::condition::{
    join::join,
    record::{Binding, PathConditionRecord, SubConditionRecord},
    stabilize::Stabilizer,
};
use crate::{
    constant::DEFAULT_MAXIMUM_ASSIGNMENTS_PER_CONDITION,
    data::{Address, AddressSet, AssignmentSet},
    error::{self, container::Locatable},
    trace::{BranchHandle, BranchLookup, DynInstruction, PathCode},
};

/// An assignment set paired with the branches that contributed it.
///
/// Two sub-conditions are identical when their assignment sets are
/// structurally equal and their branch lists hold the same branches in the
/// same order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubCondition {
    assignments: AssignmentSet,
    branches:    Vec<BranchHandle>,
}

impl SubCondition {
    /// Constructs a new sub-condition from its `assignments` and the
    /// `branches` that produced them.
    #[must_use]
    pub fn new(assignments: AssignmentSet, branches: Vec<BranchHandle>) -> Self {
        Self {
            assignments,
            branches,
        }
    }

    /// Gets the alternative assignments under which the sub-condition holds.
    #[must_use]
    pub fn assignments(&self) -> &AssignmentSet {
        &self.assignments
    }

    /// Gets the branches that contributed to the sub-condition.
    #[must_use]
    pub fn branches(&self) -> &[BranchHandle] {
        self.branches.as_slice()
    }

    /// Gets the domain of the sub-condition as given by its representative
    /// assignment map.
    #[must_use]
    pub fn domain(&self) -> AddressSet {
        self.assignments.domain()
    }

    /// Gets every address bound by any of the sub-condition's assignment maps.
    #[must_use]
    pub fn bound_addresses(&self) -> AddressSet {
        self.assignments.iter().flat_map(|m| m.keys()).collect()
    }

    /// Checks if the domains of `self` and `other` share an address.
    ///
    /// All the maps in a sub-condition share one domain, so only the
    /// representative maps are compared.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        match (
            self.assignments.representative(),
            other.assignments.representative(),
        ) {
            (Some(a), Some(b)) => a.shares_address_with(b),
            _ => false,
        }
    }

    /// Gets the address used to locate errors about this sub-condition, which
    /// is the address of its first contributing branch.
    #[must_use]
    pub fn location(&self) -> Address {
        self.branches.first().map(|b| b.address()).unwrap_or_default()
    }
}

/// The stabilized condition of one execution path.
///
/// Once produced by the [`Stabilizer`], no two of its sub-conditions bind a
/// common address, so the condition is the cartesian product of its
/// sub-conditions.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathCondition {
    sub_conditions: Vec<SubCondition>,
}

impl PathCondition {
    /// Gets the sub-conditions, in path order of their latest contribution.
    #[must_use]
    pub fn sub_conditions(&self) -> &[SubCondition] {
        self.sub_conditions.as_slice()
    }

    /// Gets the number of independent sub-conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sub_conditions.len()
    }

    /// Checks if the path is unconstrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sub_conditions.is_empty()
    }

    /// Iterates over the sub-conditions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, SubCondition> {
        self.sub_conditions.iter()
    }

    /// Checks that no two sub-conditions bind a common address in any of their
    /// assignment maps.
    #[must_use]
    pub fn has_disjoint_domains(&self) -> bool {
        let domains: Vec<AddressSet> = self
            .sub_conditions
            .iter()
            .map(SubCondition::bound_addresses)
            .collect();

        domains.iter().enumerate().all(|(i, a)| {
            domains[i + 1..].iter().all(|b| a.is_disjoint(b))
        })
    }

    /// Gets the number of distinct assignments the condition denotes, which is
    /// the product of the sizes of its sub-conditions.
    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.sub_conditions
            .iter()
            .map(|s| s.assignments().len())
            .fold(1, usize::saturating_mul)
    }

    /// Consumes the condition, returning its sub-conditions.
    #[must_use]
    pub fn into_sub_conditions(self) -> Vec<SubCondition> {
        self.sub_conditions
    }
}

impl From<Vec<SubCondition>> for PathCondition {
    fn from(sub_conditions: Vec<SubCondition>) -> Self {
        Self { sub_conditions }
    }
}

impl<'a> IntoIterator for &'a PathCondition {
    type IntoIter = std::slice::Iter<'a, SubCondition>;
    type Item = &'a SubCondition;

    fn into_iter(self) -> Self::IntoIter {
        self.sub_conditions.iter()
    }
}

/// Builds the raw, unstabilized, condition for the instructions in `content`
/// executed under the path `code`.
///
/// Each conditional direct branch consumes one bit of `code`, in order. A
/// branch that is unresolved, or unknown to `branches`, contributes nothing
/// but still consumes its bit so later branches stay aligned with the code.
///
/// # Errors
///
/// Returns [`Err`] if a resolved branch needs a bit beyond the end of `code`.
pub fn derive_raw_condition<L>(
    content: &BTreeMap<usize, DynInstruction>,
    code: &PathCode,
    branches: &L,
) -> error::trace::Result<Vec<SubCondition>>
where
    L: BranchLookup + ?Sized,
{
    let mut raw_condition = Vec::new();
    let mut code_order = 0;

    for instruction in content.values().filter(|i| i.is_conditional_direct_branch()) {
        let address = instruction.address();
        let record = branches
            .resolve_branch_record(address)
            .filter(|r| r.is_resolved());

        if let Some(record) = record {
            let taken = code
                .get(code_order)
                .ok_or(error::trace::Error::PathCodeExhausted {
                    required:  code_order,
                    available: code.len(),
                })
                .locate(address)?;

            if let Some(projections) = record.projections(taken) {
                raw_condition.push(SubCondition::new(projections.dedup(), vec![record.clone()]));
            }
        } else {
            trace!(%address, code_order, "skipping unresolved branch");
        }

        code_order += 1;
    }

    Ok(raw_condition)
}

/// The configuration for condition calculation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum number of assignment maps that joining two sub-conditions
    /// may produce.
    ///
    /// Exceeding it aborts the calculation for that path.
    ///
    /// Defaults to [`DEFAULT_MAXIMUM_ASSIGNMENTS_PER_CONDITION`].
    pub maximum_assignments_per_condition: usize,
}

impl Config {
    /// Sets the `maximum_assignments_per_condition` config parameter to
    /// `value`.
    #[must_use]
    pub fn with_maximum_assignments_per_condition(mut self, value: usize) -> Self {
        self.maximum_assignments_per_condition = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let maximum_assignments_per_condition = DEFAULT_MAXIMUM_ASSIGNMENTS_PER_CONDITION;
        Self {
            maximum_assignments_per_condition,
        }
    }
}
