//! This module contains the join of two intersecting sub-conditions.
//!
//! The join of `a` and `b` is the set of assignments that satisfy both, where
//! `b` has priority on the addresses they share: `b` comes from a branch that
//! sits later on the path than `a`, and so its values are the more specific.

use itertools::iproduct;

use crate::{
    condition::{Config, SubCondition},
    data::{difference, intersect, AddressSet, AssignmentSet},
    error::{
        condition::{Error, Result},
        container::Locatable,
    },
    trace::BranchHandle,
};

/// The three-way split of the domains of two sub-conditions.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Domains {
    /// The addresses bound by only the first sub-condition.
    pub first_only: AddressSet,

    /// The addresses bound by both sub-conditions.
    pub shared: AddressSet,

    /// The addresses bound by only the second sub-condition.
    pub second_only: AddressSet,
}

impl Domains {
    /// Splits the domains of `a` and `b`.
    #[must_use]
    pub fn split(a: &AddressSet, b: &AddressSet) -> Self {
        let first_only = difference(a, b);
        let shared = intersect(a, b);
        let second_only = difference(b, a);
        Self {
            first_only,
            shared,
            second_only,
        }
    }
}

/// Joins the sub-condition `a` with the later sub-condition `b`.
///
/// The resulting assignments are the cartesian product of `a` projected onto
/// the addresses only it binds, `b` projected onto the shared addresses, and
/// `b` projected onto the addresses only it binds. The resulting branches are
/// those of `a` followed by any of `b` not already present.
///
/// # Errors
///
/// Returns [`Err`] if a projection finds an assignment map that does not bind
/// its sub-condition's full domain, or if the product would exceed
/// [`Config::maximum_assignments_per_condition`].
pub fn join(a: &SubCondition, b: &SubCondition, config: &Config) -> Result<SubCondition> {
    let domains = Domains::split(&a.domain(), &b.domain());

    let maps_adb = a.assignments().project(&domains.first_only).locate(a.location())?;
    // The values for the shared addresses come from `b`, as it has priority.
    let maps_aib = b.assignments().project(&domains.shared).locate(b.location())?;
    let maps_bda = b.assignments().project(&domains.second_only).locate(b.location())?;

    let requested = maps_adb
        .len()
        .saturating_mul(maps_aib.len())
        .saturating_mul(maps_bda.len());
    let limit = config.maximum_assignments_per_condition;
    if requested > limit {
        return Err(Error::AssignmentLimitExceeded { requested, limit }.locate(b.location()));
    }

    let assignments: AssignmentSet = iproduct!(&maps_adb, &maps_aib, &maps_bda)
        .map(|(adb, aib, bda)| adb.clone().union(aib).union(bda))
        .collect();
    let branches = join_branches(a.branches(), b.branches());

    Ok(SubCondition::new(assignments.dedup(), branches))
}

/// Concatenates `a` with the branches of `b` that are not already in `a`.
#[must_use]
pub fn join_branches(a: &[BranchHandle], b: &[BranchHandle]) -> Vec<BranchHandle> {
    let mut joined = a.to_vec();
    joined.extend(b.iter().filter(|branch| !a.contains(branch)).cloned());
    joined
}
