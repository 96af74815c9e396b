//! This module contains errors pertaining to the derivation and stabilization
//! of path conditions.

use thiserror::Error;

use crate::{data::Address, error::container};

/// Errors that occur while building, joining or stabilizing the
/// sub-conditions of a path condition.
///
/// All of these indicate a broken invariant in the inputs or in the
/// stabilizer itself rather than an expected runtime condition.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Assignment map does not agree with the domain of its set at {address}")]
    MalformedAssignment { address: Address },

    #[error(
        "Stabilization could not find the sub-condition expected at slot {expected_slot:?} in a \
         condition of length {length:?}"
    )]
    StabilizationInvariantViolation { expected_slot: usize, length: usize },

    #[error("Joining sub-conditions would produce {requested:?} assignments, exceeding {limit:?}")]
    AssignmentLimitExceeded { requested: usize, limit: usize },

    #[error("Condition calculation was stopped by the watchdog")]
    StoppedByWatchdog,
}

/// A condition error with an associated address in the traced program.
pub type LocatedError = container::Located<Error>;

/// A container of condition errors used for aggregation of errors across
/// paths.
pub type Errors = container::Errors<LocatedError>;

/// The result type for methods that may have condition errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, address: Address) -> Self::Located {
        container::Located {
            location: address,
            payload:  self,
        }
    }
}
