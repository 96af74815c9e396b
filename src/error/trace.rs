//! This module contains errors pertaining to reading execution traces.

use thiserror::Error;

use crate::{data::Address, error::container};

/// Errors that occur while walking the content and path code of an
/// execution path.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("A resolved branch needs path code bit {required:?} but the code has {available:?} bits")]
    PathCodeExhausted { required: usize, available: usize },

    #[error("{_0:?} is not a valid path code symbol")]
    InvalidPathCodeSymbol(char),
}

/// A trace error with an associated address in the traced program.
pub type LocatedError = container::Located<Error>;

/// A container of trace errors.
pub type Errors = container::Errors<LocatedError>;

/// The result type for methods that may have trace errors.
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
