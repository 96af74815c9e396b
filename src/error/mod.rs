//! This module contains the primary error type for the library's interface.
//! It also re-exports the more specific error types that are
//! subsystem-specific.

pub mod condition;
pub mod container;
pub mod trace;

use thiserror::Error;

use crate::data::Address;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Subsystems should return the more-specific
/// child error types as appropriate.
pub type Result<T> = std::result::Result<T, Errors>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by the
/// clients of the library) should be members of this enum.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Errors from deriving and stabilizing path conditions.
    #[error(transparent)]
    Condition(#[from] condition::Error),

    /// Errors from walking the execution trace.
    #[error(transparent)]
    Trace(#[from] trace::Error),

    /// An unknown error, represented as a string.
    #[error("Unknown Error: {_0:?}")]
    Other(String),
}

impl Error {
    /// Constructs an unknown error with the provided `message`.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

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

/// A library error with an associated address in the traced program.
pub type LocatedError = container::Located<Error>;

/// A container of errors that may occur in the library.
pub type Errors = container::Errors<LocatedError>;

/// Allow simple conversions from located condition errors by re-wrapping the
/// located error around the more general payload.
impl From<condition::LocatedError> for LocatedError {
    fn from(value: condition::LocatedError) -> Self {
        let location = value.location;
        let payload = Error::from(value.payload);
        Self { location, payload }
    }
}

/// Allow simple conversions from located condition errors by re-wrapping the
/// located error around the more general payload in the Errors container.
impl From<condition::LocatedError> for Errors {
    fn from(value: condition::LocatedError) -> Self {
        let re_wrapped: LocatedError = value.into();
        re_wrapped.into()
    }
}

/// Allow simple conversions from located trace errors by re-wrapping the
/// located error around the more general payload.
impl From<trace::LocatedError> for LocatedError {
    fn from(value: trace::LocatedError) -> Self {
        let location = value.location;
        let payload = Error::from(value.payload);
        Self { location, payload }
    }
}

/// Allow simple conversions from located trace errors by re-wrapping the
/// located error around the more general payload in the Errors container.
impl From<trace::LocatedError> for Errors {
    fn from(value: trace::LocatedError) -> Self {
        let re_wrapped: LocatedError = value.into();
        re_wrapped.into()
    }
}

/// Allow conversion from the condition errors container to the general errors
/// container.
impl From<condition::Errors> for Errors {
    fn from(value: condition::Errors) -> Self {
        let errs: Vec<condition::LocatedError> = value.into();
        let new_errs: Vec<LocatedError> = errs.into_iter().map(std::convert::Into::into).collect();

        new_errs.into()
    }
}
