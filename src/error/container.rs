use std::fmt::Formatter;

use thiserror::Error;

use crate::data::Address;

/// An error that is localised to a particular address in the traced program,
/// usually the address of the branch or instruction being processed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The address in the traced program where the error occurred.
    pub location: Address,

    /// The error data
    pub payload: E,
}

/// Displays the error associated with the hexadecimal address where it
/// occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.location, self.payload)
    }
}

/// A trait for types that can have an address location attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached location.
    type Located;

    /// Attach the location described by `address` to the error.
    fn locate(self, address: Address) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, address: Address) -> Self::Located {
        self.map_err(|e| Located {
            location: address,
            payload:  e,
        })
    }
}

/// An error that is a collection of errors.
///
/// The order of the errors in the container is dependent on the contained type
/// `E`, but defaults to the order in which the errors were added to the
/// container.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Errors<E> {
    payloads: Vec<E>,
}

impl<E> Errors<E> {
    /// Creates a new container for errors.
    #[must_use]
    pub fn new() -> Self {
        let payloads = vec![];
        Self { payloads }
    }

    /// Gets the errors contained within this error.
    #[must_use]
    pub fn payloads(&self) -> &[E] {
        self.payloads.as_slice()
    }

    /// Gets the length of the errors container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Checks if the errors container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Errors<E>
where
    E: std::error::Error,
{
    /// Adds the provided `error` to the container.
    pub fn add(&mut self, error: E) {
        self.payloads.push(error);
    }

    /// Adds the multiple provided errors to the container.
    pub fn add_many(&mut self, errors: impl Into<Vec<E>>) {
        self.payloads.extend(errors.into());
    }
}

/// Where the locations are a known type, the container ensures that the errors
/// with locations are sorted in order of their address.
impl<E> Errors<Located<E>>
where
    E: std::error::Error + Clone,
{
    /// Adds an error `payload` at the specific `address`.
    pub fn add_located(&mut self, address: Address, payload: E) {
        let error = Located {
            location: address,
            payload,
        };
        self.payloads.push(error);
        self.sort();
    }

    /// Adds many errors to the container at once.
    pub fn add_many_located(&mut self, errors: impl Into<Vec<Located<E>>>) {
        self.payloads.extend(errors.into());
        self.sort();
    }

    /// Sorts the errors based on their address. The sort is stable, so errors
    /// at the same address keep their insertion order.
    fn sort(&mut self) {
        self.payloads.sort_by_key(|item| item.location);
    }
}

/// The default errors container is one containing no errors.
impl<E> Default for Errors<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Allow conversion from any error type to a container of errors.
impl<E> From<E> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: E) -> Self {
        let mut errors = Self::default();
        errors.add(value);
        errors
    }
}

/// Allow conversion from the errors container to a vector of errors.
impl<E> From<Errors<E>> for Vec<E>
where
    E: std::error::Error,
{
    fn from(value: Errors<E>) -> Self {
        value.payloads
    }
}

/// Allow conversion from a vector of errors to the errors container.
impl<E> From<Vec<E>> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: Vec<E>) -> Self {
        Self { payloads: value }
    }
}

/// Displays the errors in the sequence in which they occur in the container.
///
/// It has a header specifying how many errors occurred, and then prints one
/// error per line after that. This means that in the case where errors did
/// occur, the output of `fmt` is multi-line.
impl<E> std::fmt::Display for Errors<E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.payloads.is_empty() {
            write!(f, "Encountered no errors")?;
        } else {
            writeln!(f, "Encountered {} errors:", self.payloads.len())?;
            for error in &self.payloads {
                writeln!(f, "{error}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{
        data::Address,
        error::{
            condition::{self, Error},
            container::Locatable,
        },
    };

    #[test]
    fn located_errors_display_their_address() {
        let error = Error::StoppedByWatchdog.locate(Address::new(0x40_1000));
        assert_eq!(
            error.to_string(),
            "[0x401000]: Condition calculation was stopped by the watchdog"
        );
    }

    #[test]
    fn located_errors_are_kept_sorted_by_address() {
        let mut errors = condition::Errors::new();
        errors.add_located(Address::new(0x30), Error::StoppedByWatchdog);
        errors.add_located(
            Address::new(0x10),
            Error::MalformedAssignment {
                address: Address::new(0x20),
            },
        );

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.payloads()[0].location, Address::new(0x10));
        assert_eq!(errors.payloads()[1].location, Address::new(0x30));
    }

    #[test]
    fn results_can_be_located() {
        let result: Result<(), Error> = Err(Error::StoppedByWatchdog);
        let located = result.locate(Address::new(4)).unwrap_err();

        assert_eq!(located.location, Address::new(4));
        assert_eq!(located.payload, Error::StoppedByWatchdog);
    }
}
