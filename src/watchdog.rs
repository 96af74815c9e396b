//! This module contains the type definitions necessary to support the
//! monitoring functionality for condition calculation.
//!
//! # Best-Effort Monitoring
//!
//! Note that the monitoring provided by the watchdog is a best-effort approach.
//! The stabilizer polls it between fixpoint passes and the explorer polls it
//! between paths, so a single very large join will still run to completion
//! before the request to stop is observed.

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::constant::DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;

/// A dynamically dispatched [`Watchdog`] instance.
///
/// It is shared between worker threads when paths are processed in parallel.
pub type DynWatchdog = Arc<dyn Watchdog>;

/// The interface to an object that can be polled to see if condition
/// calculation needs to abort processing.
///
/// The interface is simple, but it can encapsulate arbitrary logic as far as
/// the library is concerned, allowing the client to implement complex stop
/// logic such as per-path deadlines.
pub trait Watchdog
where
    Self: Debug + Send + Sync,
{
    /// Checks if the computation should halt and return an error.
    #[must_use]
    fn should_stop(&self) -> bool;

    /// Gets the number of loop iterations that should pass before polling the
    /// watchdog.
    #[must_use]
    fn poll_every(&self) -> usize;
}

/// An implementation of the [`Watchdog`] trait that does not place any
/// restrictions on the computation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LazyWatchdog;

impl LazyWatchdog {
    /// Wraps `self` into an [`Arc`].
    #[must_use]
    pub fn in_arc(self) -> DynWatchdog {
        Arc::new(self)
    }
}

impl Watchdog for LazyWatchdog {
    fn should_stop(&self) -> bool {
        false
    }

    fn poll_every(&self) -> usize {
        // Something ridiculously huge so it basically never gets checked.
        1_000_000_000_000
    }
}

/// A watchdog that signals a stop based on a flag in the form of an atomic
/// boolean.
///
/// By default, it requests polling every
/// [`DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS`] iterations. This is configurable
/// by calling [`Self::polling_every`].
#[derive(Clone, Debug)]
pub struct FlagWatchdog {
    /// The flag that should be mutated externally to stop the computation.
    flag: Arc<AtomicBool>,

    /// The number of loop iterations to wait before polling the watchdog.
    poll_loop_iterations: usize,
}

impl FlagWatchdog {
    /// Constructs a new `FlagWatchdog` wrapping the provided `flag`.
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        let poll_loop_iterations = DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;
        Self {
            flag,
            poll_loop_iterations,
        }
    }

    /// Specifies the number of loop iterations to wait before polling the
    /// watchdog for status.
    ///
    /// A value of zero is treated as one.
    #[must_use]
    pub fn polling_every(mut self, iterations: usize) -> Self {
        self.poll_loop_iterations = iterations.max(1);
        self
    }

    /// Wraps the watchdog into an [`Arc`].
    #[must_use]
    pub fn in_arc(self) -> DynWatchdog {
        Arc::new(self)
    }
}

impl Watchdog for FlagWatchdog {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn poll_every(&self) -> usize {
        self.poll_loop_iterations
    }
}
