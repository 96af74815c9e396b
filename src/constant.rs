//! This module contains constants that are needed throughout the codebase.

/// The default number of fixpoint passes (or paths, for the explorer) that
/// will be processed before polling the watchdog.
pub const DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS: usize = 100;

/// The default maximum number of assignment maps that a single joined
/// sub-condition may contain.
///
/// Joining two sub-conditions produces the cartesian product of three
/// projections, so the count can grow multiplicatively with every merge.
pub const DEFAULT_MAXIMUM_ASSIGNMENTS_PER_CONDITION: usize = 65_536;

/// The default value for whether the explorer calculates the conditions of
/// independent execution paths in parallel.
pub const DEFAULT_PARALLEL_PATHS_ENABLED: bool = true;

/// The character used to render a path code bit selecting the first outcome
/// of a branch.
pub const PATH_CODE_FIRST_OUTCOME: char = '0';

/// The character used to render a path code bit selecting the second outcome
/// of a branch.
pub const PATH_CODE_SECOND_OUTCOME: char = '1';
