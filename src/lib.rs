//! This library calculates the path conditions of execution paths recorded
//! from a traced binary. A path condition describes the inputs under which the
//! program would follow exactly that path, as a product of independent
//! disjunctions of concrete `address = value` assignments.
//!
//! Note that this library does not discover which inputs control a branch. It
//! consumes branch records produced by the exploration that walks the trace,
//! and combines them into conditions.
//!
//! # How it Works
//!
//! From a very high level, the condition of a path is calculated as follows:
//!
//! 1. The exploration observes every conditional direct branch and records it
//!    in a [`trace::BranchRegistry`], later resolving it with the
//!    [`data::AssignmentSet`]s under which each of its outcomes is taken.
//! 2. A finished path is handed over as a [`trace::ExecutionPath`], holding the
//!    walked instructions and the [`trace::PathCode`] of branch outcomes.
//! 3. Each resolved branch on the path contributes one
//!    [`condition::SubCondition`], selected by its code bit, giving the raw
//!    condition of the path.
//! 4. The [`condition::Stabilizer`] joins sub-conditions that constrain a
//!    common address until none do, giving the [`condition::PathCondition`].
//! 5. The [`explorer::Explorer`] does this for a whole batch of paths, in
//!    parallel if configured to, and collects the errors of any paths that
//!    failed.
//!
//! # Basic Usage
//!
//! For the most basic usage of the library, it is sufficient to construct an
//! [`explorer::Explorer`], register the branches, and call
//! `.calculate_exec_path_conditions` on your paths.
//!
//! ```
//! use path_condition::{
//!     data::{Address, AssignmentMap, AssignmentSet},
//!     explorer::{Config, Explorer},
//!     trace::{ExecutionPath, Instruction},
//!     watchdog::LazyWatchdog,
//! };
//!
//! let mut explorer = Explorer::new(Config::default(), LazyWatchdog.in_arc());
//! explorer.registry_mut().resolve(
//!     Address::new(0x40_1000),
//!     AssignmentSet::from(vec![AssignmentMap::from([(0x10, 0)])]),
//!     AssignmentSet::from(vec![AssignmentMap::from([(0x10, 1)])]),
//! );
//!
//! let mut paths = vec![ExecutionPath::from_instructions(
//!     [Instruction::conditional_branch(Address::new(0x40_1000), "jz 0x401010").in_arc()],
//!     "1".parse().unwrap(),
//! )];
//! explorer.calculate_exec_path_conditions(&mut paths).unwrap();
//!
//! let condition = paths[0].condition().unwrap();
//! assert_eq!(condition.len(), 1);
//! assert_eq!(condition.assignment_count(), 1);
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod condition;
pub mod constant;
pub mod data;
pub mod error;
pub mod explorer;
pub mod trace;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use condition::{PathCondition, SubCondition};
pub use explorer::{calculate_exec_path_conditions, Explorer};
pub use trace::ExecutionPath;
