//! This module contains the model of a recorded execution trace: the
//! instructions walked along a path, the path code that says which way each
//! conditional branch went, and the branch records that tie those branches to
//! the inputs controlling them.

pub mod branch;
pub mod instruction;

use std::{collections::BTreeMap, fmt::Formatter, str::FromStr};

use bitvec::vec::BitVec;
use tracing::debug;

pub use crate::trace::{
    branch::{BranchHandle, BranchLookup, BranchRecord, BranchRegistry, Resolution},
    instruction::{DynInstruction, Instruction, InstructionFlags, InstructionRecord, Register},
};
use crate::{
    condition::{self, PathCondition, Stabilizer},
    constant::{PATH_CODE_FIRST_OUTCOME, PATH_CODE_SECOND_OUTCOME},
    error,
};

/// The outcomes taken along a path, one bit per conditional direct branch in
/// the order the branches were encountered.
///
/// A `false` bit selects a branch's first outcome and a `true` bit its second.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct PathCode {
    bits: BitVec,
}

impl PathCode {
    /// Creates a new, empty, path code.
    #[must_use]
    pub fn new() -> Self {
        let bits = BitVec::new();
        Self { bits }
    }

    /// Appends the outcome of the next branch to the code.
    pub fn push(&mut self, taken: bool) {
        self.bits.push(taken);
    }

    /// Gets the bit for the branch at position `index`, if the code is long
    /// enough.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).map(|bit| *bit)
    }

    /// Gets the number of bits in the code.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Checks if the code has no bits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Iterates over the bits of the code in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().by_vals()
    }
}

impl FromIterator<bool> for PathCode {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        let bits = iter.into_iter().collect();
        Self { bits }
    }
}

impl From<Vec<bool>> for PathCode {
    fn from(value: Vec<bool>) -> Self {
        value.into_iter().collect()
    }
}

impl std::fmt::Display for PathCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.iter().try_for_each(|taken| {
            let symbol = if taken {
                PATH_CODE_SECOND_OUTCOME
            } else {
                PATH_CODE_FIRST_OUTCOME
            };
            write!(f, "{symbol}")
        })
    }
}

/// Parses a path code from a string of `0`s and `1`s.
impl FromStr for PathCode {
    type Err = error::trace::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .map(|symbol| match symbol {
                PATH_CODE_FIRST_OUTCOME => Ok(false),
                PATH_CODE_SECOND_OUTCOME => Ok(true),
                other => Err(error::trace::Error::InvalidPathCodeSymbol(other)),
            })
            .collect()
    }
}

/// One concrete path through the traced program.
///
/// The path owns its condition, which is calculated on demand from its content
/// and code with [`Self::calculate_condition`].
#[derive(Clone, Debug)]
pub struct ExecutionPath {
    /// The instructions walked, keyed by their position on the path.
    content: BTreeMap<usize, DynInstruction>,

    /// The outcomes taken by the conditional branches on the path.
    code: PathCode,

    /// The stabilized condition, once calculated.
    condition: Option<PathCondition>,
}

impl ExecutionPath {
    /// Constructs a new execution path over the provided `content` and `code`.
    #[must_use]
    pub fn new(content: BTreeMap<usize, DynInstruction>, code: PathCode) -> Self {
        let condition = None;
        Self {
            content,
            code,
            condition,
        }
    }

    /// Constructs a new execution path from `instructions` in the order they
    /// were walked.
    #[must_use]
    pub fn from_instructions(
        instructions: impl IntoIterator<Item = DynInstruction>,
        code: PathCode,
    ) -> Self {
        let content = instructions.into_iter().enumerate().collect();
        Self::new(content, code)
    }

    /// Gets the instructions on the path, keyed by their position.
    #[must_use]
    pub fn content(&self) -> &BTreeMap<usize, DynInstruction> {
        &self.content
    }

    /// Gets the path code.
    #[must_use]
    pub fn code(&self) -> &PathCode {
        &self.code
    }

    /// Gets the condition of the path, if it has been calculated successfully.
    #[must_use]
    pub fn condition(&self) -> Option<&PathCondition> {
        self.condition.as_ref()
    }

    /// Gets the number of conditional direct branches on the path.
    #[must_use]
    pub fn conditional_branch_count(&self) -> usize {
        self.content
            .values()
            .filter(|i| i.is_conditional_direct_branch())
            .count()
    }

    /// Discards any condition previously calculated for the path.
    pub(crate) fn clear_condition(&mut self) {
        self.condition = None;
    }

    /// Calculates the stabilized condition of the path, looking branch records
    /// up in `branches`, and stores it on the path.
    ///
    /// The condition is a pure function of the path's content and code, so
    /// calling this again recomputes the same condition.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the raw condition cannot be derived or cannot be
    /// stabilized. The path is then left without a condition.
    pub fn calculate_condition<L>(
        &mut self,
        branches: &L,
        stabilizer: &Stabilizer,
    ) -> Result<&PathCondition, error::LocatedError>
    where
        L: BranchLookup + ?Sized,
    {
        self.clear_condition();

        let raw_condition = condition::derive_raw_condition(&self.content, &self.code, branches)?;
        debug!(
            code = %self.code,
            raw_size = raw_condition.len(),
            "stabilizing raw condition"
        );
        let stabilized = stabilizer.stabilize(raw_condition)?;

        Ok(self.condition.insert(stabilized))
    }
}

#[cfg(test)]
mod test {
    use crate::{
        condition::{Config, Stabilizer},
        data::{Address, AssignmentMap, AssignmentSet},
        error,
        trace::{BranchRegistry, ExecutionPath, Instruction, PathCode},
        watchdog::LazyWatchdog,
    };

    fn outcome(address: u64, value: u8) -> AssignmentSet {
        AssignmentSet::from(vec![AssignmentMap::from([(address, value)])])
    }

    #[test]
    fn path_codes_round_trip_through_strings() -> anyhow::Result<()> {
        let code: PathCode = "0110".parse()?;

        assert_eq!(code.len(), 4);
        assert_eq!(code.get(1), Some(true));
        assert_eq!(code.get(4), None);
        assert_eq!(code, PathCode::from(vec![false, true, true, false]));
        assert_eq!(code.to_string(), "0110");

        Ok(())
    }

    #[test]
    fn path_codes_reject_unknown_symbols() {
        let error = "01x".parse::<PathCode>().expect_err("Parsed an invalid path code");
        assert_eq!(error, error::trace::Error::InvalidPathCodeSymbol('x'));
    }

    #[test]
    fn calculates_and_stores_condition() -> anyhow::Result<()> {
        let mut registry = BranchRegistry::new();
        registry.resolve(Address::new(0x400), outcome(0x10, 0), outcome(0x10, 1));
        registry.resolve(Address::new(0x410), outcome(0x10, 2), outcome(0x10, 3));
        let mut path = ExecutionPath::from_instructions(
            [
                Instruction::conditional_branch(Address::new(0x400), "jz").in_arc(),
                Instruction::new(Address::new(0x404), "inc eax").in_arc(),
                Instruction::conditional_branch(Address::new(0x410), "jnz").in_arc(),
            ],
            "01".parse()?,
        );
        let stabilizer = Stabilizer::new(Config::default(), LazyWatchdog.in_arc());

        assert_eq!(path.conditional_branch_count(), 2);
        let first = path.calculate_condition(&registry, &stabilizer)?.clone();
        let second = path.calculate_condition(&registry, &stabilizer)?.clone();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first.sub_conditions()[0].assignments(), &outcome(0x10, 3));
        assert_eq!(path.condition(), Some(&first));

        Ok(())
    }

    #[test]
    fn failed_calculation_leaves_no_condition() -> anyhow::Result<()> {
        let mut registry = BranchRegistry::new();
        registry.resolve(Address::new(0x400), outcome(0x10, 0), outcome(0x10, 1));
        let mut path = ExecutionPath::from_instructions(
            [Instruction::conditional_branch(Address::new(0x400), "jz").in_arc()],
            PathCode::new(),
        );
        let stabilizer = Stabilizer::new(Config::default(), LazyWatchdog.in_arc());

        let error = path
            .calculate_condition(&registry, &stabilizer)
            .expect_err("Calculation succeeded without a path code");

        assert_eq!(error.location, Address::new(0x400));
        assert!(matches!(
            error.payload,
            error::Error::Trace(error::trace::Error::PathCodeExhausted { .. })
        ));
        assert!(path.condition().is_none());

        Ok(())
    }

    #[test]
    fn mixed_domain_outcome_fails_the_path() -> anyhow::Result<()> {
        let mut registry = BranchRegistry::new();
        let mixed = AssignmentSet::from(vec![
            AssignmentMap::from([(0x10, 1)]),
            AssignmentMap::from([(0x10, 1), (0x20, 2)]),
        ]);
        registry.resolve(Address::new(0x400), mixed, outcome(0x10, 0));
        registry.resolve(Address::new(0x410), outcome(0x20, 5), outcome(0x20, 6));
        let mut path = ExecutionPath::from_instructions(
            [
                Instruction::conditional_branch(Address::new(0x400), "jz").in_arc(),
                Instruction::conditional_branch(Address::new(0x410), "jz").in_arc(),
            ],
            "00".parse()?,
        );
        let stabilizer = Stabilizer::new(Config::default(), LazyWatchdog.in_arc());

        let error = path
            .calculate_condition(&registry, &stabilizer)
            .expect_err("Mixed-domain outcome produced a condition");

        assert_eq!(error.location, Address::new(0x400));
        assert_eq!(
            error.payload,
            error::Error::Condition(error::condition::Error::MalformedAssignment {
                address: Address::new(0x20),
            })
        );
        assert!(path.condition().is_none());

        Ok(())
    }
}
