//! This module contains the stabilizer, which merges intersecting
//! sub-conditions until the condition is a product of independent parts.

use itertools::Itertools;
use tracing::debug;

use crate::{
    condition::{join::join, Config, PathCondition, SubCondition},
    error::{
        condition::{Error, Result},
        container::Locatable,
    },
    watchdog::DynWatchdog,
};

/// Drives raw conditions to their stabilized form.
///
/// # Merge Order
///
/// Each pass finds the first intersecting pair `(i, j)` with `i < j` in
/// lexicographic order, joins them with `j` as the priority operand, drops
/// slot `i` and puts the join into slot `j`. When several sub-conditions bind
/// a common address, the value that survives is therefore always the one from
/// the sub-condition latest on the path.
#[derive(Clone, Debug)]
pub struct Stabilizer {
    config:   Config,
    watchdog: DynWatchdog,
}

impl Stabilizer {
    /// Constructs a new stabilizer with the provided `config`, polling
    /// `watchdog` between passes.
    #[must_use]
    pub fn new(config: Config, watchdog: DynWatchdog) -> Self {
        Self { config, watchdog }
    }

    /// Gets the configuration of the stabilizer.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets the watchdog that the stabilizer polls.
    #[must_use]
    pub fn watchdog(&self) -> &DynWatchdog {
        &self.watchdog
    }

    /// Merges the `raw` sub-conditions until no two of them intersect.
    ///
    /// Every merge removes one sub-condition, so this terminates after at most
    /// `raw.len() - 1` merges.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the maps of a sub-condition do not share one domain,
    /// if a join fails, if the merge bookkeeping loses track of a
    /// sub-condition, or if the watchdog requests a stop. No partial condition
    /// is returned in any of these cases.
    pub fn stabilize(&self, raw: Vec<SubCondition>) -> Result<PathCondition> {
        raw.iter().try_for_each(|sub| {
            sub.assignments().check_uniform_domain().locate(sub.location())
        })?;

        let poll_interval = self.watchdog.poll_every().max(1);
        let mut condition = raw;
        let mut passes: usize = 0;

        while let Some((i, j)) = first_intersecting_pair(&condition) {
            if passes % poll_interval == 0 && self.watchdog.should_stop() {
                return Err(Error::StoppedByWatchdog.locate(condition[j].location()));
            }
            passes += 1;

            let joined = join(&condition[i], &condition[j], &self.config)?;
            debug!(
                removed = i,
                replaced = j,
                assignments = joined.assignments().len(),
                remaining = condition.len() - 1,
                "merged intersecting sub-conditions"
            );
            condition = merge(condition, i, j, joined)?;
        }

        Ok(PathCondition::from(condition))
    }
}

/// Finds the first pair of sub-conditions, in lexicographic index order, whose
/// domains intersect.
fn first_intersecting_pair(condition: &[SubCondition]) -> Option<(usize, usize)> {
    condition
        .iter()
        .enumerate()
        .tuple_combinations()
        .find(|((_, a), (_, b))| a.intersects(b))
        .map(|((i, _), (j, _))| (i, j))
}

/// Builds the condition that results from dropping slot `removed` and putting
/// `joined` into slot `replaced`.
fn merge(
    condition: Vec<SubCondition>,
    removed: usize,
    replaced: usize,
    joined: SubCondition,
) -> Result<Vec<SubCondition>> {
    let length = condition.len();
    let location = joined.location();
    let mut joined = Some(joined);

    let merged: Vec<SubCondition> = condition
        .into_iter()
        .enumerate()
        .filter(|(ix, _)| *ix != removed)
        .map(|(ix, sub)| {
            if ix == replaced {
                joined.take().unwrap_or(sub)
            } else {
                sub
            }
        })
        .collect();

    if joined.is_some() || merged.len() + 1 != length {
        return Err(Error::StabilizationInvariantViolation {
            expected_slot: replaced,
            length,
        }
        .locate(location));
    }

    Ok(merged)
}
