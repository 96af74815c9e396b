//! This module contains the explorer, the top-level orchestrator that owns the
//! branch registry and drives the calculation of path conditions over a
//! collection of execution paths.

use derivative::Derivative;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    condition::{self, Stabilizer},
    constant::DEFAULT_PARALLEL_PATHS_ENABLED,
    data::Address,
    error::{self, container::Locatable},
    trace::{BranchLookup, BranchRegistry, ExecutionPath},
    watchdog::DynWatchdog,
};

/// The configuration for the explorer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Whether the conditions of independent paths are calculated on the
    /// `rayon` thread pool.
    ///
    /// Defaults to [`DEFAULT_PARALLEL_PATHS_ENABLED`].
    pub parallel_paths: bool,

    /// The configuration for the condition calculation on each path.
    pub condition: condition::Config,
}

impl Config {
    /// Sets the `parallel_paths` config parameter to `value`.
    #[must_use]
    pub fn with_parallel_paths(mut self, value: bool) -> Self {
        self.parallel_paths = value;
        self
    }

    /// Sets the `condition` config parameter to `value`.
    #[must_use]
    pub fn with_condition(mut self, value: condition::Config) -> Self {
        self.condition = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let parallel_paths = DEFAULT_PARALLEL_PATHS_ENABLED;
        let condition = condition::Config::default();
        Self {
            parallel_paths,
            condition,
        }
    }
}

/// The explorer owns the registry of branch records for one analysis, and
/// calculates the conditions of the paths walked through the traced program.
///
/// # Registry Lifetime
///
/// The registry belongs to the explorer and is only handed out by reference,
/// so several explorers (one per analysis) can coexist in a single process.
/// While conditions are being calculated the registry is only read.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Explorer {
    /// The records of every conditional branch seen so far.
    #[derivative(Debug = "ignore")]
    registry: BranchRegistry,

    /// The configuration for the explorer.
    config: Config,

    /// The watchdog polled between paths and between stabilization passes.
    watchdog: DynWatchdog,
}

impl Explorer {
    /// Constructs a new explorer with an empty registry.
    #[must_use]
    pub fn new(config: Config, watchdog: DynWatchdog) -> Self {
        Self::with_registry(BranchRegistry::new(), config, watchdog)
    }

    /// Constructs a new explorer around an existing `registry`.
    #[must_use]
    pub fn with_registry(registry: BranchRegistry, config: Config, watchdog: DynWatchdog) -> Self {
        Self {
            registry,
            config,
            watchdog,
        }
    }

    /// Gets the branch registry.
    #[must_use]
    pub fn registry(&self) -> &BranchRegistry {
        &self.registry
    }

    /// Gets the branch registry mutably, so that branches can be observed and
    /// resolved as the trace is walked.
    pub fn registry_mut(&mut self) -> &mut BranchRegistry {
        &mut self.registry
    }

    /// Gets the configuration of the explorer.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builds the stabilizer used for each path.
    #[must_use]
    pub fn stabilizer(&self) -> Stabilizer {
        Stabilizer::new(self.config.condition.clone(), self.watchdog.clone())
    }

    /// Calculates the condition of every path in `paths` against the
    /// explorer's registry.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] with the errors of every path that failed. Those paths
    /// have no condition, while every other path still has its condition.
    pub fn calculate_exec_path_conditions(&self, paths: &mut [ExecutionPath]) -> error::Result<()> {
        calculate_exec_path_conditions(
            paths,
            &self.registry,
            &self.stabilizer(),
            self.config.parallel_paths,
        )
    }
}

/// Calculates the condition of every path in `paths` independently, looking
/// branch records up in `branches`.
///
/// If `parallel` is set the paths are spread over the `rayon` thread pool.
/// The outcome does not depend on it.
///
/// # Errors
///
/// Returns [`Err`] with the errors of every path that failed, sorted by
/// location. A failing path does not affect any of the others.
pub fn calculate_exec_path_conditions<L>(
    paths: &mut [ExecutionPath],
    branches: &L,
    stabilizer: &Stabilizer,
    parallel: bool,
) -> error::Result<()>
where
    L: BranchLookup + Sync + ?Sized,
{
    info!(paths = paths.len(), parallel, "calculating path conditions");

    let failures: Vec<error::LocatedError> = if parallel {
        paths
            .par_iter_mut()
            .enumerate()
            .filter_map(|(ix, path)| calculate_one(ix, path, branches, stabilizer).err())
            .collect()
    } else {
        paths
            .iter_mut()
            .enumerate()
            .filter_map(|(ix, path)| calculate_one(ix, path, branches, stabilizer).err())
            .collect()
    };

    info!(
        paths = paths.len(),
        failed = failures.len(),
        "finished calculating path conditions"
    );

    if failures.is_empty() {
        Ok(())
    } else {
        let mut errors = error::Errors::new();
        errors.add_many_located(failures);
        Err(errors)
    }
}

/// Calculates the condition of the path at position `index` in its batch.
fn calculate_one<L>(
    index: usize,
    path: &mut ExecutionPath,
    branches: &L,
    stabilizer: &Stabilizer,
) -> Result<(), error::LocatedError>
where
    L: BranchLookup + ?Sized,
{
    let watchdog = stabilizer.watchdog();
    if index % watchdog.poll_every().max(1) == 0 && watchdog.should_stop() {
        let location = path
            .content()
            .values()
            .next()
            .map_or_else(Address::default, |i| i.address());
        let error = error::Error::from(error::condition::Error::StoppedByWatchdog).locate(location);
        path.clear_condition();
        warn!(code = %path.code(), %error, "path was not calculated");
        return Err(error);
    }

    match path.calculate_condition(branches, stabilizer) {
        Ok(_) => Ok(()),
        Err(error) => {
            warn!(code = %path.code(), %error, "failed to calculate path condition");
            Err(error)
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{atomic::AtomicBool, Arc};

    use crate::{
        condition,
        data::{Address, AssignmentMap, AssignmentSet},
        error,
        explorer::{Config, Explorer},
        trace::{ExecutionPath, Instruction},
        watchdog::{FlagWatchdog, LazyWatchdog},
    };

    fn outcome(address: u64, value: u8) -> AssignmentSet {
        AssignmentSet::from(vec![AssignmentMap::from([(address, value)])])
    }

    fn path(branches: &[u64], code: &str) -> anyhow::Result<ExecutionPath> {
        let instructions = branches
            .iter()
            .map(|a| Instruction::conditional_branch(Address::new(*a), "jz").in_arc());
        Ok(ExecutionPath::from_instructions(instructions, code.parse()?))
    }

    fn explorer(config: Config) -> Explorer {
        let mut explorer = Explorer::new(config, LazyWatchdog.in_arc());
        let registry = explorer.registry_mut();
        registry.resolve(Address::new(0x400), outcome(0x10, 0), outcome(0x10, 1));
        registry.resolve(Address::new(0x410), outcome(0x20, 0), outcome(0x20, 1));
        explorer
    }

    #[test]
    fn defaults_to_parallel_paths() {
        let config = Config::default();
        assert!(config.parallel_paths);
        assert_eq!(config.condition, condition::Config::default());
    }

    #[test]
    fn calculates_every_path() -> anyhow::Result<()> {
        let explorer = explorer(Config::default());
        let mut paths = vec![path(&[0x400, 0x410], "01")?, path(&[0x410], "0")?];

        explorer.calculate_exec_path_conditions(&mut paths)?;

        let first = paths[0].condition().expect("First path has no condition");
        assert_eq!(first.len(), 2);
        let second = paths[1].condition().expect("Second path has no condition");
        assert_eq!(second.sub_conditions()[0].assignments(), &outcome(0x20, 0));

        Ok(())
    }

    #[test]
    fn failing_path_does_not_affect_others() -> anyhow::Result<()> {
        let explorer = explorer(Config::default().with_parallel_paths(false));
        let mut paths = vec![
            path(&[0x400], "1")?,
            path(&[0x400, 0x410], "1")?,
            path(&[0x410], "1")?,
        ];

        let errors = explorer
            .calculate_exec_path_conditions(&mut paths)
            .expect_err("Path without enough code bits succeeded");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.payloads()[0].location, Address::new(0x410));
        assert!(matches!(
            errors.payloads()[0].payload,
            error::Error::Trace(error::trace::Error::PathCodeExhausted {
                required:  1,
                available: 1,
            })
        ));
        assert!(paths[0].condition().is_some());
        assert!(paths[1].condition().is_none());
        assert!(paths[2].condition().is_some());

        Ok(())
    }

    #[test]
    fn stopped_watchdog_fails_every_polled_path() -> anyhow::Result<()> {
        let watchdog = FlagWatchdog::new(Arc::new(AtomicBool::new(true)))
            .polling_every(1)
            .in_arc();
        let mut explorer = Explorer::new(Config::default(), watchdog);
        explorer
            .registry_mut()
            .resolve(Address::new(0x400), outcome(0x10, 0), outcome(0x10, 1));
        let mut paths = vec![path(&[0x400], "0")?, path(&[0x400], "1")?];

        let errors = explorer
            .calculate_exec_path_conditions(&mut paths)
            .expect_err("Stopped explorer succeeded");

        assert_eq!(errors.len(), 2);
        assert!(errors.payloads().iter().all(|e| e.payload
            == error::Error::Condition(error::condition::Error::StoppedByWatchdog)));
        assert!(paths.iter().all(|p| p.condition().is_none()));

        Ok(())
    }

    #[test]
    fn stopped_watchdog_clears_earlier_conditions() -> anyhow::Result<()> {
        let lazy = explorer(Config::default().with_parallel_paths(false));
        let mut paths = vec![path(&[0x400], "0")?, path(&[0x410], "1")?];
        lazy.calculate_exec_path_conditions(&mut paths)?;
        assert!(paths.iter().all(|p| p.condition().is_some()));

        let watchdog = FlagWatchdog::new(Arc::new(AtomicBool::new(true)))
            .polling_every(1)
            .in_arc();
        let stopped = Explorer::with_registry(lazy.registry().clone(), Config::default(), watchdog);
        let errors = stopped
            .calculate_exec_path_conditions(&mut paths)
            .expect_err("Stopped explorer succeeded");

        assert_eq!(errors.len(), 2);
        assert!(paths.iter().all(|p| p.condition().is_none()));

        Ok(())
    }
}
