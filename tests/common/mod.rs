//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use path_condition::{
    data::{Address, AssignmentMap, AssignmentSet},
    explorer::{Config, Explorer},
    trace::{BranchRegistry, ExecutionPath, Instruction},
    watchdog::LazyWatchdog,
};

/// Builds an assignment set with one map per entry in `maps`, each binding
/// single-byte values.
pub fn set(maps: &[&[(u64, u8)]]) -> AssignmentSet {
    maps.iter()
        .map(|bindings| {
            bindings
                .iter()
                .map(|(address, value)| (Address::new(*address), *value))
                .collect::<AssignmentMap>()
        })
        .collect()
}

/// Constructs the registry shared by most of the tests.
///
/// - `0x400` constrains `0x10` and `0x20`.
/// - `0x410` constrains `0x20` and `0x30`, overlapping with `0x400`.
/// - `0x420` constrains `0x40` only.
pub fn registry() -> BranchRegistry {
    let mut registry = BranchRegistry::new();
    registry.resolve(
        Address::new(0x400),
        set(&[&[(0x10, 1), (0x20, 1)], &[(0x10, 2), (0x20, 1)]]),
        set(&[&[(0x10, 3), (0x20, 2)]]),
    );
    registry.resolve(
        Address::new(0x410),
        set(&[&[(0x20, 5), (0x30, 1)], &[(0x20, 5), (0x30, 2)]]),
        set(&[&[(0x20, 6), (0x30, 9)]]),
    );
    registry.resolve(
        Address::new(0x420),
        set(&[&[(0x40, 1)]]),
        set(&[&[(0x40, 2)]]),
    );
    registry
}

/// Constructs an explorer over [`registry`] using the provided `config`.
#[allow(unused)] // It is actually
pub fn new_explorer(config: Config) -> Explorer {
    Explorer::with_registry(registry(), config, LazyWatchdog.in_arc())
}

/// Builds a path that passes through the conditional branches at `branches`
/// in order, with a plain instruction before each, under the textual `code`.
pub fn new_path(branches: &[u64], code: &str) -> anyhow::Result<ExecutionPath> {
    let instructions = branches.iter().flat_map(|address| {
        [
            Instruction::new(Address::new(address - 4), "cmp eax, ebx").in_arc(),
            Instruction::conditional_branch(Address::new(*address), "jz").in_arc(),
        ]
    });

    Ok(ExecutionPath::from_instructions(instructions, code.parse()?))
}
