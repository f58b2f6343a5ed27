//! Validate command implementation.

use super::CliError;
use skirmish::{Scenario, Topology};
use std::path::PathBuf;

/// Execute the validate command.
///
/// # Errors
///
/// Returns an error when the scenario is malformed or the topology
/// constraints fail for the requested worker count.
pub(crate) fn execute(scenario_path: PathBuf, workers: usize) -> Result<(), CliError> {
    let scenario = Scenario::load(&scenario_path)?;
    let topology = Topology::new(scenario.grid_size, workers + 1)
        .map_err(|e| CliError::new(e.to_string()))?;

    let out_of_bounds = scenario
        .waves
        .iter()
        .flatten()
        .filter(|p| !topology.in_bounds(p.x, p.y))
        .count();

    println!("Scenario: {}", scenario_path.display());
    println!("  Grid: {0}x{0}", scenario.grid_size);
    println!(
        "  Mesh: {0}x{0} workers, partitions {1}x{1}",
        topology.side_length(),
        topology.partition_size()
    );
    println!(
        "  Waves: {} ({} rounds each, {} units per faction)",
        scenario.waves.len(),
        scenario.rounds,
        scenario.units_per_faction
    );
    println!("  Placements: {}", scenario.total_units());
    if out_of_bounds > 0 {
        println!("  Warning: {out_of_bounds} placements out of bounds (will be skipped)");
    }
    println!("OK");
    Ok(())
}
