//! Generate command implementation.

use super::CliError;
use skirmish::{GenerateConfig, generate};
use std::path::PathBuf;

/// Execute the generate command.
///
/// # Errors
///
/// Returns an error if the configuration is unsatisfiable or the file
/// cannot be written.
pub(crate) fn execute(
    grid_size: usize,
    waves: usize,
    units_per_faction: usize,
    rounds: u32,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let seed = seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    });

    let config = GenerateConfig {
        grid_size,
        waves,
        units_per_faction,
        rounds,
    };
    let scenario = generate(&config, seed)?;

    match output {
        Some(path) => {
            scenario.save(&path)?;
            println!("Scenario (seed {seed}) written to: {}", path.display());
        }
        None => print!("{}", scenario.to_text()),
    }
    Ok(())
}
