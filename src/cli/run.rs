//! Run command implementation.

use super::output::{JsonRunReport, format_report_text};
use super::{CliError, OutputFormat};
use skirmish::{Scenario, run_scenario};
use std::path::PathBuf;

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the scenario fails to load or the run fails.
pub(crate) fn execute(
    scenario_path: PathBuf,
    workers: usize,
    output: Option<PathBuf>,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let scenario = Scenario::load(&scenario_path)?;

    if !quiet {
        println!(
            "Running {} ({} waves, {} rounds/wave) on {workers} workers...",
            scenario_path.display(),
            scenario.waves.len(),
            scenario.rounds,
        );
        println!();
    }

    let report = run_scenario(&scenario, workers + 1)?;

    // The final-output file is the bare grid: one line per row, one
    // character per cell.
    if let Some(path) = output {
        let mut text = report.rows.join("\n");
        text.push('\n');
        std::fs::write(&path, text)?;
        if !quiet {
            println!("Final grid written to: {}", path.display());
            println!();
        }
    }

    match format {
        OutputFormat::Text => print!("{}", format_report_text(&report)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonRunReport::from_report(&report))
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
    }

    Ok(())
}
