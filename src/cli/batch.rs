//! Batch command implementation: mass parallel runs over random
//! scenarios with aggregated statistics.

use super::output::{BatchStats, JsonBatchResult, format_batch_csv, format_batch_text};
use super::{BatchFormat, CliError};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use skirmish::{GenerateConfig, generate, run_scenario};
use std::time::Instant;

/// Execute the batch command.
///
/// # Errors
///
/// Returns an error for unformattable output; individual game failures
/// are counted, not fatal.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute(
    games: u64,
    workers: usize,
    config: GenerateConfig,
    seed: Option<u64>,
    threads: Option<usize>,
    format: BatchFormat,
    progress: bool,
) -> Result<(), CliError> {
    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let base_seed = seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    });

    let pb = if progress {
        let pb = ProgressBar::new(games);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})")
                .expect("valid template")
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();

    // Run games in parallel using lock-free fold/reduce: each thread
    // accumulates into its own BatchStats, merged at the end.
    let stats = (0..games)
        .into_par_iter()
        .fold(BatchStats::new, |mut local_stats, i| {
            let game_seed = base_seed.wrapping_add(i);
            let outcome = generate(&config, game_seed)
                .map_err(CliError::from)
                .and_then(|scenario| Ok(run_scenario(&scenario, workers + 1)?));
            match outcome {
                Ok(report) => local_stats.add_report(&report),
                Err(_) => local_stats.add_failure(),
            }
            local_stats
        })
        .reduce(BatchStats::new, |mut a, b| {
            a.merge(&b);
            a
        });

    if let Some(pb) = pb {
        pb.set_position(stats.games_played + stats.failures);
        pb.finish_with_message("done");
    }

    let duration = start.elapsed();
    let games_per_sec = if duration.as_secs_f64() > 0.0 {
        stats.games_played as f64 / duration.as_secs_f64()
    } else {
        0.0
    };

    match format {
        BatchFormat::Text => {
            println!();
            print!("{}", format_batch_text(&stats));
            println!();
            println!(
                "Duration: {:.2}s ({games_per_sec:.0} games/sec)",
                duration.as_secs_f64()
            );
        }
        BatchFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonBatchResult::from_stats(&stats))
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
        BatchFormat::Csv => {
            print!("{}", format_batch_csv(&stats));
        }
    }

    Ok(())
}
