//! Skirmish CLI - run, generate, and watch distributed combat
//! simulations.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Skirmish - a deterministic distributed faction-combat simulator
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scenario file to completion
    Run {
        /// Scenario file
        #[arg(required = true)]
        scenario: std::path::PathBuf,

        /// Worker count (must be a perfect square)
        #[arg(short, long, default_value = "4")]
        workers: usize,

        /// Write the final grid to this file
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Suppress progress chatter
        #[arg(short, long)]
        quiet: bool,
    },

    /// Generate a random scenario file
    Generate {
        /// Grid side length
        #[arg(short, long, default_value = "24")]
        grid_size: usize,

        /// Number of waves
        #[arg(short = 'W', long, default_value = "2")]
        waves: usize,

        /// Units per faction per wave
        #[arg(short, long, default_value = "16")]
        units_per_faction: usize,

        /// Rounds per wave
        #[arg(short, long, default_value = "4")]
        rounds: u32,

        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Run mass parallel random games and aggregate statistics
    Batch {
        /// Number of games to run
        #[arg(short = 'n', long, default_value = "100")]
        games: u64,

        /// Worker count per game (must be a perfect square)
        #[arg(short, long, default_value = "4")]
        workers: usize,

        /// Grid side length
        #[arg(short, long, default_value = "24")]
        grid_size: usize,

        /// Number of waves per game
        #[arg(short = 'W', long, default_value = "2")]
        waves: usize,

        /// Units per faction per wave
        #[arg(short, long, default_value = "16")]
        units_per_faction: usize,

        /// Rounds per wave
        #[arg(short, long, default_value = "4")]
        rounds: u32,

        /// Starting seed (increments for each game)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::BatchFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// Watch a scenario run round by round in a TUI
    Watch {
        /// Scenario file
        #[arg(required = true)]
        scenario: std::path::PathBuf,

        /// Worker count (must be a perfect square)
        #[arg(short, long, default_value = "4")]
        workers: usize,

        /// Round delay in milliseconds
        #[arg(long, default_value = "500")]
        speed: u64,
    },

    /// Validate a scenario file against the topology constraints
    Validate {
        /// Scenario file
        #[arg(required = true)]
        scenario: std::path::PathBuf,

        /// Worker count (must be a perfect square)
        #[arg(short, long, default_value = "4")]
        workers: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Run {
            scenario,
            workers,
            output,
            format,
            quiet,
        } => cli::run::execute(scenario, workers, output, format, quiet),

        Commands::Generate {
            grid_size,
            waves,
            units_per_faction,
            rounds,
            seed,
            output,
        } => cli::generate::execute(grid_size, waves, units_per_faction, rounds, seed, output),

        Commands::Batch {
            games,
            workers,
            grid_size,
            waves,
            units_per_faction,
            rounds,
            seed,
            threads,
            format,
            progress,
        } => cli::batch::execute(
            games,
            workers,
            skirmish::GenerateConfig {
                grid_size,
                waves,
                units_per_faction,
                rounds,
            },
            seed,
            threads,
            format,
            progress,
        ),

        Commands::Watch {
            scenario,
            workers,
            speed,
        } => cli::watch::execute(scenario, workers, speed),

        Commands::Validate { scenario, workers } => cli::validate::execute(scenario, workers),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
