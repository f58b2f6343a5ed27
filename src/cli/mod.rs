//! CLI command implementations for Skirmish.

pub(crate) mod batch;
pub(crate) mod generate;
pub(crate) mod run;
pub(crate) mod validate;
pub(crate) mod watch;

mod output;

use clap::ValueEnum;
use std::error::Error;
use std::fmt;

/// Output format for the `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Output format for the `batch` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BatchFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
    /// CSV format.
    Csv,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<skirmish::ScenarioError> for CliError {
    fn from(e: skirmish::ScenarioError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<skirmish::SimError> for CliError {
    fn from(e: skirmish::SimError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<skirmish::scenario::GenerateError> for CliError {
    fn from(e: skirmish::scenario::GenerateError) -> Self {
        Self::new(e.to_string())
    }
}
