//! Error types for configuration, scenario parsing, and simulation runs.

use std::fmt;

/// Configuration errors detected before any simulation round executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The process count is not `side * side + 1` for any integer side.
    WorldSizeNotSquare {
        /// The offending world size (workers plus coordinator).
        world_size: usize,
    },
    /// The grid size is not divisible by the mesh side length.
    GridNotDivisible {
        /// Global grid size.
        grid_size: usize,
        /// Mesh side length derived from the world size.
        side_length: usize,
    },
    /// The grid size is zero.
    EmptyGrid,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::WorldSizeNotSquare { world_size } => write!(
                f,
                "world size {world_size} is not a perfect square plus one (need side^2 workers + 1 coordinator)"
            ),
            ConfigError::GridNotDivisible {
                grid_size,
                side_length,
            } => write!(
                f,
                "grid size {grid_size} is not divisible by mesh side length {side_length}"
            ),
            ConfigError::EmptyGrid => write!(f, "grid size must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from parsing a scenario file.
#[derive(Debug, Clone)]
pub enum ScenarioError {
    /// The input ended before the expected content.
    UnexpectedEof {
        /// What the parser was looking for.
        expected: &'static str,
    },
    /// A line failed to parse.
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        reason: String,
    },
    /// An I/O error while reading or writing a scenario file.
    Io(String),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            ScenarioError::Malformed { line, reason } => {
                write!(f, "line {line}: {reason}")
            }
            ScenarioError::Io(e) => write!(f, "scenario I/O error: {e}"),
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<std::io::Error> for ScenarioError {
    fn from(e: std::io::Error) -> Self {
        ScenarioError::Io(e.to_string())
    }
}

/// Fatal simulation errors. There are no retries: a broken link or a
/// payload of the wrong kind means the run cannot continue.
#[derive(Debug, Clone, Copy)]
pub enum SimError {
    /// Invalid topology configuration.
    Config(ConfigError),
    /// A mesh or coordinator channel was disconnected mid-run.
    LinkClosed {
        /// Rank that observed the disconnect.
        rank: usize,
        /// What the rank was doing at the time.
        during: &'static str,
    },
    /// A peer sent a payload variant other than the one this phase expects.
    UnexpectedPayload {
        /// Rank that received the payload.
        rank: usize,
        /// The phase that rejected it.
        phase: &'static str,
    },
    /// A worker or coordinator thread panicked.
    WorkerPanicked {
        /// Rank of the dead thread.
        rank: usize,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(e) => write!(f, "configuration error: {e}"),
            SimError::LinkClosed { rank, during } => {
                write!(f, "rank {rank}: channel closed during {during}")
            }
            SimError::UnexpectedPayload { rank, phase } => {
                write!(f, "rank {rank}: unexpected payload variant in {phase}")
            }
            SimError::WorkerPanicked { rank } => write!(f, "rank {rank} panicked"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::WorldSizeNotSquare { world_size: 7 };
        assert!(format!("{err}").contains('7'));

        let err = ConfigError::GridNotDivisible {
            grid_size: 10,
            side_length: 3,
        };
        let text = format!("{err}");
        assert!(text.contains("10") && text.contains('3'));
    }

    #[test]
    fn test_scenario_error_display() {
        let err = ScenarioError::Malformed {
            line: 4,
            reason: "bad faction letter".to_string(),
        };
        assert!(format!("{err}").contains("line 4"));
    }

    #[test]
    fn test_sim_error_from_config() {
        let err = SimError::from(ConfigError::EmptyGrid);
        assert!(matches!(err, SimError::Config(ConfigError::EmptyGrid)));
    }
}
