//! Scenario files: the text format, and a deterministic random
//! generator.
//!
//! Format: a header line `gridSize waveCount unitsPerFaction roundCount`,
//! then per wave one separator line (blank or `Wave N:`) followed by
//! four faction lines `L: x y, x y, ...` with `L` one of `E W F A` and
//! exactly `unitsPerFaction` coordinate pairs.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::ScenarioError;
use crate::sim::unit::{ALL_FACTIONS, Faction};

/// One unit to place at wave start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPlacement {
    /// Faction of the placed unit.
    pub faction: Faction,
    /// Global x (column).
    pub x: i64,
    /// Global y (row).
    pub y: i64,
}

/// A parsed scenario: grid geometry, round count, and the per-wave
/// placements in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Global grid side length.
    pub grid_size: usize,
    /// Rounds per wave.
    pub rounds: u32,
    /// Units per faction per wave (header value).
    pub units_per_faction: usize,
    /// Placements per wave, in file order.
    pub waves: Vec<Vec<UnitPlacement>>,
}

impl Scenario {
    /// Parse the text format.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] with a line number for malformed
    /// input.
    pub fn parse(text: &str) -> Result<Self, ScenarioError> {
        let mut lines = text.lines().enumerate();

        let (line_no, header) = lines.next().ok_or(ScenarioError::UnexpectedEof {
            expected: "header line",
        })?;
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(ScenarioError::Malformed {
                line: line_no + 1,
                reason: format!(
                    "header needs `gridSize waveCount unitsPerFaction roundCount`, got {} fields",
                    fields.len()
                ),
            });
        }
        let grid_size = parse_field(fields[0], line_no + 1, "grid size")?;
        let wave_count: usize = parse_field(fields[1], line_no + 1, "wave count")?;
        let units_per_faction = parse_field(fields[2], line_no + 1, "units per faction")?;
        let rounds = parse_field(fields[3], line_no + 1, "round count")?;

        let mut waves = Vec::with_capacity(wave_count);
        for _ in 0..wave_count {
            let mut wave = Vec::with_capacity(4 * units_per_faction);
            let mut parsed_factions = 0;
            while parsed_factions < 4 {
                let (line_no, line) = lines.next().ok_or(ScenarioError::UnexpectedEof {
                    expected: "faction line",
                })?;
                let trimmed = line.trim();
                // Wave separators carry no data.
                if trimmed.is_empty() || trimmed.starts_with("Wave") {
                    continue;
                }
                parse_faction_line(trimmed, line_no + 1, units_per_faction, &mut wave)?;
                parsed_factions += 1;
            }
            waves.push(wave);
        }

        Ok(Self {
            grid_size,
            rounds,
            units_per_faction,
            waves,
        })
    }

    /// Read and parse a scenario file.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] for I/O failures or malformed input.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Render the scenario back into the text format. Faction lines are
    /// emitted in `E W F A` order.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} {} {}",
            self.grid_size,
            self.waves.len(),
            self.units_per_faction,
            self.rounds
        );
        for (index, wave) in self.waves.iter().enumerate() {
            let _ = writeln!(out, "Wave {}:", index + 1);
            for faction in ALL_FACTIONS {
                let pairs: Vec<String> = wave
                    .iter()
                    .filter(|p| p.faction == faction)
                    .map(|p| format!("{} {}", p.x, p.y))
                    .collect();
                let _ = writeln!(out, "{}: {}", faction.letter(), pairs.join(", "));
            }
        }
        out
    }

    /// Write the scenario to a file.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] for I/O failures.
    pub fn save(&self, path: &Path) -> Result<(), ScenarioError> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    /// Total placements across all waves.
    #[must_use]
    pub fn total_units(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }
}

fn parse_field<T: std::str::FromStr>(
    field: &str,
    line: usize,
    what: &str,
) -> Result<T, ScenarioError> {
    field.parse().map_err(|_| ScenarioError::Malformed {
        line,
        reason: format!("invalid {what}: {field:?}"),
    })
}

fn parse_faction_line(
    line: &str,
    line_no: usize,
    units_per_faction: usize,
    wave: &mut Vec<UnitPlacement>,
) -> Result<(), ScenarioError> {
    let (tag, rest) = line.split_once(':').ok_or_else(|| ScenarioError::Malformed {
        line: line_no,
        reason: "faction line needs a `L:` prefix".to_string(),
    })?;
    let faction = tag
        .trim()
        .chars()
        .next()
        .filter(|_| tag.trim().len() == 1)
        .and_then(Faction::from_letter)
        .ok_or_else(|| ScenarioError::Malformed {
            line: line_no,
            reason: format!("unknown faction letter {tag:?}"),
        })?;

    let mut pairs = 0;
    for pair in rest.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let mut coords = pair.split_whitespace();
        let x = coords.next().map(|c| parse_field(c, line_no, "x coordinate"));
        let y = coords.next().map(|c| parse_field(c, line_no, "y coordinate"));
        let (Some(x), Some(y), None) = (x, y, coords.next()) else {
            return Err(ScenarioError::Malformed {
                line: line_no,
                reason: format!("coordinate pair {pair:?} is not `x y`"),
            });
        };
        wave.push(UnitPlacement {
            faction,
            x: x?,
            y: y?,
        });
        pairs += 1;
    }
    if pairs != units_per_faction {
        return Err(ScenarioError::Malformed {
            line: line_no,
            reason: format!("expected {units_per_faction} pairs, found {pairs}"),
        });
    }
    Ok(())
}

/// Parameters for the random scenario generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateConfig {
    /// Global grid side length.
    pub grid_size: usize,
    /// Number of waves.
    pub waves: usize,
    /// Units per faction per wave.
    pub units_per_faction: usize,
    /// Rounds per wave.
    pub rounds: u32,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            grid_size: 24,
            waves: 2,
            units_per_faction: 16,
            rounds: 4,
        }
    }
}

/// Error type for scenario generation.
#[derive(Debug, Clone)]
pub struct GenerateError {
    /// Description of the error.
    pub reason: String,
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Scenario generation error: {}", self.reason)
    }
}

impl std::error::Error for GenerateError {}

/// Deterministic PRNG using xorshift64.
#[derive(Debug, Clone, Copy)]
struct Rng {
    state: u64,
}

impl Rng {
    /// Create a new RNG with the given seed.
    const fn new(seed: u64) -> Self {
        // Ensure non-zero state
        let state = if seed == 0 { 0x5555_5555_5555_5555 } else { seed };
        Self { state }
    }

    /// Generate next random u64.
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate random usize in [0, max).
    fn next_below(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        usize::try_from(self.next_u64() % max as u64).unwrap_or(0)
    }
}

/// Generate a random scenario: per wave, unique coordinates across all
/// four factions. Same seed, same scenario.
///
/// # Errors
///
/// Returns a [`GenerateError`] when the grid cannot hold a wave's
/// units.
pub fn generate(config: &GenerateConfig, seed: u64) -> Result<Scenario, GenerateError> {
    if config.grid_size == 0 {
        return Err(GenerateError {
            reason: "grid size must be at least 1".to_string(),
        });
    }
    let capacity = config.grid_size * config.grid_size;
    let per_wave = 4 * config.units_per_faction;
    if per_wave > capacity {
        return Err(GenerateError {
            reason: format!(
                "{per_wave} units per wave do not fit a {0}x{0} grid",
                config.grid_size
            ),
        });
    }

    let mut rng = Rng::new(seed);
    let mut waves = Vec::with_capacity(config.waves);
    for _ in 0..config.waves {
        let mut used = vec![false; capacity];
        let mut wave = Vec::with_capacity(per_wave);
        for faction in ALL_FACTIONS {
            for _ in 0..config.units_per_faction {
                let cell = loop {
                    let candidate = rng.next_below(capacity);
                    if !used[candidate] {
                        break candidate;
                    }
                };
                used[cell] = true;
                wave.push(UnitPlacement {
                    faction,
                    x: to_i64(cell % config.grid_size),
                    y: to_i64(cell / config.grid_size),
                });
            }
        }
        waves.push(wave);
    }

    Ok(Scenario {
        grid_size: config.grid_size,
        rounds: config.rounds,
        units_per_faction: config.units_per_faction,
        waves,
    })
}

#[allow(clippy::cast_possible_wrap)]
const fn to_i64(v: usize) -> i64 {
    v as i64
}
