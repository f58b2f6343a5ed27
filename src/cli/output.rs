//! Output formatting for the CLI commands.

use serde::Serialize;
use skirmish::sim::unit::ALL_FACTIONS;
use skirmish::{Faction, SimReport};

/// Format a run report as human-readable text.
pub(crate) fn format_report_text(report: &SimReport) -> String {
    let mut out = String::new();
    for row in &report.rows {
        out.push_str(row);
        out.push('\n');
    }
    out.push('\n');
    let counts = report.faction_counts();
    for (faction, count) in ALL_FACTIONS.iter().zip(counts) {
        out.push_str(&format!("{:?}: {count} surviving\n", faction));
    }
    match report.dominant_faction() {
        Some(faction) => out.push_str(&format!("Dominant faction: {faction:?}\n")),
        None => out.push_str("No survivors\n"),
    }
    out
}

/// JSON-serializable run report.
#[derive(Debug, Serialize)]
pub(crate) struct JsonRunReport {
    /// Final grid rows, one character per cell.
    grid: Vec<String>,
    /// Surviving unit counts keyed by faction letter.
    survivors: Vec<JsonFactionCount>,
    /// Waves executed.
    waves: u32,
    /// Rounds per wave.
    rounds: u32,
}

#[derive(Debug, Serialize)]
struct JsonFactionCount {
    faction: char,
    count: usize,
}

impl JsonRunReport {
    /// Build from a finished run.
    pub(crate) fn from_report(report: &SimReport) -> Self {
        let counts = report.faction_counts();
        Self {
            grid: report.rows.clone(),
            survivors: ALL_FACTIONS
                .iter()
                .zip(counts)
                .map(|(faction, count)| JsonFactionCount {
                    faction: faction.letter(),
                    count,
                })
                .collect(),
            waves: report.waves,
            rounds: report.rounds,
        }
    }
}

/// Aggregated statistics over a batch of runs.
///
/// Each rayon worker folds into its own instance; instances merge at
/// the end, so the hot path carries no atomics.
#[derive(Debug, Clone)]
pub(crate) struct BatchStats {
    /// Completed games.
    pub(crate) games_played: u64,
    /// Games that failed to run.
    pub(crate) failures: u64,
    /// Total survivors per faction, `ALL_FACTIONS` order.
    pub(crate) survivors: [u64; 4],
    /// Games each faction dominated, `ALL_FACTIONS` order.
    pub(crate) dominations: [u64; 4],
    /// Games with no survivors at all.
    pub(crate) wipeouts: u64,
}

impl BatchStats {
    pub(crate) const fn new() -> Self {
        Self {
            games_played: 0,
            failures: 0,
            survivors: [0; 4],
            dominations: [0; 4],
            wipeouts: 0,
        }
    }

    pub(crate) fn add_report(&mut self, report: &SimReport) {
        self.games_played += 1;
        let counts = report.faction_counts();
        for (slot, count) in self.survivors.iter_mut().zip(counts) {
            *slot += count as u64;
        }
        match report.dominant_faction() {
            Some(faction) => {
                if let Some(index) = ALL_FACTIONS.iter().position(|&f| f == faction) {
                    self.dominations[index] += 1;
                }
            }
            None => self.wipeouts += 1,
        }
    }

    pub(crate) fn add_failure(&mut self) {
        self.failures += 1;
    }

    pub(crate) fn merge(&mut self, other: &BatchStats) {
        self.games_played += other.games_played;
        self.failures += other.failures;
        self.wipeouts += other.wipeouts;
        for i in 0..4 {
            self.survivors[i] += other.survivors[i];
            self.dominations[i] += other.dominations[i];
        }
    }
}

/// Format batch statistics as human-readable text.
pub(crate) fn format_batch_text(stats: &BatchStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Games: {}\n", stats.games_played));
    if stats.failures > 0 {
        out.push_str(&format!("Failed runs: {}\n", stats.failures));
    }
    out.push_str(&format!("Wipeouts: {}\n", stats.wipeouts));
    out.push('\n');
    out.push_str("Faction   Dominated   Avg survivors\n");
    for (index, faction) in ALL_FACTIONS.iter().enumerate() {
        let avg = if stats.games_played > 0 {
            stats.survivors[index] as f64 / stats.games_played as f64
        } else {
            0.0
        };
        out.push_str(&format!(
            "{:<9} {:>9}   {avg:>13.2}\n",
            format!("{faction:?}"),
            stats.dominations[index],
        ));
    }
    out
}

/// Format batch statistics as CSV.
pub(crate) fn format_batch_csv(stats: &BatchStats) -> String {
    let mut out = String::from("faction,dominated,total_survivors\n");
    for (index, faction) in ALL_FACTIONS.iter().enumerate() {
        out.push_str(&format!(
            "{},{},{}\n",
            faction.letter(),
            stats.dominations[index],
            stats.survivors[index],
        ));
    }
    out
}

/// JSON-serializable batch result.
#[derive(Debug, Serialize)]
pub(crate) struct JsonBatchResult {
    games: u64,
    failures: u64,
    wipeouts: u64,
    factions: Vec<JsonBatchFaction>,
}

#[derive(Debug, Serialize)]
struct JsonBatchFaction {
    faction: char,
    dominated: u64,
    total_survivors: u64,
}

impl JsonBatchResult {
    /// Build from merged stats.
    pub(crate) fn from_stats(stats: &BatchStats) -> Self {
        Self {
            games: stats.games_played,
            failures: stats.failures,
            wipeouts: stats.wipeouts,
            factions: ALL_FACTIONS
                .iter()
                .enumerate()
                .map(|(index, faction)| JsonBatchFaction {
                    faction: faction.letter(),
                    dominated: stats.dominations[index],
                    total_survivors: stats.survivors[index],
                })
                .collect(),
        }
    }
}

/// Color tag for a faction cell in the TUI.
pub(crate) fn faction_letter_color(letter: char) -> ratatui::style::Color {
    use ratatui::style::Color;
    match Faction::from_letter(letter) {
        Some(Faction::Earth) => Color::Green,
        Some(Faction::Water) => Color::Blue,
        Some(Faction::Fire) => Color::Red,
        Some(Faction::Air) => Color::Cyan,
        None => Color::DarkGray,
    }
}
