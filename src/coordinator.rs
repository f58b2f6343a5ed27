//! The coordinator: initial distribution, barrier mirroring, and state
//! gathering.
//!
//! The coordinator owns the assembled global grid only during initial
//! distribution and at gather points; during active rounds it merely
//! mirrors the workers' barrier sequence.

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, debug_span};

use crate::error::SimError;
use crate::protocol::{CoordinatorMsg, WaveInfo, WorkerMsg};
use crate::scenario::Scenario;
use crate::sim::partition::Partition;
use crate::sim::unit::{ALL_FACTIONS, Faction, Unit};
use crate::sync::PhaseClock;
use crate::topology::{Rank, Topology};

/// Barriers per round mirrored by the coordinator (one per phase
/// transition of the round state machine).
pub const BARRIERS_PER_ROUND: usize = 7;

/// One worker's pair of coordinator-side channel endpoints.
#[derive(Debug)]
pub struct CoordinatorLink {
    /// Control channel into the worker.
    pub ctrl_tx: Sender<CoordinatorMsg>,
    /// Report channel out of the worker.
    pub report_rx: Receiver<WorkerMsg>,
}

/// A gathered view of the whole grid at the end of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSnapshot {
    /// Wave index (0-based).
    pub wave: u32,
    /// Round index within the wave (0-based).
    pub round: u32,
    /// Rendered grid rows, one character per cell.
    pub rows: Vec<String>,
    /// Surviving unit counts in `ALL_FACTIONS` order.
    pub faction_counts: [usize; 4],
}

/// Final result of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimReport {
    /// Rendered final grid, one line per row.
    pub rows: Vec<String>,
    /// All surviving units with global coordinates.
    pub units: Vec<Unit>,
    /// Waves executed.
    pub waves: u32,
    /// Rounds per wave.
    pub rounds: u32,
}

impl SimReport {
    /// Surviving unit counts in `ALL_FACTIONS` order.
    #[must_use]
    pub fn faction_counts(&self) -> [usize; 4] {
        faction_counts(self.units.iter())
    }

    /// Unit of a given faction with the most survivors, if any unit
    /// survived at all. Ties resolve to the earlier faction in
    /// `ALL_FACTIONS` order.
    #[must_use]
    pub fn dominant_faction(&self) -> Option<Faction> {
        let counts = self.faction_counts();
        let (best, &count) = counts
            .iter()
            .enumerate()
            .max_by_key(|&(i, &c)| (c, std::cmp::Reverse(i)))?;
        (count > 0).then(|| ALL_FACTIONS[best])
    }
}

fn faction_counts<'a>(units: impl Iterator<Item = &'a Unit>) -> [usize; 4] {
    let mut counts = [0; 4];
    for unit in units {
        let index = ALL_FACTIONS
            .iter()
            .position(|&f| f == unit.faction)
            .unwrap_or(0);
        counts[index] += 1;
    }
    counts
}

/// The coordinator process (rank 0).
#[derive(Debug)]
pub struct Coordinator {
    topology: Topology,
    clock: PhaseClock,
    links: Vec<CoordinatorLink>,
    snapshot_rounds: bool,
    observer: Option<Sender<RoundSnapshot>>,
}

impl Coordinator {
    /// Assemble the coordinator from its wired-up worker links.
    #[must_use]
    pub fn new(
        topology: Topology,
        clock: PhaseClock,
        links: Vec<CoordinatorLink>,
        snapshot_rounds: bool,
        observer: Option<Sender<RoundSnapshot>>,
    ) -> Self {
        Self {
            topology,
            clock,
            links,
            snapshot_rounds,
            observer,
        }
    }

    /// Drive a full scenario: scatter each wave, mirror every barrier,
    /// gather each wave's final state, and report the end result.
    ///
    /// # Errors
    ///
    /// Fails fatally when a worker link closes or reports out of order.
    pub fn run(&mut self, scenario: &Scenario) -> Result<SimReport, SimError> {
        let span = debug_span!("coordinator");
        let _guard = span.enter();

        let waves = u32::try_from(scenario.waves.len()).unwrap_or(u32::MAX);
        let info = WaveInfo {
            rounds: scenario.rounds,
            waves,
        };
        for link in &self.links {
            Self::send(link, CoordinatorMsg::Waves(info))?;
        }
        self.clock.advance();

        let mut grid = Partition::new(self.topology.grid_size(), 0, 0);
        for (wave_index, wave) in scenario.waves.iter().enumerate() {
            // Survivors persist across waves; new placements skip
            // occupied cells, and out-of-bounds placements are logged
            // and dropped inside place_unit.
            for placement in wave {
                if grid.unit_at(placement.x, placement.y).is_none() {
                    grid.place_unit(Unit::new(placement.faction, placement.x, placement.y));
                }
            }
            debug!(wave = wave_index, units = grid.unit_count(), "wave initialized");

            for rank in 1..=self.topology.worker_count() {
                let sub = self.extract_partition(&grid, rank);
                Self::send(&self.links[rank - 1], CoordinatorMsg::Partition(sub))?;
            }
            self.clock.advance();

            for round in 0..scenario.rounds {
                for _ in 0..BARRIERS_PER_ROUND {
                    self.clock.advance();
                }
                if self.snapshot_rounds {
                    grid = self.gather(GatherKind::Snapshot)?;
                    self.emit_snapshot(wave_index, round, &grid);
                    self.clock.advance();
                }
            }

            self.clock.advance();
            grid = self.gather(GatherKind::Final)?;
            debug!(wave = wave_index, survivors = grid.unit_count(), "wave gathered");
            self.clock.advance();
        }

        Ok(SimReport {
            rows: grid.render_rows(),
            units: grid.units().cloned().collect(),
            waves,
            rounds: scenario.rounds,
        })
    }

    /// Copy one worker's sub-region out of the assembled grid.
    fn extract_partition(&self, grid: &Partition, rank: Rank) -> Partition {
        let size = self.topology.partition_size();
        let (offset_x, offset_y) = self.topology.origin(rank);
        let mut sub = Partition::new(size, offset_x, offset_y);
        for unit in grid.units() {
            if sub.contains(unit.x, unit.y) {
                sub.place_unit(unit.clone());
            }
        }
        sub
    }

    /// Receive one report per worker, in rank order, and reassemble the
    /// global grid.
    fn gather(&self, kind: GatherKind) -> Result<Partition, SimError> {
        let mut grid = Partition::new(self.topology.grid_size(), 0, 0);
        for (index, link) in self.links.iter().enumerate() {
            let message = link.report_rx.recv().map_err(|_| SimError::LinkClosed {
                rank: 0,
                during: kind.describe(),
            })?;
            let partition = match (kind, message) {
                (GatherKind::Final, WorkerMsg::Final { rank, partition })
                | (GatherKind::Snapshot, WorkerMsg::Snapshot { rank, partition })
                    if rank == index + 1 =>
                {
                    partition
                }
                _ => {
                    return Err(SimError::UnexpectedPayload {
                        rank: 0,
                        phase: kind.describe(),
                    });
                }
            };
            for unit in partition.units() {
                grid.place_unit(unit.clone());
            }
        }
        Ok(grid)
    }

    /// Hand a snapshot to the observer, if one is attached. A hung-up
    /// observer stops snapshots but never the simulation.
    fn emit_snapshot(&mut self, wave: usize, round: u32, grid: &Partition) {
        let Some(observer) = &self.observer else {
            return;
        };
        let snapshot = RoundSnapshot {
            wave: u32::try_from(wave).unwrap_or(u32::MAX),
            round,
            rows: grid.render_rows(),
            faction_counts: faction_counts(grid.units()),
        };
        if observer.send(snapshot).is_err() {
            self.observer = None;
        }
    }

    fn send(link: &CoordinatorLink, message: CoordinatorMsg) -> Result<(), SimError> {
        link.ctrl_tx.send(message).map_err(|_| SimError::LinkClosed {
            rank: 0,
            during: "scatter",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatherKind {
    Final,
    Snapshot,
}

impl GatherKind {
    const fn describe(self) -> &'static str {
        match self {
            GatherKind::Final => "final gather",
            GatherKind::Snapshot => "snapshot gather",
        }
    }
}
