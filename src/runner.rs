//! In-process SPMD harness: one thread per worker plus the coordinator.
//!
//! A pure-function entry point: `(scenario, world size) -> report`.
//! All channels are rendezvous channels, so the whole run has the same
//! blocking-transport semantics the exchange protocol is written for.

use crossbeam_channel::{Sender, bounded};

use crate::comm::Links;
use crate::coordinator::{Coordinator, CoordinatorLink, RoundSnapshot, SimReport};
use crate::error::SimError;
use crate::scenario::Scenario;
use crate::sim::worker::Worker;
use crate::sync::PhaseClock;
use crate::topology::Topology;

/// Options for a simulation run.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Gather and render the grid after every round (adds one barrier
    /// per round for every participant).
    pub snapshot_rounds: bool,
    /// Where per-round snapshots go. Sending is a rendezvous, so a slow
    /// observer paces the whole simulation; a dropped observer stops
    /// snapshots without stopping the run.
    pub observer: Option<Sender<RoundSnapshot>>,
}

/// Run a scenario to completion with default options.
///
/// # Errors
///
/// Returns a [`SimError`] for invalid topology configuration or a fatal
/// protocol failure.
pub fn run_scenario(scenario: &Scenario, world_size: usize) -> Result<SimReport, SimError> {
    run_scenario_with(scenario, world_size, RunOptions::default())
}

/// Run a scenario to completion.
///
/// `world_size` counts the workers plus the coordinator, mirroring the
/// process-count convention of the original protocol.
///
/// # Errors
///
/// Returns a [`SimError`] for invalid topology configuration, a fatal
/// protocol failure, or a worker thread that died.
pub fn run_scenario_with(
    scenario: &Scenario,
    world_size: usize,
    options: RunOptions,
) -> Result<SimReport, SimError> {
    let topology = Topology::new(scenario.grid_size, world_size)?;

    let mesh = Links::mesh(&topology);
    let mut clocks = PhaseClock::group(topology.world_size());
    let coordinator_clock = clocks.remove(0);

    let mut workers = Vec::with_capacity(topology.worker_count());
    let mut coordinator_links = Vec::with_capacity(topology.worker_count());
    for (links, clock) in mesh.into_iter().zip(clocks) {
        let (ctrl_tx, ctrl_rx) = bounded(0);
        let (report_tx, report_rx) = bounded(0);
        coordinator_links.push(CoordinatorLink { ctrl_tx, report_rx });
        workers.push(Worker::new(
            links,
            clock,
            topology,
            ctrl_rx,
            report_tx,
            options.snapshot_rounds,
        ));
    }

    let mut coordinator = Coordinator::new(
        topology,
        coordinator_clock,
        coordinator_links,
        options.snapshot_rounds,
        options.observer,
    );

    std::thread::scope(|scope| {
        let handles: Vec<_> = workers
            .into_iter()
            .map(|worker| {
                let rank = worker.rank();
                let handle = std::thread::Builder::new()
                    .name(format!("worker-{rank}"))
                    .spawn_scoped(scope, move || worker.run())
                    .expect("spawn worker thread");
                (rank, handle)
            })
            .collect();

        let report = coordinator.run(scenario);

        for (rank, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(SimError::WorkerPanicked { rank }),
            }
        }
        report
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::UnitPlacement;
    use crate::sim::unit::Faction;

    fn scenario(grid_size: usize, rounds: u32, wave: Vec<UnitPlacement>) -> Scenario {
        Scenario {
            grid_size,
            rounds,
            units_per_faction: wave.len(),
            waves: vec![wave],
        }
    }

    #[test]
    fn test_invalid_world_size_is_config_error() {
        let s = scenario(4, 1, vec![]);
        assert!(matches!(
            run_scenario(&s, 4),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn test_single_worker_lone_unit_survives() {
        let s = scenario(
            4,
            2,
            vec![UnitPlacement {
                faction: Faction::Earth,
                x: 1,
                y: 1,
            }],
        );
        let report = run_scenario(&s, 2).expect("run");
        assert_eq!(report.units.len(), 1);
        assert_eq!(report.units[0].faction, Faction::Earth);
        assert_eq!(report.units[0].hp, 18);
        assert_eq!(report.rows[1], ".E..");
    }

    #[test]
    fn test_out_of_bounds_placement_is_skipped() {
        let s = scenario(
            4,
            1,
            vec![
                UnitPlacement {
                    faction: Faction::Water,
                    x: 9,
                    y: 9,
                },
                UnitPlacement {
                    faction: Faction::Fire,
                    x: 0,
                    y: 0,
                },
            ],
        );
        let report = run_scenario(&s, 2).expect("run");
        // The Fire unit survives; the out-of-bounds Water never
        // existed, so it cannot have spawned either.
        assert_eq!(report.faction_counts(), [0, 0, 1, 0]);
    }

    #[test]
    fn test_dominant_faction() {
        let s = scenario(
            6,
            0,
            vec![
                UnitPlacement {
                    faction: Faction::Water,
                    x: 0,
                    y: 0,
                },
                UnitPlacement {
                    faction: Faction::Water,
                    x: 5,
                    y: 5,
                },
                UnitPlacement {
                    faction: Faction::Earth,
                    x: 3,
                    y: 3,
                },
            ],
        );
        let report = run_scenario(&s, 2).expect("run");
        assert_eq!(report.dominant_faction(), Some(Faction::Water));
    }
}
