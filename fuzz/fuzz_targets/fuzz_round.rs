//! Fuzz short single-worker runs with arbitrary placements: the run
//! must complete without panicking and end in an invariant-clean state.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use skirmish::scenario::UnitPlacement;
use skirmish::sim::unit::{ALL_FACTIONS, Faction};
use skirmish::sim::{Partition, check_partition};
use skirmish::{Scenario, run_scenario};

#[derive(Debug, Arbitrary)]
struct FuzzPlacement {
    faction_index: u8,
    x: i8,
    y: i8,
}

#[derive(Debug, Arbitrary)]
struct FuzzRun {
    rounds: u8,
    placements: Vec<FuzzPlacement>,
}

const GRID_SIZE: usize = 6;

fuzz_target!(|run: FuzzRun| {
    let wave: Vec<UnitPlacement> = run
        .placements
        .iter()
        .take(24)
        .map(|p| UnitPlacement {
            faction: faction_from(p.faction_index),
            // Deliberately includes out-of-bounds coordinates; those
            // placements must be skipped, not fatal.
            x: i64::from(p.x),
            y: i64::from(p.y),
        })
        .collect();
    let scenario = Scenario {
        grid_size: GRID_SIZE,
        rounds: u32::from(run.rounds % 4),
        units_per_faction: wave.len(),
        waves: vec![wave],
    };

    let report = run_scenario(&scenario, 2).expect("single-worker run");

    let mut grid = Partition::new(GRID_SIZE, 0, 0);
    for unit in &report.units {
        assert!(grid.place_unit(unit.clone()), "survivor out of bounds");
    }
    assert!(check_partition(&grid).is_empty());
});

fn faction_from(index: u8) -> Faction {
    ALL_FACTIONS[usize::from(index) % ALL_FACTIONS.len()]
}
