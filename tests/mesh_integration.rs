//! Integration tests for the mesh protocol and full simulation runs.
//!
//! Run with: cargo test --test mesh_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use skirmish::protocol::{DeathRecord, Payload};
use skirmish::scenario::{GenerateConfig, Scenario, UnitPlacement, generate};
use skirmish::sim::unit::Faction;
use skirmish::topology::ALL_DIRECTIONS;
use skirmish::{Links, Topology, run_scenario};
use std::sync::mpsc;
use std::time::Duration;

fn one_wave(grid_size: usize, rounds: u32, wave: Vec<UnitPlacement>) -> Scenario {
    Scenario {
        grid_size,
        rounds,
        units_per_faction: wave.len(),
        waves: vec![wave],
    }
}

fn unit(faction: Faction, x: i64, y: i64) -> UnitPlacement {
    UnitPlacement { faction, x, y }
}

/// Exchange symmetry: what A receives from direction d is exactly what
/// the neighbor in d sent toward the opposite direction.
#[test]
fn test_exchange_symmetry_across_mesh_sizes() {
    for side in 2..=4usize {
        let world_size = side * side + 1;
        let topology = Topology::new(side * 2, world_size).unwrap();
        let links = Links::mesh(&topology);

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = links
                .into_iter()
                .map(|link| {
                    s.spawn(move || {
                        let rank = link.rank();
                        let outgoing = std::array::from_fn(|i| {
                            Payload::Deaths(vec![DeathRecord {
                                x: rank as i64,
                                y: i as i64,
                            }])
                        });
                        (rank, link.exchange(outgoing).unwrap())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (rank, incoming) in results {
            for direction in ALL_DIRECTIONS {
                match topology.neighbor_in(rank, direction) {
                    Some(peer) => {
                        let deaths = incoming[direction.index()]
                            .clone()
                            .and_then(Payload::into_deaths)
                            .unwrap();
                        assert_eq!(
                            deaths,
                            vec![DeathRecord {
                                x: peer as i64,
                                y: direction.opposite().index() as i64,
                            }],
                            "side {side}, rank {rank}, direction {direction:?}"
                        );
                    }
                    None => assert!(incoming[direction.index()].is_none()),
                }
            }
        }
    }
}

/// Deadlock freedom: for every mesh side in 1..=5, repeated exchanges
/// under strictly blocking send/receive all run to completion. A hang
/// here fails via the watchdog timeout instead of wedging the suite.
#[test]
fn test_exchange_deadlock_freedom() {
    const EXCHANGES_PER_WORKER: usize = 4;

    for side in 1..=5usize {
        let world_size = side * side + 1;
        let topology = Topology::new(side * 10, world_size).unwrap();
        let links = Links::mesh(&topology);
        let (done_tx, done_rx) = mpsc::channel();

        let handles: Vec<_> = links
            .into_iter()
            .map(|link| {
                let done_tx = done_tx.clone();
                std::thread::spawn(move || {
                    // Back-to-back exchanges with no barrier between
                    // them, like the phases inside one round.
                    for round in 0..EXCHANGES_PER_WORKER {
                        let outgoing = std::array::from_fn(|i| {
                            Payload::Deaths(vec![DeathRecord {
                                x: (link.rank() * 100 + round) as i64,
                                y: i as i64,
                            }])
                        });
                        link.exchange(outgoing).unwrap();
                    }
                    done_tx.send(link.rank()).unwrap();
                })
            })
            .collect();
        drop(done_tx);

        for _ in 0..side * side {
            done_rx
                .recv_timeout(Duration::from_secs(30))
                .unwrap_or_else(|_| panic!("exchange deadlocked on a {side}x{side} mesh"));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}

/// The end-to-end scenario of the protocol's acceptance check: a 2x2
/// mesh, grid size 4, one wave, one round, a single Earth unit at the
/// global origin with nothing in range. It stays, stays full HP, and
/// renders as a lone `E`.
#[test]
fn test_lone_earth_unit_on_2x2_mesh() {
    let scenario = one_wave(4, 1, vec![unit(Faction::Earth, 0, 0)]);
    let report = run_scenario(&scenario, 5).unwrap();

    assert_eq!(report.rows[0], "E...");
    for row in &report.rows[1..] {
        assert_eq!(row, "....");
    }
    assert_eq!(report.units.len(), 1);
    let earth = &report.units[0];
    assert_eq!((earth.x, earth.y), (0, 0));
    assert_eq!(earth.hp, 18, "healing caps at maximum HP");
}

/// Cross-partition movement and attack on a 2x2 mesh: the Air unit
/// crosses into a neighbor's partition because two enemies are
/// reachable from there, then trades blows across two partition
/// boundaries in the same round.
#[test]
fn test_cross_partition_move_and_attack() {
    let scenario = one_wave(
        4,
        1,
        vec![
            unit(Faction::Air, 1, 1),
            unit(Faction::Fire, 3, 0),
            unit(Faction::Fire, 3, 2),
        ],
    );
    let report = run_scenario(&scenario, 5).unwrap();

    let air = report
        .units
        .iter()
        .find(|u| u.faction == Faction::Air)
        .unwrap();
    assert_eq!(
        (air.x, air.y),
        (1, 2),
        "the first candidate reaching both enemies wins the tie"
    );
    assert_eq!(air.hp, 10, "out of both Fires' reach");

    let fires: Vec<_> = report
        .units
        .iter()
        .filter(|u| u.faction == Faction::Fire)
        .collect();
    assert_eq!(fires.len(), 2);
    for fire in fires {
        // One far-cell Air strike each (2 damage, routed across a
        // partition boundary), then the forced-skip heal of 1.
        assert_eq!(fire.hp, 11);
        assert_eq!(fire.attack, 4, "no kills, no power-up");
    }
}

/// Fire kill confirmation across six rounds, then the wave-end reset.
#[test]
fn test_fire_kills_and_wave_end_reset() {
    let scenario = one_wave(
        8,
        6,
        vec![
            unit(Faction::Fire, 3, 3),
            unit(Faction::Water, 2, 3),
            unit(Faction::Water, 4, 3),
            unit(Faction::Water, 3, 2),
        ],
    );
    let report = run_scenario(&scenario, 2).unwrap();

    // The Waters (orthogonal neighbors) cannot strike diagonally, so
    // they heal 2 against 4 damage per round and all die in round six.
    assert_eq!(report.faction_counts(), [0, 0, 1, 0]);
    let fire = &report.units[0];
    assert_eq!(fire.hp, 12, "never touched");
    assert_eq!(
        fire.attack, 4,
        "attack power resets to base at wave end regardless of kills"
    );
}

/// Water spawns exactly once per wave end, not once per round.
#[test]
fn test_water_spawns_once_per_wave() {
    let scenario = one_wave(4, 3, vec![unit(Faction::Water, 1, 1)]);
    let report = run_scenario(&scenario, 2).unwrap();

    assert_eq!(report.faction_counts(), [0, 2, 0, 0]);
    let positions: Vec<_> = report.units.iter().map(|u| (u.x, u.y)).collect();
    assert!(positions.contains(&(1, 1)));
    assert!(
        positions.contains(&(0, 0)),
        "spawn lands on the first empty Moore neighbor in scan order"
    );
}

/// Survivors persist across waves and new placements skip occupied
/// cells.
#[test]
fn test_waves_accumulate_survivors() {
    let scenario = Scenario {
        grid_size: 4,
        rounds: 1,
        units_per_faction: 1,
        waves: vec![
            vec![unit(Faction::Earth, 2, 2)],
            // Second wave tries the occupied cell (skipped) and a
            // fresh one.
            vec![unit(Faction::Fire, 2, 2), unit(Faction::Fire, 0, 0)],
        ],
    };
    let report = run_scenario(&scenario, 2).unwrap();

    assert_eq!(report.faction_counts(), [1, 0, 1, 0]);
    let earth = report
        .units
        .iter()
        .find(|u| u.faction == Faction::Earth)
        .unwrap();
    assert_eq!((earth.x, earth.y), (2, 2), "the occupied cell kept its unit");
}

/// The same scenario produces identical results on every valid mesh
/// size: partitioning is an implementation detail of the protocol, not
/// of the simulation's semantics.
#[test]
fn test_mesh_size_transparency() {
    let config = GenerateConfig {
        grid_size: 12,
        waves: 2,
        units_per_faction: 8,
        rounds: 3,
    };
    let scenario = generate(&config, 2024).unwrap();

    let mut reports = Vec::new();
    for world_size in [2, 5, 10, 17] {
        let report = run_scenario(&scenario, world_size).unwrap();
        reports.push((world_size, report));
    }

    let (_, reference) = &reports[0];
    let mut reference_units: Vec<_> = reference
        .units
        .iter()
        .map(|u| (u.x, u.y, u.faction, u.hp, u.attack))
        .collect();
    reference_units.sort_unstable();

    for (world_size, report) in &reports[1..] {
        assert_eq!(
            report.rows, reference.rows,
            "world size {world_size} diverged from the single-worker run"
        );
        let mut units: Vec<_> = report
            .units
            .iter()
            .map(|u| (u.x, u.y, u.faction, u.hp, u.attack))
            .collect();
        units.sort_unstable();
        assert_eq!(units, reference_units);
    }
}

/// Repeated runs are bit-identical: no hidden nondeterminism from
/// thread scheduling leaks into the result.
#[test]
fn test_runs_are_deterministic() {
    let config = GenerateConfig {
        grid_size: 9,
        waves: 2,
        units_per_faction: 5,
        rounds: 4,
    };
    let scenario = generate(&config, 7).unwrap();

    let first = run_scenario(&scenario, 10).unwrap();
    let second = run_scenario(&scenario, 10).unwrap();
    assert_eq!(first, second);
}
