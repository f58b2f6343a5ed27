//! Property-based tests for topology, combat arithmetic, and scenario
//! round-trips.
//!
//! Run with: cargo test --release prop_sim

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use skirmish::scenario::{GenerateConfig, Scenario, generate};
use skirmish::sim::unit::{Faction, Unit};
use skirmish::sim::{Partition, check_partition};
use skirmish::topology::{ALL_DIRECTIONS, Topology};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Every valid (side, partition) pair tiles the grid exactly once.
    #[test]
    fn prop_partition_tiling(side in 1usize..=6, part in 1usize..=6) {
        let grid = side * part;
        let world = side * side + 1;
        let topology = Topology::new(grid, world).unwrap();
        prop_assert_eq!(topology.partition_size(), part);

        let mut claims = vec![0u32; grid * grid];
        for rank in 1..=topology.worker_count() {
            let (ox, oy) = topology.origin(rank);
            for dy in 0..part as i64 {
                for dx in 0..part as i64 {
                    let (x, y) = (ox + dx, oy + dy);
                    prop_assert_eq!(topology.owner_of(x, y), Some(rank));
                    claims[(y as usize) * grid + (x as usize)] += 1;
                }
            }
        }
        prop_assert!(claims.iter().all(|&c| c == 1));
    }

    /// relation_of agrees with mesh adjacency and is antisymmetric
    /// (the peer sees the opposite direction).
    #[test]
    fn prop_relation_consistency(side in 1usize..=6) {
        let world = side * side + 1;
        let topology = Topology::new(side * 2, world).unwrap();
        for rank in 1..=topology.worker_count() {
            for direction in ALL_DIRECTIONS {
                if let Some(peer) = topology.neighbor_in(rank, direction) {
                    prop_assert_eq!(topology.relation_of(rank, peer), Some(direction));
                    prop_assert_eq!(
                        topology.relation_of(peer, rank),
                        Some(direction.opposite())
                    );
                }
            }
        }
    }

    /// Earth takes floor(total / 2); everyone else takes the total.
    #[test]
    fn prop_damage_mitigation(total in 0i32..10_000) {
        let mut earth = Unit::new(Faction::Earth, 0, 0);
        earth.apply_damage(total);
        prop_assert_eq!(earth.hp, 18 - total / 2);

        let mut water = Unit::new(Faction::Water, 0, 0);
        water.apply_damage(total);
        prop_assert_eq!(water.hp, 14 - total);
    }

    /// Healing never lowers HP and never exceeds the maximum.
    #[test]
    fn prop_heal_bounded(faction_index in 0usize..4, hp in 1i32..18) {
        let faction = [Faction::Earth, Faction::Water, Faction::Fire, Faction::Air]
            [faction_index];
        let hp = hp.min(faction.max_hp());
        let mut unit = Unit::new(faction, 0, 0);
        unit.hp = hp;
        unit.heal();
        prop_assert!(unit.hp >= hp);
        prop_assert!(unit.hp <= faction.max_hp());
    }

    /// Absorbing merges attack additively and caps HP at the mover's
    /// maximum, regardless of merge order.
    #[test]
    fn prop_absorb_caps(hp_a in 1i32..=10, hp_b in 1i32..=10, hp_c in 1i32..=10) {
        let merge = |first: i32, second: i32, third: i32| {
            let mut mover = Unit::new(Faction::Air, 0, 0);
            mover.hp = first;
            let mut other = Unit::new(Faction::Air, 0, 0);
            other.hp = second;
            mover.absorb(&other);
            let mut last = Unit::new(Faction::Air, 0, 0);
            last.hp = third;
            mover.absorb(&last);
            (mover.hp, mover.attack)
        };
        let (hp_one, attack_one) = merge(hp_a, hp_b, hp_c);
        let (hp_two, attack_two) = merge(hp_a, hp_c, hp_b);
        prop_assert_eq!(hp_one, (hp_a + hp_b + hp_c).min(10));
        prop_assert_eq!(hp_one, hp_two);
        prop_assert_eq!(attack_one, 6);
        prop_assert_eq!(attack_two, 6);
    }

    /// Summed damage resolution is order-independent.
    #[test]
    fn prop_damage_order_irrelevant(amounts in prop::collection::vec(1i32..10, 1..8)) {
        let run = |amounts: &[i32]| {
            let mut partition = Partition::new(3, 0, 0);
            partition.place_unit(Unit::new(Faction::Earth, 1, 1));
            for &amount in amounts {
                partition.enqueue_damage(1, 1, amount);
            }
            partition.resolve_damage();
            partition.unit_at(1, 1).map(|u| u.hp)
        };
        let forward = run(&amounts);
        let reversed: Vec<i32> = amounts.iter().rev().copied().collect();
        prop_assert_eq!(forward, run(&reversed));
    }

    /// Generated scenarios are in-bounds, collision-free per wave, and
    /// survive a text round-trip.
    #[test]
    fn prop_generated_scenarios_round_trip(
        grid in 4usize..24,
        upf in 1usize..4,
        waves in 1usize..4,
        seed in any::<u64>()
    ) {
        let config = GenerateConfig {
            grid_size: grid,
            waves,
            units_per_faction: upf,
            rounds: 3,
        };
        let scenario = generate(&config, seed).unwrap();
        for wave in &scenario.waves {
            prop_assert_eq!(wave.len(), 4 * upf);
            let mut seen = std::collections::HashSet::new();
            for placement in wave {
                prop_assert!(placement.x >= 0 && (placement.x as usize) < grid);
                prop_assert!(placement.y >= 0 && (placement.y as usize) < grid);
                prop_assert!(seen.insert((placement.x, placement.y)));
            }
        }
        let reparsed = Scenario::parse(&scenario.to_text()).unwrap();
        prop_assert_eq!(scenario, reparsed);
    }

    /// A short single-worker run never violates partition invariants in
    /// its final state.
    #[test]
    fn prop_final_state_upholds_invariants(seed in any::<u64>()) {
        let config = GenerateConfig {
            grid_size: 6,
            waves: 1,
            units_per_faction: 3,
            rounds: 2,
        };
        let scenario = generate(&config, seed).unwrap();
        let report = skirmish::run_scenario(&scenario, 2).unwrap();

        let mut grid = Partition::new(6, 0, 0);
        for unit in &report.units {
            prop_assert!(grid.place_unit(unit.clone()));
        }
        let violations = check_partition(&grid);
        prop_assert!(violations.is_empty(), "violations: {violations:?}");
    }
}
