//! Unit factions and per-unit combat state.
//!
//! Factions are a tagged variant with a per-variant constant table
//! (stats, attack offsets, damage mitigation) rather than a type
//! hierarchy; behavior dispatches on the tag.

use crate::topology::ALL_DIRECTIONS;

/// Fire's attack power cap after power-ups.
pub const FIRE_MAX_ATTACK: i32 = 6;

/// The four unit factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Faction {
    /// Tough orthogonal attacker; halves incoming damage.
    Earth,
    /// Diagonal attacker; spawns at wave end.
    Water,
    /// Moore-neighborhood attacker; gains attack power from kills.
    Fire,
    /// Mobile attacker with an extended two-cell pattern.
    Air,
}

/// All factions, in scenario-file order.
pub const ALL_FACTIONS: [Faction; 4] = [
    Faction::Earth,
    Faction::Water,
    Faction::Fire,
    Faction::Air,
];

impl Faction {
    /// Starting (and maximum) hit points.
    #[must_use]
    pub const fn max_hp(self) -> i32 {
        match self {
            Faction::Earth => 18,
            Faction::Water => 14,
            Faction::Fire => 12,
            Faction::Air => 10,
        }
    }

    /// Base attack power.
    #[must_use]
    pub const fn base_attack(self) -> i32 {
        match self {
            Faction::Earth => 2,
            Faction::Water => 3,
            Faction::Fire => 4,
            Faction::Air => 2,
        }
    }

    /// Healing applied in a round the unit skipped.
    #[must_use]
    pub const fn heal_amount(self) -> i32 {
        match self {
            Faction::Earth => 3,
            Faction::Water => 2,
            Faction::Fire => 1,
            Faction::Air => 2,
        }
    }

    /// Minimum HP at which the unit chooses to attack.
    #[must_use]
    pub const fn attack_threshold(self) -> i32 {
        match self {
            Faction::Earth => 9,
            Faction::Water => 7,
            Faction::Fire => 6,
            Faction::Air => 5,
        }
    }

    /// Single-letter tag used in scenario files and grid output.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Faction::Earth => 'E',
            Faction::Water => 'W',
            Faction::Fire => 'F',
            Faction::Air => 'A',
        }
    }

    /// Parse the single-letter tag.
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Faction> {
        match letter {
            'E' => Some(Faction::Earth),
            'W' => Some(Faction::Water),
            'F' => Some(Faction::Fire),
            'A' => Some(Faction::Air),
            _ => None,
        }
    }

    /// Fixed attack offsets for the non-Air factions.
    ///
    /// Air uses the extended near/far pattern in the targeting module
    /// instead of a single offset table.
    #[must_use]
    pub const fn attack_offsets(self) -> &'static [(i64, i64)] {
        match self {
            Faction::Earth => &EARTH_OFFSETS,
            Faction::Water => &WATER_OFFSETS,
            Faction::Fire => &MOORE_OFFSETS,
            Faction::Air => &[],
        }
    }
}

/// Orthogonal offsets (Earth).
pub const EARTH_OFFSETS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Diagonal offsets (Water).
pub const WATER_OFFSETS: [(i64, i64); 4] = [(-1, -1), (1, 1), (-1, 1), (1, -1)];

/// Full Moore neighborhood in row-major scan order (Fire attacks, and
/// Water's wave-end spawn scan).
pub const MOORE_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Movement candidate offsets in the canonical direction order
/// (below, above, right, left, below-left, above-left, below-right,
/// above-right). Candidate scanning is self first, then these.
#[must_use]
pub fn movement_offsets() -> [(i64, i64); 8] {
    let mut offsets = [(0, 0); 8];
    for (slot, direction) in offsets.iter_mut().zip(ALL_DIRECTIONS) {
        *slot = direction.delta();
    }
    offsets
}

/// A unit's per-round choice between attacking and recovering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    /// Attack this round; no healing.
    Attack,
    /// Sit out and heal.
    #[default]
    Skip,
}

/// One combat unit. Owned by exactly one partition at a time;
/// cross-partition movement is remove-then-place via messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Faction tag.
    pub faction: Faction,
    /// Global x coordinate (column).
    pub x: i64,
    /// Global y coordinate (row).
    pub y: i64,
    /// Current hit points.
    pub hp: i32,
    /// Current attack power. Mutated by Fire power-ups and Air merges.
    pub attack: i32,
    /// This round's attack-or-skip choice.
    pub decision: Decision,
    /// Cells this Fire unit attacked this round, pending death
    /// confirmation. Unused by other factions.
    pub kill_claims: Vec<(i64, i64)>,
}

impl Unit {
    /// Create a fresh unit at full HP.
    #[must_use]
    pub fn new(faction: Faction, x: i64, y: i64) -> Self {
        Self {
            faction,
            x,
            y,
            hp: faction.max_hp(),
            attack: faction.base_attack(),
            decision: Decision::Skip,
            kill_claims: Vec::new(),
        }
    }

    /// Choose this round's action: attack iff `hp >= threshold`.
    pub fn decide(&mut self) -> Decision {
        self.decision = if self.faction.attack_threshold() > self.hp {
            Decision::Skip
        } else {
            Decision::Attack
        };
        self.decision
    }

    /// Apply the round's summed damage. Earth takes half, floored;
    /// everyone else takes it in full.
    pub fn apply_damage(&mut self, total: i32) {
        let taken = match self.faction {
            Faction::Earth => total / 2,
            _ => total,
        };
        self.hp -= taken;
    }

    /// Heal by the faction amount, capped at maximum HP.
    pub fn heal(&mut self) {
        self.hp = (self.hp + self.faction.heal_amount()).min(self.faction.max_hp());
    }

    /// Whether the unit is dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    /// Merge an occupant into this unit when both resolved movement onto
    /// the same cell: attack powers add, HP adds up to the maximum. The
    /// occupant is discarded, not death-recorded.
    pub fn absorb(&mut self, occupant: &Unit) {
        self.attack += occupant.attack;
        self.hp = (self.hp + occupant.hp).min(self.faction.max_hp());
    }

    /// Record a Fire attack target pending death confirmation.
    pub fn record_claim(&mut self, x: i64, y: i64) {
        self.kill_claims.push((x, y));
    }

    /// Increase Fire attack power by one for a confirmed kill, capped.
    pub fn power_up(&mut self) {
        if self.attack < FIRE_MAX_ATTACK {
            self.attack += 1;
        }
    }

    /// Wave-end reset of Fire's attack power to its base value.
    pub fn reset_attack_power(&mut self) {
        self.attack = self.faction.base_attack();
    }
}

/// Kani proofs for the damage and healing arithmetic.
#[cfg(kani)]
mod kani_proofs {
    /// Halved damage never exceeds the raw amount and never underflows
    /// the accumulator range for plausible totals.
    #[kani::proof]
    fn prove_mitigation_bounded() {
        let total: i32 = kani::any();
        kani::assume(total >= 0 && total < 1 << 24);
        let halved = total / 2;
        assert!(halved <= total);
        assert!(halved >= 0);
    }

    /// Healing is capped and never reduces HP.
    #[kani::proof]
    fn prove_heal_capped() {
        let hp: i32 = kani::any();
        let heal: i32 = kani::any();
        let max: i32 = kani::any();
        kani::assume(hp >= 1 && hp <= max && max <= 100 && heal >= 0 && heal <= 10);
        let healed = (hp + heal).min(max);
        assert!(healed >= hp);
        assert!(healed <= max);
    }
}
