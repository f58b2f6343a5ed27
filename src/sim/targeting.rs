//! Attack-pattern evaluation against the local partition plus fetched
//! halos.
//!
//! One view answers "what is at this global cell" for everything a
//! worker can observe: its own partition, and the boundary slices its
//! neighbors sent. Cells beyond the observable halo read as empty, and
//! empty cells are never attackable, so out-of-reach targets simply
//! produce no attacks.

use crate::sim::halo::NeighborHalos;
use crate::sim::partition::Partition;
use crate::sim::unit::{Faction, MOORE_OFFSETS, Unit, movement_offsets};
use crate::topology::{Rank, Topology};

/// Everything one worker can see during a targeting phase.
#[derive(Debug, Clone, Copy)]
pub struct TargetView<'a> {
    /// Observing worker's rank.
    pub rank: Rank,
    /// Mesh geometry.
    pub topology: &'a Topology,
    /// The worker's own partition.
    pub partition: &'a Partition,
    /// Halo views fetched for this phase.
    pub halos: &'a NeighborHalos,
}

impl TargetView<'_> {
    /// The unit at a global cell, if the cell is observable and
    /// occupied.
    #[must_use]
    pub fn unit_at(&self, x: i64, y: i64) -> Option<&Unit> {
        let owner = self.topology.owner_of(x, y)?;
        if owner == self.rank {
            self.partition.unit_at(x, y)
        } else {
            let direction = self.topology.relation_of(self.rank, owner)?;
            self.halos.unit_at(direction, x, y)
        }
    }

    /// Whether an observable enemy of `faction` holds the cell.
    #[must_use]
    pub fn enemy_at(&self, x: i64, y: i64, faction: Faction) -> bool {
        self.unit_at(x, y).is_some_and(|u| u.faction != faction)
    }
}

/// Enemy cells reachable by a non-Air unit from its position, via its
/// faction's fixed offset table.
#[must_use]
pub fn fixed_targets(unit: &Unit, view: &TargetView<'_>) -> Vec<(i64, i64)> {
    let mut targets = Vec::new();
    for (dx, dy) in unit.faction.attack_offsets() {
        let (x, y) = (unit.x + dx, unit.y + dy);
        if view.enemy_at(x, y, unit.faction) {
            targets.push((x, y));
        }
    }
    targets
}

/// Enemy cells reachable by an Air unit evaluated *as if standing at*
/// `(from_x, from_y)`.
///
/// For each principal direction the near cell is checked first; the
/// unit's current cell reads as empty (it would have vacated it). An
/// enemy on the near cell is the target; a friend blocks the direction;
/// an empty near cell falls back to the doubled-distance cell. A near
/// cell off the grid skips the direction entirely.
#[must_use]
pub fn air_targets(unit: &Unit, from_x: i64, from_y: i64, view: &TargetView<'_>) -> Vec<(i64, i64)> {
    let mut targets = Vec::new();
    for (dx, dy) in MOORE_OFFSETS {
        let (near_x, near_y) = (from_x + dx, from_y + dy);
        if !view.topology.in_bounds(near_x, near_y) {
            continue;
        }
        let vacated = (near_x, near_y) == (unit.x, unit.y);
        let near = if vacated {
            None
        } else {
            view.unit_at(near_x, near_y)
        };
        match near {
            Some(occupant) if occupant.faction != unit.faction => {
                targets.push((near_x, near_y));
            }
            Some(_) => {} // a friend blocks the direction
            None => {
                let (far_x, far_y) = (from_x + 2 * dx, from_y + 2 * dy);
                if view.topology.in_bounds(far_x, far_y)
                    && view.enemy_at(far_x, far_y, unit.faction)
                {
                    targets.push((far_x, far_y));
                }
            }
        }
    }
    targets
}

/// Pick an Air unit's destination: its own cell plus the eight adjacent
/// cells in canonical direction order, keeping the first candidate with
/// the strictly highest reachable-enemy count.
///
/// Candidates off the grid or visibly occupied (locally or in a halo)
/// are invalid. With no reachable enemies anywhere, the unit stays put.
#[must_use]
pub fn best_air_move(unit: &Unit, view: &TargetView<'_>) -> (i64, i64) {
    let mut best = (unit.x, unit.y);
    let mut best_score = 0;

    let mut candidates = vec![(unit.x, unit.y)];
    candidates.extend(
        movement_offsets()
            .iter()
            .map(|(dx, dy)| (unit.x + dx, unit.y + dy)),
    );

    for (x, y) in candidates {
        if !view.topology.in_bounds(x, y) {
            continue;
        }
        let own_cell = (x, y) == (unit.x, unit.y);
        if !own_cell && view.unit_at(x, y).is_some() {
            continue;
        }
        let score = air_targets(unit, x, y, view).len();
        if score > best_score {
            best = (x, y);
            best_score = score;
        }
    }
    best
}
