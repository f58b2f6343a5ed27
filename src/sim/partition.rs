//! The per-worker grid: a dense square of optional units plus the
//! transient per-round queues.
//!
//! The partition owns its units exclusively. Cross-partition effects
//! arrive as messages and are applied through the same queues local
//! effects use, so resolution order is identical on both sides of a
//! boundary.

use tracing::{debug, warn};

use crate::sim::halo::HaloSlice;
use crate::sim::unit::{Decision, Unit};
use crate::topology::{ALL_DIRECTIONS, Direction};

/// A square sub-region of the global grid owned by one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    size: usize,
    offset_x: i64,
    offset_y: i64,
    cells: Vec<Option<Unit>>,
    damage_queue: Vec<(i64, i64, i32)>,
    movement_queue: Vec<(Unit, i64, i64)>,
    removal_queue: Vec<(i64, i64)>,
    death_queue: Vec<(i64, i64)>,
}

impl Partition {
    /// Create an empty partition anchored at a global offset.
    #[must_use]
    pub fn new(size: usize, offset_x: i64, offset_y: i64) -> Self {
        Self {
            size,
            offset_x,
            offset_y,
            cells: vec![None; size * size],
            damage_queue: Vec::new(),
            movement_queue: Vec::new(),
            removal_queue: Vec::new(),
            death_queue: Vec::new(),
        }
    }

    /// Side length of the partition.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Global offset of the partition's top-left cell.
    #[must_use]
    pub const fn offset(&self) -> (i64, i64) {
        (self.offset_x, self.offset_y)
    }

    /// Whether a global coordinate falls inside this partition.
    #[must_use]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        self.local_index(x, y).is_some()
    }

    fn local_index(&self, x: i64, y: i64) -> Option<usize> {
        let lx = x - self.offset_x;
        let ly = y - self.offset_y;
        if lx < 0 || ly < 0 {
            return None;
        }
        let lx = usize::try_from(lx).ok()?;
        let ly = usize::try_from(ly).ok()?;
        if lx >= self.size || ly >= self.size {
            return None;
        }
        Some(ly * self.size + lx)
    }

    /// Unit at a global coordinate, or `None` when empty or out of
    /// bounds.
    #[must_use]
    pub fn unit_at(&self, x: i64, y: i64) -> Option<&Unit> {
        self.cells[self.local_index(x, y)?].as_ref()
    }

    /// Mutable unit access at a global coordinate.
    #[must_use]
    pub fn unit_at_mut(&mut self, x: i64, y: i64) -> Option<&mut Unit> {
        let idx = self.local_index(x, y)?;
        self.cells[idx].as_mut()
    }

    /// Place a unit at its own coordinates, overwriting any occupant.
    ///
    /// Overwriting is deliberate: duplicate wave-end spawn requests for
    /// one boundary cell resolve to the last write, exactly like the
    /// original protocol. Returns `false` (and logs a diagnostic) when
    /// the unit's coordinates fall outside this partition; the unit is
    /// dropped.
    pub fn place_unit(&mut self, unit: Unit) -> bool {
        match self.local_index(unit.x, unit.y) {
            Some(idx) => {
                self.cells[idx] = Some(unit);
                true
            }
            None => {
                warn!(
                    x = unit.x,
                    y = unit.y,
                    faction = ?unit.faction,
                    "placement out of bounds, unit skipped"
                );
                false
            }
        }
    }

    /// Remove and return the unit at a global coordinate.
    pub fn take_unit(&mut self, x: i64, y: i64) -> Option<Unit> {
        let idx = self.local_index(x, y)?;
        self.cells[idx].take()
    }

    /// Units present, in row-major scan order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.cells.iter().flatten()
    }

    /// Mutable access to every unit, in row-major scan order.
    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.cells.iter_mut().flatten()
    }

    /// Number of units present.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units().count()
    }

    /// Positions of all units, in row-major scan order. Taken as a
    /// snapshot so phases can mutate units while iterating.
    #[must_use]
    pub fn unit_positions(&self) -> Vec<(i64, i64)> {
        self.units().map(|u| (u.x, u.y)).collect()
    }

    /// Queue damage against a cell (local target or incoming message).
    pub fn enqueue_damage(&mut self, x: i64, y: i64, amount: i32) {
        self.damage_queue.push((x, y, amount));
    }

    /// Queue a unit to be placed at a new position during movement
    /// resolution.
    pub fn enqueue_movement(&mut self, unit: Unit, new_x: i64, new_y: i64) {
        self.movement_queue.push((unit, new_x, new_y));
    }

    /// Queue an origin cell to be cleared during movement resolution.
    pub fn enqueue_removal(&mut self, x: i64, y: i64) {
        self.removal_queue.push((x, y));
    }

    /// Clear all queued origin cells.
    ///
    /// Runs before [`resolve_movement`](Self::resolve_movement): a unit
    /// whose chosen destination is its own cell has both a removal and a
    /// movement queued, and clearing origins first makes that a no-op
    /// instead of a self-merge.
    pub fn resolve_removal(&mut self) {
        for (x, y) in std::mem::take(&mut self.removal_queue) {
            if let Some(idx) = self.local_index(x, y) {
                self.cells[idx] = None;
            }
        }
    }

    /// Place queued movers in enqueue order. A mover landing on an
    /// occupied cell absorbs the occupant (attack adds, HP adds up to
    /// the mover's maximum); the occupant is discarded without a death
    /// record.
    pub fn resolve_movement(&mut self) {
        for (mut unit, new_x, new_y) in std::mem::take(&mut self.movement_queue) {
            if let Some(occupant) = self.take_unit(new_x, new_y) {
                unit.absorb(&occupant);
                debug!(
                    x = new_x,
                    y = new_y,
                    faction = ?unit.faction,
                    attack = unit.attack,
                    hp = unit.hp,
                    "movers merged"
                );
            }
            unit.x = new_x;
            unit.y = new_y;
            self.place_unit(unit);
        }
    }

    /// Sum queued damage per cell and apply it to every occupant, with
    /// the faction's mitigation. Units dropping to zero or below are
    /// removed and their cells recorded in the death queue.
    pub fn resolve_damage(&mut self) {
        let mut totals: Vec<(usize, i32)> = Vec::new();
        for (x, y, amount) in std::mem::take(&mut self.damage_queue) {
            if let Some(idx) = self.local_index(x, y) {
                match totals.iter_mut().find(|(i, _)| *i == idx) {
                    Some((_, sum)) => *sum += amount,
                    None => totals.push((idx, amount)),
                }
            }
        }

        for idx in 0..self.cells.len() {
            let total = totals
                .iter()
                .find(|(i, _)| *i == idx)
                .map_or(0, |(_, sum)| *sum);
            let Some(unit) = self.cells[idx].as_mut() else {
                continue;
            };
            if total > 0 {
                unit.apply_damage(total);
                debug!(
                    x = unit.x,
                    y = unit.y,
                    faction = ?unit.faction,
                    total,
                    hp = unit.hp,
                    "damage resolved"
                );
            }
            if unit.is_dead() {
                let (x, y) = (unit.x, unit.y);
                debug!(x, y, faction = ?unit.faction, "unit died");
                self.death_queue.push((x, y));
                self.cells[idx] = None;
            }
        }
    }

    /// Heal every unit still marked `Skip`; reset everyone's decision
    /// for the next round.
    pub fn resolve_healing(&mut self) {
        for unit in self.cells.iter_mut().flatten() {
            if unit.decision == Decision::Skip {
                unit.heal();
                debug!(
                    x = unit.x,
                    y = unit.y,
                    faction = ?unit.faction,
                    hp = unit.hp,
                    "healed"
                );
            } else {
                unit.decision = Decision::Skip;
            }
        }
    }

    /// Cells where units died this round.
    #[must_use]
    pub fn deaths(&self) -> &[(i64, i64)] {
        &self.death_queue
    }

    /// Clear the death queue at the end of the round.
    pub fn clear_deaths(&mut self) {
        self.death_queue.clear();
    }

    /// Whether all transient queues are drained (between-rounds
    /// invariant).
    #[must_use]
    pub fn queues_empty(&self) -> bool {
        self.damage_queue.is_empty()
            && self.movement_queue.is_empty()
            && self.removal_queue.is_empty()
            && self.death_queue.is_empty()
    }

    /// Extract the boundary slice facing `direction`, `width` cells deep
    /// (clamped to the partition size).
    #[must_use]
    pub fn edge_slice(&self, direction: Direction, width: usize) -> HaloSlice {
        let w = width.min(self.size);
        let size = self.size;
        let far = size - w;
        // (x range start, y range start, slice width, slice height)
        let (sx, sy, sw, sh) = match direction {
            Direction::Above => (0, 0, size, w),
            Direction::Below => (0, far, size, w),
            Direction::Left => (0, 0, w, size),
            Direction::Right => (far, 0, w, size),
            Direction::AboveLeft => (0, 0, w, w),
            Direction::AboveRight => (far, 0, w, w),
            Direction::BelowLeft => (0, far, w, w),
            Direction::BelowRight => (far, far, w, w),
        };

        let mut cells = Vec::with_capacity(sw * sh);
        for y in sy..sy + sh {
            for x in sx..sx + sw {
                cells.push(self.cells[y * size + x].clone());
            }
        }
        HaloSlice::new(
            self.offset_x + to_i64(sx),
            self.offset_y + to_i64(sy),
            sw,
            sh,
            cells,
        )
    }

    /// Boundary slices for all eight directions at once.
    #[must_use]
    pub fn edge_slices(&self, width: usize) -> [HaloSlice; 8] {
        std::array::from_fn(|i| self.edge_slice(ALL_DIRECTIONS[i], width))
    }

    /// Render the partition as text rows: the faction letter per
    /// occupied cell, `.` for empty.
    #[must_use]
    pub fn render_rows(&self) -> Vec<String> {
        (0..self.size)
            .map(|y| {
                (0..self.size)
                    .map(|x| {
                        self.cells[y * self.size + x]
                            .as_ref()
                            .map_or('.', |u| u.faction.letter())
                    })
                    .collect()
            })
            .collect()
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn to_i64(v: usize) -> i64 {
    v as i64
}
