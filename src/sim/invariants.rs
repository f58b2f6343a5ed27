//! Partition sanity checks - bug detectors for tests and fuzzing.
//!
//! None of these should ever trigger in a correct run; they are not
//! gameplay limits. Bounds are deliberately generous.

use crate::sim::partition::Partition;
use crate::sim::unit::Faction;

/// Sanity bound on attack power. Air merges add attack without a cap,
/// but a merged stack of every Air unit in a plausible scenario stays
/// far below this.
pub const SANITY_MAX_ATTACK: i32 = 1024;

/// An invariant violation found in a partition.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check a partition between rounds.
///
/// Returns every violation found: units whose coordinates disagree with
/// the cell holding them, dead or over-healed units still on the grid,
/// implausible attack values, kill claims on non-Fire units, and
/// undrained transient queues.
#[must_use]
pub fn check_partition(partition: &Partition) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let (offset_x, offset_y) = partition.offset();
    let size = i64::try_from(partition.size()).unwrap_or(i64::MAX);

    for dy in 0..size {
        for dx in 0..size {
            let (x, y) = (offset_x + dx, offset_y + dy);
            let Some(unit) = partition.unit_at(x, y) else {
                continue;
            };
            if (unit.x, unit.y) != (x, y) {
                violations.push(InvariantViolation {
                    message: format!(
                        "unit at cell ({x}, {y}) believes it is at ({}, {})",
                        unit.x, unit.y
                    ),
                });
            }
            if unit.hp <= 0 || unit.hp > unit.faction.max_hp() {
                violations.push(InvariantViolation {
                    message: format!(
                        "{:?} at ({x}, {y}) has HP {} outside (0, {}]",
                        unit.faction,
                        unit.hp,
                        unit.faction.max_hp()
                    ),
                });
            }
            if unit.attack < unit.faction.base_attack() || unit.attack > SANITY_MAX_ATTACK {
                violations.push(InvariantViolation {
                    message: format!(
                        "{:?} at ({x}, {y}) has implausible attack {}",
                        unit.faction, unit.attack
                    ),
                });
            }
            if unit.faction != Faction::Fire && !unit.kill_claims.is_empty() {
                violations.push(InvariantViolation {
                    message: format!(
                        "{:?} at ({x}, {y}) carries kill claims",
                        unit.faction
                    ),
                });
            }
        }
    }

    if !partition.queues_empty() {
        violations.push(InvariantViolation {
            message: "transient queues not drained between rounds".to_string(),
        });
    }

    violations
}
