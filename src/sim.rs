//! Simulation layer: units, partitions, targeting, and the per-worker
//! round state machine.
//!
//! - Units and their per-faction behavior tables
//! - The partition grid with its transient per-round queues
//! - Halo views and attack-pattern evaluation over them
//! - The barrier-synchronized round state machine
//! - Sanity invariants used by tests and fuzzing

pub mod halo;
pub mod invariants;
pub mod partition;
pub mod targeting;
pub mod unit;
pub mod worker;

pub use halo::{HaloSlice, NeighborHalos};
pub use invariants::{InvariantViolation, check_partition};
pub use partition::Partition;
pub use targeting::{TargetView, air_targets, best_air_move, fixed_targets};
pub use unit::{Decision, Faction, Unit};
pub use worker::Worker;
