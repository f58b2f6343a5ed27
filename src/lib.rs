// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Skirmish: a deterministic distributed faction-combat simulator.
//!
//! A turn-based four-faction battle runs on a square grid partitioned
//! across a mesh of workers, one thread per partition, with no shared
//! simulation state. Workers see their neighbors' boundary cells only
//! through halo exchanges over blocking rendezvous channels, so the
//! exchange ordering itself is what keeps the mesh deadlock-free.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Runner (threads + channels)     │
//! ├───────────────┬─────────────────────┤
//! │  Coordinator  │  Worker mesh        │
//! │  scatter /    │  round state machine│
//! │  barriers /   │  halo exchange      │
//! │  gather       │  partition + units  │
//! └───────────────┴─────────────────────┘
//! ```

pub mod comm;
pub mod coordinator;
pub mod error;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod sim;
pub mod sync;
pub mod topology;

pub use comm::Links;
pub use coordinator::{Coordinator, RoundSnapshot, SimReport};
pub use error::{ConfigError, ScenarioError, SimError};
pub use runner::{RunOptions, run_scenario, run_scenario_with};
pub use scenario::{GenerateConfig, Scenario, UnitPlacement, generate};
pub use sim::{Faction, Partition, Unit, Worker};
pub use sync::PhaseClock;
pub use topology::{Direction, NeighborTable, Rank, Topology};
