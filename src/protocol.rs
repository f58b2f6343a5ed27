//! Typed message schemas for the mesh and coordinator channels.
//!
//! Every cross-partition effect travels as one of these messages; there
//! are no ad hoc dictionary payloads and no shared references.

use crate::sim::halo::HaloSlice;
use crate::sim::partition::Partition;
use crate::sim::unit::Unit;
use crate::topology::Rank;

/// A unit leaving its partition for a neighbor-owned destination cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveIntent {
    /// Destination x (global).
    pub x: i64,
    /// Destination y (global).
    pub y: i64,
    /// The moving unit, ownership transferred to the receiver.
    pub unit: Unit,
}

/// Damage directed at a neighbor-owned cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackMessage {
    /// Target x (global).
    pub x: i64,
    /// Target y (global).
    pub y: i64,
    /// Raw damage before the target's mitigation.
    pub damage: i32,
}

/// A wave-end Water spawn into a neighbor-owned cell. Applied by the
/// receiver without re-validation (a documented race, kept as-is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Spawn x (global).
    pub x: i64,
    /// Spawn y (global).
    pub y: i64,
}

/// A cell where a unit died this round, flooded to all neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeathRecord {
    /// Death x (global).
    pub x: i64,
    /// Death y (global).
    pub y: i64,
}

/// Startup message: how many waves, and rounds per wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveInfo {
    /// Rounds per wave.
    pub rounds: u32,
    /// Number of waves.
    pub waves: u32,
}

/// One direction-indexed payload of a halo exchange.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A boundary slice for a halo fetch.
    Halo(HaloSlice),
    /// Movement intents crossing into the receiver's partition.
    Moves(Vec<MoveIntent>),
    /// Attacks against receiver-owned cells.
    Attacks(Vec<AttackMessage>),
    /// This round's local deaths.
    Deaths(Vec<DeathRecord>),
    /// Wave-end spawn requests.
    Spawns(Vec<SpawnRequest>),
}

impl Payload {
    /// Extract a halo slice, or `None` if this is a different variant.
    #[must_use]
    pub fn into_halo(self) -> Option<HaloSlice> {
        match self {
            Payload::Halo(slice) => Some(slice),
            _ => None,
        }
    }

    /// Extract movement intents.
    #[must_use]
    pub fn into_moves(self) -> Option<Vec<MoveIntent>> {
        match self {
            Payload::Moves(moves) => Some(moves),
            _ => None,
        }
    }

    /// Extract attack messages.
    #[must_use]
    pub fn into_attacks(self) -> Option<Vec<AttackMessage>> {
        match self {
            Payload::Attacks(attacks) => Some(attacks),
            _ => None,
        }
    }

    /// Extract death records.
    #[must_use]
    pub fn into_deaths(self) -> Option<Vec<DeathRecord>> {
        match self {
            Payload::Deaths(deaths) => Some(deaths),
            _ => None,
        }
    }

    /// Extract spawn requests.
    #[must_use]
    pub fn into_spawns(self) -> Option<Vec<SpawnRequest>> {
        match self {
            Payload::Spawns(spawns) => Some(spawns),
            _ => None,
        }
    }
}

/// Coordinator-to-worker control messages.
#[derive(Debug, Clone)]
pub enum CoordinatorMsg {
    /// Wave and round counts, sent once at startup.
    Waves(WaveInfo),
    /// The worker's initial partition for a wave.
    Partition(Partition),
}

/// Worker-to-coordinator reports.
#[derive(Debug, Clone)]
pub enum WorkerMsg {
    /// The worker's partition at wave end.
    Final {
        /// Sender rank.
        rank: Rank,
        /// Final partition state.
        partition: Partition,
    },
    /// A per-round snapshot (only when snapshots are enabled).
    Snapshot {
        /// Sender rank.
        rank: Rank,
        /// Partition state at the end of the round.
        partition: Partition,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_accessors_reject_other_variants() {
        let deaths = Payload::Deaths(vec![DeathRecord { x: 1, y: 2 }]);
        assert!(deaths.clone().into_halo().is_none());
        assert!(deaths.clone().into_moves().is_none());
        let records = deaths.into_deaths().expect("deaths variant");
        assert_eq!(records, vec![DeathRecord { x: 1, y: 2 }]);
    }

    #[test]
    fn test_payload_spawns_round_trip() {
        let payload = Payload::Spawns(vec![SpawnRequest { x: 3, y: 4 }]);
        let spawns = payload.into_spawns().expect("spawns variant");
        assert_eq!(spawns[0].x, 3);
        assert_eq!(spawns[0].y, 4);
    }
}
