//! The per-worker round state machine.
//!
//! Phases execute in a fixed order with a full barrier between every
//! transition that feeds exchanged data into the next phase; one phase's
//! exchange output is the next phase's required input, so the barrier
//! placement is part of the protocol, not an optimization.

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, debug_span};

use crate::comm::Links;
use crate::error::SimError;
use crate::protocol::{
    AttackMessage, CoordinatorMsg, DeathRecord, MoveIntent, Payload, SpawnRequest, WaveInfo,
    WorkerMsg,
};
use crate::sim::halo::NeighborHalos;
use crate::sim::partition::Partition;
use crate::sim::targeting::{TargetView, air_targets, best_air_move, fixed_targets};
use crate::sim::unit::{Decision, Faction, MOORE_OFFSETS, Unit};
use crate::sync::PhaseClock;
use crate::topology::{Rank, Topology};

/// Halo depth for the movement phase: an Air unit may step one cell and
/// then scan attack targets up to two more.
pub const MOVEMENT_HALO_WIDTH: usize = 3;

/// Halo depth for the attack phase: Air's extended pattern reaches two
/// cells.
pub const ATTACK_HALO_WIDTH: usize = 2;

/// Halo depth for the wave-end spawn scan.
pub const SPAWN_HALO_WIDTH: usize = 1;

/// One worker: a partition, its mesh links, and its coordinator link.
#[derive(Debug)]
pub struct Worker {
    links: Links,
    clock: PhaseClock,
    topology: Topology,
    ctrl_rx: Receiver<CoordinatorMsg>,
    report_tx: Sender<WorkerMsg>,
    snapshot_rounds: bool,
}

impl Worker {
    /// Assemble a worker from its wired-up endpoints.
    #[must_use]
    pub fn new(
        links: Links,
        clock: PhaseClock,
        topology: Topology,
        ctrl_rx: Receiver<CoordinatorMsg>,
        report_tx: Sender<WorkerMsg>,
        snapshot_rounds: bool,
    ) -> Self {
        Self {
            links,
            clock,
            topology,
            ctrl_rx,
            report_tx,
            snapshot_rounds,
        }
    }

    /// This worker's rank.
    #[must_use]
    pub const fn rank(&self) -> Rank {
        self.links.rank()
    }

    /// Run all waves to completion.
    ///
    /// # Errors
    ///
    /// Fails fatally on a closed channel or a protocol violation.
    pub fn run(mut self) -> Result<(), SimError> {
        let span = debug_span!("worker", rank = self.rank());
        let _guard = span.enter();

        let info = self.recv_wave_info()?;
        self.clock.advance();

        for wave in 0..info.waves {
            let mut partition = self.recv_partition()?;
            self.clock.advance();

            for round in 0..info.rounds {
                debug!(wave, round, "round start");
                self.run_round(&mut partition)?;
            }

            self.end_of_wave(&mut partition)?;
            self.clock.advance();

            self.report(WorkerMsg::Final {
                rank: self.rank(),
                partition: partition.clone(),
            })?;
            self.clock.advance();
        }
        Ok(())
    }

    /// One full round: movement, attack, damage, healing, death
    /// notification, in seven barrier-separated steps.
    fn run_round(&mut self, partition: &mut Partition) -> Result<(), SimError> {
        // Movement halo fetch and decisions.
        let halos = self.fetch_halos(partition, MOVEMENT_HALO_WIDTH)?;
        let intents = self.decide_movement(partition, &halos);

        // Movement-intent exchange; arrivals queue behind local movers,
        // in neighbor index order, then message order.
        let incoming = self.links.exchange(intents.map(Payload::Moves))?;
        self.clock.advance();
        for slot in incoming {
            let Some(payload) = slot else { continue };
            for intent in self.expect_moves(payload)? {
                let MoveIntent { x, y, unit } = intent;
                partition.enqueue_movement(unit, x, y);
            }
        }
        partition.resolve_removal();
        partition.resolve_movement();
        self.clock.advance();

        // Attack halo fetch.
        let halos = self.fetch_halos(partition, ATTACK_HALO_WIDTH)?;
        self.clock.advance();

        // Attack decisions; local damage queues directly, the rest
        // routes to the owning neighbor.
        let attacks = self.decide_attacks(partition, &halos);
        let incoming = self.links.exchange(attacks.map(Payload::Attacks))?;
        for slot in incoming {
            let Some(payload) = slot else { continue };
            for message in self.expect_attacks(payload)? {
                partition.enqueue_damage(message.x, message.y, message.damage);
            }
        }
        self.clock.advance();

        partition.resolve_damage();
        self.clock.advance();

        partition.resolve_healing();
        self.clock.advance();

        // Death notification: the same record list floods to all eight
        // neighbors, then Fire units confirm their kills.
        let deaths: Vec<DeathRecord> = partition
            .deaths()
            .iter()
            .map(|&(x, y)| DeathRecord { x, y })
            .collect();
        let incoming = self
            .links
            .exchange(std::array::from_fn(|_| Payload::Deaths(deaths.clone())))?;
        let mut confirmed: Vec<DeathRecord> = Vec::new();
        for slot in incoming {
            let Some(payload) = slot else { continue };
            confirmed.extend(self.expect_deaths(payload)?);
        }
        confirmed.extend(deaths);
        self.power_up_fire(partition, &confirmed);
        partition.clear_deaths();
        self.clock.advance();

        if self.snapshot_rounds {
            self.report(WorkerMsg::Snapshot {
                rank: self.rank(),
                partition: partition.clone(),
            })?;
            self.clock.advance();
        }
        Ok(())
    }

    /// Decide every Air unit's movement. Local destinations enqueue a
    /// removal plus a movement; neighbor-owned destinations enqueue only
    /// the removal and emit a [`MoveIntent`] toward the owner.
    fn decide_movement(
        &self,
        partition: &mut Partition,
        halos: &NeighborHalos,
    ) -> [Vec<MoveIntent>; 8] {
        let mut intents: [Vec<MoveIntent>; 8] = std::array::from_fn(|_| Vec::new());
        for (x, y) in partition.unit_positions() {
            let decision = {
                let Some(unit) = partition.unit_at(x, y) else {
                    continue;
                };
                if unit.faction != Faction::Air {
                    continue;
                }
                let view = TargetView {
                    rank: self.rank(),
                    topology: &self.topology,
                    partition,
                    halos,
                };
                (best_air_move(unit, &view), unit.clone())
            };
            let ((new_x, new_y), mover) = decision;

            let Some(owner) = self.topology.owner_of(new_x, new_y) else {
                continue;
            };
            debug!(x, y, new_x, new_y, owner, "air unit moving");
            if owner == self.rank() {
                partition.enqueue_removal(x, y);
                partition.enqueue_movement(mover, new_x, new_y);
            } else if let Some(direction) = self.topology.relation_of(self.rank(), owner) {
                partition.enqueue_removal(x, y);
                intents[direction.index()].push(MoveIntent {
                    x: new_x,
                    y: new_y,
                    unit: mover,
                });
            }
        }
        intents
    }

    /// Decide and route every unit's attacks. A unit with no routed
    /// target has its decision forced back to `Skip` so it heals this
    /// round.
    fn decide_attacks(
        &self,
        partition: &mut Partition,
        halos: &NeighborHalos,
    ) -> [Vec<AttackMessage>; 8] {
        let mut outgoing: [Vec<AttackMessage>; 8] = std::array::from_fn(|_| Vec::new());
        for (x, y) in partition.unit_positions() {
            let Some(decision) = partition.unit_at_mut(x, y).map(Unit::decide) else {
                continue;
            };
            let mut attacked = false;
            if decision == Decision::Attack {
                let (targets, faction, power) = {
                    let Some(unit) = partition.unit_at(x, y) else {
                        continue;
                    };
                    let view = TargetView {
                        rank: self.rank(),
                        topology: &self.topology,
                        partition,
                        halos,
                    };
                    let targets = if unit.faction == Faction::Air {
                        air_targets(unit, x, y, &view)
                    } else {
                        fixed_targets(unit, &view)
                    };
                    (targets, unit.faction, unit.attack)
                };

                for (target_x, target_y) in targets {
                    let Some(owner) = self.topology.owner_of(target_x, target_y) else {
                        continue;
                    };
                    if owner == self.rank() {
                        partition.enqueue_damage(target_x, target_y, power);
                    } else if let Some(direction) = self.topology.relation_of(self.rank(), owner)
                    {
                        outgoing[direction.index()].push(AttackMessage {
                            x: target_x,
                            y: target_y,
                            damage: power,
                        });
                    } else {
                        continue;
                    }
                    attacked = true;
                    debug!(x, y, target_x, target_y, owner, "attack queued");
                    if faction == Faction::Fire
                        && let Some(unit) = partition.unit_at_mut(x, y)
                    {
                        unit.record_claim(target_x, target_y);
                    }
                }
            }
            if !attacked
                && let Some(unit) = partition.unit_at_mut(x, y)
            {
                unit.decision = Decision::Skip;
            }
        }
        outgoing
    }

    /// Raise Fire attack power for every confirmed kill among the
    /// round's death records, then drop all pending claims.
    fn power_up_fire(&self, partition: &mut Partition, deaths: &[DeathRecord]) {
        for unit in partition.units_mut() {
            if unit.faction != Faction::Fire {
                continue;
            }
            for death in deaths {
                if unit.kill_claims.contains(&(death.x, death.y)) {
                    unit.power_up();
                    debug!(
                        x = unit.x,
                        y = unit.y,
                        attack = unit.attack,
                        "fire kill confirmed"
                    );
                }
            }
            unit.kill_claims.clear();
        }
    }

    /// End-of-wave: Water spawning (once per unit), then Fire's attack
    /// power reset.
    fn end_of_wave(&mut self, partition: &mut Partition) -> Result<(), SimError> {
        let halos = self.fetch_halos(partition, SPAWN_HALO_WIDTH)?;

        let mut local_spawns: Vec<(i64, i64)> = Vec::new();
        let mut requests: [Vec<SpawnRequest>; 8] = std::array::from_fn(|_| Vec::new());
        for (x, y) in partition.unit_positions() {
            let Some(unit) = partition.unit_at(x, y) else {
                continue;
            };
            if unit.faction != Faction::Water {
                continue;
            }
            for (dx, dy) in MOORE_OFFSETS {
                let (nx, ny) = (x + dx, y + dy);
                let Some(owner) = self.topology.owner_of(nx, ny) else {
                    continue;
                };
                if owner == self.rank() {
                    if partition.unit_at(nx, ny).is_none() {
                        local_spawns.push((nx, ny));
                        break;
                    }
                } else if let Some(direction) = self.topology.relation_of(self.rank(), owner) {
                    if halos.unit_at(direction, nx, ny).is_none() {
                        requests[direction.index()].push(SpawnRequest { x: nx, y: ny });
                        break;
                    }
                }
            }
        }

        for (x, y) in local_spawns {
            debug!(x, y, "water spawned");
            partition.place_unit(Unit::new(Faction::Water, x, y));
        }

        // Requests apply unconditionally on the receiving side; the
        // emptiness check happened against the sender's halo snapshot.
        let incoming = self.links.exchange(requests.map(Payload::Spawns))?;
        for slot in incoming {
            let Some(payload) = slot else { continue };
            for request in self.expect_spawns(payload)? {
                debug!(x = request.x, y = request.y, "water spawned by request");
                partition.place_unit(Unit::new(Faction::Water, request.x, request.y));
            }
        }

        for unit in partition.units_mut() {
            if unit.faction == Faction::Fire {
                unit.reset_attack_power();
            }
        }
        Ok(())
    }

    /// Exchange boundary slices `width` deep and assemble the views.
    fn fetch_halos(
        &self,
        partition: &Partition,
        width: usize,
    ) -> Result<NeighborHalos, SimError> {
        let outgoing = partition.edge_slices(width).map(Payload::Halo);
        let incoming = self.links.exchange(outgoing)?;
        let mut views = std::array::from_fn(|_| None);
        for (index, slot) in incoming.into_iter().enumerate() {
            if let Some(payload) = slot {
                views[index] = Some(payload.into_halo().ok_or(SimError::UnexpectedPayload {
                    rank: self.rank(),
                    phase: "halo fetch",
                })?);
            }
        }
        Ok(NeighborHalos::new(views))
    }

    fn recv_wave_info(&self) -> Result<WaveInfo, SimError> {
        match self.recv_ctrl("wave info")? {
            CoordinatorMsg::Waves(info) => Ok(info),
            CoordinatorMsg::Partition(_) => Err(SimError::UnexpectedPayload {
                rank: self.rank(),
                phase: "wave info",
            }),
        }
    }

    fn recv_partition(&self) -> Result<Partition, SimError> {
        match self.recv_ctrl("partition scatter")? {
            CoordinatorMsg::Partition(partition) => Ok(partition),
            CoordinatorMsg::Waves(_) => Err(SimError::UnexpectedPayload {
                rank: self.rank(),
                phase: "partition scatter",
            }),
        }
    }

    fn recv_ctrl(&self, during: &'static str) -> Result<CoordinatorMsg, SimError> {
        self.ctrl_rx.recv().map_err(|_| SimError::LinkClosed {
            rank: self.rank(),
            during,
        })
    }

    fn report(&self, message: WorkerMsg) -> Result<(), SimError> {
        self.report_tx.send(message).map_err(|_| SimError::LinkClosed {
            rank: self.rank(),
            during: "report to coordinator",
        })
    }

    fn expect_moves(&self, payload: Payload) -> Result<Vec<MoveIntent>, SimError> {
        payload.into_moves().ok_or(SimError::UnexpectedPayload {
            rank: self.rank(),
            phase: "movement-intent exchange",
        })
    }

    fn expect_attacks(&self, payload: Payload) -> Result<Vec<AttackMessage>, SimError> {
        payload.into_attacks().ok_or(SimError::UnexpectedPayload {
            rank: self.rank(),
            phase: "attack-message exchange",
        })
    }

    fn expect_deaths(&self, payload: Payload) -> Result<Vec<DeathRecord>, SimError> {
        payload.into_deaths().ok_or(SimError::UnexpectedPayload {
            rank: self.rank(),
            phase: "death notification",
        })
    }

    fn expect_spawns(&self, payload: Payload) -> Result<Vec<SpawnRequest>, SimError> {
        payload.into_spawns().ok_or(SimError::UnexpectedPayload {
            rank: self.rank(),
            phase: "spawn exchange",
        })
    }
}
