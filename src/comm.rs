//! Mesh transport and the deadlock-safe halo exchange.
//!
//! Every adjacent worker pair is wired with a pair of rendezvous
//! (zero-capacity) channels, one per direction, so a send completes only
//! once the peer posts the matching receive — the exact blocking
//! semantics the exchange ordering is designed for.
//!
//! The exchange runs in four groups, each over a disjoint edge set:
//! rows (below/above), columns (right/left), and the two diagonal axes.
//! Within a group one side of every adjacent pair is the first mover: it
//! sends all its legs before receiving, while the complement receives
//! first. Row and diagonal groups pick first movers by row parity,
//! the column group by rank parity; adjacent workers therefore always
//! disagree, and no two peers ever block sending to each other.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::error::SimError;
use crate::protocol::Payload;
use crate::topology::{ALL_DIRECTIONS, Direction, NeighborTable, Rank, Topology};

/// Row group legs, in exchange order.
const ROW_DIRS: [Direction; 2] = [Direction::Below, Direction::Above];
/// Column group legs, in exchange order.
const COL_DIRS: [Direction; 2] = [Direction::Right, Direction::Left];
/// First diagonal axis (skipped entirely by the global top-left and
/// bottom-right corners, which have neither leg).
const DIAG_A_DIRS: [Direction; 2] = [Direction::BelowLeft, Direction::AboveRight];
/// Second diagonal axis (skipped by the other two corners).
const DIAG_B_DIRS: [Direction; 2] = [Direction::BelowRight, Direction::AboveLeft];

/// One worker's channels to and from its existing neighbors, plus the
/// precomputed adjacency table that drives the exchange ordering.
#[derive(Debug)]
pub struct Links {
    rank: Rank,
    table: NeighborTable,
    tx: [Option<Sender<Payload>>; 8],
    rx: [Option<Receiver<Payload>>; 8],
}

impl Links {
    /// Wire the full mesh: one `Links` per worker, rank order.
    #[must_use]
    pub fn mesh(topology: &Topology) -> Vec<Links> {
        let mut senders: HashMap<(Rank, Rank), Sender<Payload>> = HashMap::new();
        let mut receivers: HashMap<(Rank, Rank), Receiver<Payload>> = HashMap::new();
        for rank in 1..=topology.worker_count() {
            for direction in ALL_DIRECTIONS {
                if let Some(peer) = topology.neighbor_in(rank, direction) {
                    let (tx, rx) = bounded(0);
                    senders.insert((rank, peer), tx);
                    receivers.insert((rank, peer), rx);
                }
            }
        }

        (1..=topology.worker_count())
            .map(|rank| {
                let table = NeighborTable::new(topology, rank);
                let tx = std::array::from_fn(|i| {
                    table
                        .neighbor(ALL_DIRECTIONS[i])
                        .and_then(|peer| senders.remove(&(rank, peer)))
                });
                let rx = std::array::from_fn(|i| {
                    table
                        .neighbor(ALL_DIRECTIONS[i])
                        .and_then(|peer| receivers.remove(&(peer, rank)))
                });
                Links {
                    rank,
                    table,
                    tx,
                    rx,
                }
            })
            .collect()
    }

    /// This worker's rank.
    #[must_use]
    pub const fn rank(&self) -> Rank {
        self.rank
    }

    /// The precomputed adjacency table.
    #[must_use]
    pub const fn table(&self) -> &NeighborTable {
        &self.table
    }

    /// Exchange one payload with every existing neighbor.
    ///
    /// On success, `incoming[d]` holds exactly what the neighbor in
    /// direction `d` placed in its own `outgoing[d.opposite()]`; slots
    /// for absent neighbors stay `None`. A worker with no more than one
    /// neighbor (the degenerate single-worker mesh) performs no
    /// communication at all.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::LinkClosed`] if a peer hung up mid-exchange.
    pub fn exchange(&self, outgoing: [Payload; 8]) -> Result<[Option<Payload>; 8], SimError> {
        let mut incoming: [Option<Payload>; 8] = std::array::from_fn(|_| None);
        if self.table.neighbor_count() <= 1 {
            return Ok(incoming);
        }

        let mut outgoing = outgoing.map(Some);
        self.exchange_group(
            ROW_DIRS,
            self.table.row_first_mover(),
            &mut outgoing,
            &mut incoming,
        )?;
        self.exchange_group(
            COL_DIRS,
            self.table.col_first_mover(),
            &mut outgoing,
            &mut incoming,
        )?;
        self.exchange_group(
            DIAG_A_DIRS,
            self.table.diag_first_mover(),
            &mut outgoing,
            &mut incoming,
        )?;
        self.exchange_group(
            DIAG_B_DIRS,
            self.table.diag_first_mover(),
            &mut outgoing,
            &mut incoming,
        )?;
        Ok(incoming)
    }

    /// Run one group: both legs in index order, send-first for the
    /// group's first mover and receive-first for its complement. Legs
    /// without a neighbor are skipped; the adjacency table, not runtime
    /// arithmetic, decides participation.
    fn exchange_group(
        &self,
        dirs: [Direction; 2],
        first_mover: bool,
        outgoing: &mut [Option<Payload>; 8],
        incoming: &mut [Option<Payload>; 8],
    ) -> Result<(), SimError> {
        if first_mover {
            for direction in dirs {
                self.send_leg(direction, outgoing)?;
            }
            for direction in dirs {
                self.recv_leg(direction, incoming)?;
            }
        } else {
            for direction in dirs {
                self.recv_leg(direction, incoming)?;
            }
            for direction in dirs {
                self.send_leg(direction, outgoing)?;
            }
        }
        Ok(())
    }

    fn send_leg(
        &self,
        direction: Direction,
        outgoing: &mut [Option<Payload>; 8],
    ) -> Result<(), SimError> {
        let Some(tx) = &self.tx[direction.index()] else {
            return Ok(());
        };
        let payload = outgoing[direction.index()]
            .take()
            .expect("each outgoing slot is sent at most once per exchange");
        tx.send(payload).map_err(|_| SimError::LinkClosed {
            rank: self.rank,
            during: "exchange send",
        })
    }

    fn recv_leg(
        &self,
        direction: Direction,
        incoming: &mut [Option<Payload>; 8],
    ) -> Result<(), SimError> {
        let Some(rx) = &self.rx[direction.index()] else {
            return Ok(());
        };
        let payload = rx.recv().map_err(|_| SimError::LinkClosed {
            rank: self.rank,
            during: "exchange receive",
        })?;
        incoming[direction.index()] = Some(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DeathRecord;
    use std::thread;

    /// Tag a payload with (sender rank, direction index it was sent to).
    #[allow(clippy::cast_possible_wrap)]
    fn tagged(rank: Rank, direction: Direction) -> Payload {
        Payload::Deaths(vec![DeathRecord {
            x: rank as i64,
            y: direction.index() as i64,
        }])
    }

    #[test]
    fn test_single_worker_exchange_is_noop() {
        let topology = Topology::new(4, 2).expect("valid");
        let links = Links::mesh(&topology);
        let outgoing = std::array::from_fn(|_| Payload::Deaths(Vec::new()));
        let incoming = links[0].exchange(outgoing).expect("no-op");
        assert!(incoming.iter().all(Option::is_none));
    }

    #[test]
    fn test_mesh_exchange_symmetry_2x2() {
        let topology = Topology::new(4, 5).expect("valid");
        let links = Links::mesh(&topology);

        let results: Vec<(Rank, [Option<Payload>; 8])> = thread::scope(|s| {
            let handles: Vec<_> = links
                .into_iter()
                .map(|link| {
                    s.spawn(move || {
                        let rank = link.rank();
                        let outgoing = std::array::from_fn(|i| tagged(rank, ALL_DIRECTIONS[i]));
                        (rank, link.exchange(outgoing).expect("exchange"))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("join")).collect()
        });

        let topology = Topology::new(4, 5).expect("valid");
        for (rank, incoming) in results {
            for direction in ALL_DIRECTIONS {
                let slot = &incoming[direction.index()];
                match topology.neighbor_in(rank, direction) {
                    Some(peer) => {
                        let deaths = slot
                            .clone()
                            .and_then(Payload::into_deaths)
                            .expect("payload from existing neighbor");
                        // What we received is what the peer sent toward
                        // the opposite direction.
                        #[allow(clippy::cast_possible_wrap)]
                        let expected = DeathRecord {
                            x: peer as i64,
                            y: direction.opposite().index() as i64,
                        };
                        assert_eq!(deaths, vec![expected], "rank {rank} dir {direction:?}");
                    }
                    None => assert!(slot.is_none(), "rank {rank} dir {direction:?}"),
                }
            }
        }
    }

    #[test]
    fn test_closed_link_is_an_error() {
        let topology = Topology::new(4, 5).expect("valid");
        let mut links = Links::mesh(&topology);
        // Drop ranks 2-4; rank 1's first row-group leg hits a dead peer.
        let link = links.remove(0);
        drop(links);
        let outgoing = std::array::from_fn(|_| Payload::Deaths(Vec::new()));
        let result = link.exchange(outgoing);
        assert!(matches!(result, Err(SimError::LinkClosed { rank: 1, .. })));
    }
}
