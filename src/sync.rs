//! Phase synchronization.
//!
//! The round state machine's barrier sequence is a first-class object:
//! every participant holds a [`PhaseClock`] over one shared barrier, and
//! each `advance` is one epoch boundary. No participant enters epoch
//! `N + 1` before every participant has finished epoch `N`.

use std::sync::{Arc, Barrier};

/// One participant's handle on the shared phase barrier.
#[derive(Debug)]
pub struct PhaseClock {
    barrier: Arc<Barrier>,
    epoch: u64,
}

impl PhaseClock {
    /// Create one clock per participant over a single shared barrier.
    #[must_use]
    pub fn group(parties: usize) -> Vec<PhaseClock> {
        let barrier = Arc::new(Barrier::new(parties));
        (0..parties)
            .map(|_| PhaseClock {
                barrier: Arc::clone(&barrier),
                epoch: 0,
            })
            .collect()
    }

    /// Block until every participant reaches this point, then enter the
    /// next epoch. Returns the new epoch number.
    pub fn advance(&mut self) -> u64 {
        self.barrier.wait();
        self.epoch += 1;
        self.epoch
    }

    /// Number of epochs this participant has completed.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }
}
