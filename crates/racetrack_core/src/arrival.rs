//! # Arrival Register
//!
//! One per race. Hands out finishing ranks and remembers the winner.
//!
//! ## Ranking
//!
//! ```text
//!   Runner 3 ──┐
//!   Runner 0 ──┼──> fetch_add(1) ──> 1, 2, 3 ... (pre-increment value)
//!   Runner 7 ──┘
//! ```
//!
//! The rank counter is a single atomic. Concurrent callers always receive
//! disjoint ranks with no gaps, in the order their `fetch_add` lands.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

use crate::{LaneId, Rank};

/// First rank handed out in every race.
pub const FIRST_RANK: Rank = 1;

/// A runner's entry in the arrival log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arrival {
    /// Lane that finished.
    pub lane: LaneId,
    /// Rank it was given.
    pub rank: Rank,
}

/// Shared rank allocator plus winner record.
#[derive(Debug)]
pub struct ArrivalRegister {
    /// Next rank to hand out.
    next_rank: AtomicU32,
    /// Set once, by the holder of rank 1.
    winner: Mutex<Option<LaneId>>,
    /// Every recorded arrival, in the order it was recorded.
    arrivals: Mutex<Vec<Arrival>>,
}

impl ArrivalRegister {
    /// Creates a register whose first rank is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a register with room for `lanes` arrivals.
    #[must_use]
    pub fn with_capacity(lanes: usize) -> Self {
        Self {
            next_rank: AtomicU32::new(FIRST_RANK),
            winner: Mutex::new(None),
            arrivals: Mutex::new(Vec::with_capacity(lanes)),
        }
    }

    /// Atomically takes the current rank and advances the counter.
    ///
    /// Returns the pre-increment value. N concurrent callers receive exactly
    /// `1..=N`.
    #[inline]
    #[must_use]
    pub fn take_next_rank(&self) -> Rank {
        self.next_rank.fetch_add(1, Ordering::AcqRel)
    }

    /// Records `lane` as the winner if it holds rank 1.
    ///
    /// Only one caller can ever hold rank 1, so the winner is set at most
    /// once per register.
    pub fn record_if_winner(&self, lane: LaneId, rank: Rank) {
        if rank != FIRST_RANK {
            return;
        }
        let mut winner = self.winner.lock();
        debug_assert!(winner.is_none(), "rank 1 handed out twice");
        if winner.is_none() {
            *winner = Some(lane);
            info!(lane, "winner recorded");
        }
    }

    /// Logs an arrival and records the winner if `rank` is 1.
    pub fn record_arrival(&self, lane: LaneId, rank: Rank) {
        self.arrivals.lock().push(Arrival { lane, rank });
        self.record_if_winner(lane, rank);
    }

    /// Returns the winning lane, or `None` if nobody has finished yet.
    #[must_use]
    pub fn winner(&self) -> Option<LaneId> {
        *self.winner.lock()
    }

    /// Returns how many ranks have been handed out.
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.next_rank.load(Ordering::Acquire) - FIRST_RANK
    }

    /// Returns a copy of the arrival log, sorted by rank.
    #[must_use]
    pub fn arrivals(&self) -> Vec<Arrival> {
        let mut arrivals = self.arrivals.lock().clone();
        arrivals.sort_unstable_by_key(|a| a.rank);
        arrivals
    }
}

impl Default for ArrivalRegister {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_sequential_ranks() {
        let register = ArrivalRegister::new();
        assert_eq!(register.issued(), 0);

        assert_eq!(register.take_next_rank(), 1);
        assert_eq!(register.take_next_rank(), 2);
        assert_eq!(register.take_next_rank(), 3);
        assert_eq!(register.issued(), 3);
    }

    #[test]
    fn test_winner_unset_until_first_arrival() {
        let register = ArrivalRegister::new();
        assert_eq!(register.winner(), None);

        register.record_if_winner(4, 2);
        assert_eq!(register.winner(), None);

        register.record_if_winner(7, 1);
        assert_eq!(register.winner(), Some(7));
    }

    #[test]
    fn test_concurrent_ranks_are_gap_free() {
        let threads = 64;
        let register = Arc::new(ArrivalRegister::with_capacity(threads));
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|lane| {
                let register = Arc::clone(&register);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let rank = register.take_next_rank();
                    register.record_arrival(lane, rank);
                    rank
                })
            })
            .collect();

        let ranks: HashSet<Rank> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let expected: HashSet<Rank> = (1..=64).collect();

        assert_eq!(ranks, expected);
        assert_eq!(register.issued(), 64);

        let arrivals = register.arrivals();
        assert_eq!(arrivals.len(), 64);
        assert_eq!(arrivals[0].rank, 1);
        assert_eq!(register.winner(), Some(arrivals[0].lane));
    }

    #[test]
    fn test_arrivals_sorted_by_rank() {
        let register = ArrivalRegister::new();
        register.record_arrival(2, 3);
        register.record_arrival(0, 1);
        register.record_arrival(1, 2);

        let lanes: Vec<LaneId> = register.arrivals().iter().map(|a| a.lane).collect();
        assert_eq!(lanes, vec![0, 1, 2]);
        assert_eq!(register.winner(), Some(0));
    }
}
