//! Lottery waiters
//!
//! Every waiter holds as many tickets as its effective priority. Selection
//! draws `r` uniformly in `[1, total]` and walks the waiters subtracting each
//! weight until the remainder is exhausted.
//!
//! Tickets are `u64` per thread; the running total is kept as `u128` so that
//! a queue of heavily donated waiters can never overflow while summing.

use alloc::vec::Vec;

use rand::Rng;

use super::{Pick, WaitQueue, Waiter};
use crate::scheduler::priority::Priority;
use crate::scheduler::thread::ThreadId;

/// Seedable generator used for lottery draws
pub type SchedRng = rand_pcg::Pcg64Mcg;

#[derive(Debug, Default)]
pub struct LotteryWaiters {
    entries: Vec<Waiter>,
    total: u128,
    /// Winner of the last draw, valid until the waiter set changes
    drawn: Option<ThreadId>,
}

impl LotteryWaiters {
    /// Sum of all waiters' tickets
    pub fn total_tickets(&self) -> u128 {
        self.total
    }

    /// Walk the waiters with a winning ticket number in `[1, total]`
    fn winner(&self, mut ticket: u128) -> Option<ThreadId> {
        for entry in &self.entries {
            let weight = entry.priority as u128;
            if ticket <= weight {
                return Some(entry.thread);
            }
            ticket -= weight;
        }
        None
    }
}

impl WaitQueue for LotteryWaiters {
    fn insert(&mut self, waiter: Waiter) {
        self.total += waiter.priority as u128;
        self.entries.push(waiter);
        self.drawn = None;
    }

    fn remove(&mut self, waiter: &Waiter) -> bool {
        let Some(position) = self.entries.iter().position(|e| e.thread == waiter.thread) else {
            return false;
        };
        let removed = self.entries.remove(position);
        self.total -= removed.priority as u128;
        self.drawn = None;
        true
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, thread: ThreadId) -> bool {
        self.entries.iter().any(|e| e.thread == thread)
    }

    fn donation(&self) -> Option<Priority> {
        if self.entries.is_empty() {
            None
        } else {
            // Saturates only past u64::MAX tickets queued on one resource
            Some(Priority::try_from(self.total).unwrap_or(Priority::MAX))
        }
    }

    fn pick(&mut self, rng: &mut SchedRng) -> Option<Pick> {
        if let Some(thread) = self.drawn {
            return Some(Pick { thread, drawn: false });
        }
        let first = self.entries.first()?;
        let thread = if self.total == 0 {
            // Only zero-ticket waiters: no lottery to hold
            first.thread
        } else {
            let ticket = rng.gen_range(1..=self.total);
            self.winner(ticket).unwrap_or(first.thread)
        };
        self.drawn = Some(thread);
        Some(Pick { thread, drawn: true })
    }

    fn threads(&self) -> Vec<ThreadId> {
        self.entries.iter().map(|e| e.thread).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn waiter(thread: ThreadId, priority: Priority) -> Waiter {
        Waiter { thread, priority, since: 0 }
    }

    #[test]
    fn test_winner_walk_boundaries() {
        let mut waiters = LotteryWaiters::default();
        waiters.insert(waiter(1, 1));
        waiters.insert(waiter(2, 1));
        waiters.insert(waiter(3, 8));

        assert_eq!(waiters.winner(1), Some(1));
        assert_eq!(waiters.winner(2), Some(2));
        assert_eq!(waiters.winner(3), Some(3));
        assert_eq!(waiters.winner(10), Some(3));
        assert_eq!(waiters.winner(11), None);
    }

    #[test]
    fn test_draw_is_cached_until_change() {
        let mut rng = SchedRng::seed_from_u64(42);
        let mut waiters = LotteryWaiters::default();
        waiters.insert(waiter(1, 5));
        waiters.insert(waiter(2, 5));

        let first = waiters.pick(&mut rng).unwrap();
        assert!(first.drawn);
        for _ in 0..16 {
            let again = waiters.pick(&mut rng).unwrap();
            assert_eq!(again.thread, first.thread);
            assert!(!again.drawn);
        }

        waiters.insert(waiter(3, 5));
        assert!(waiters.pick(&mut rng).unwrap().drawn);
    }

    #[test]
    fn test_single_ticket_always_wins() {
        let mut rng = SchedRng::seed_from_u64(7);
        for _ in 0..100 {
            let mut waiters = LotteryWaiters::default();
            waiters.insert(waiter(9, 1));
            assert_eq!(waiters.pick(&mut rng).map(|p| p.thread), Some(9));
        }
    }

    #[test]
    fn test_total_does_not_overflow() {
        let mut waiters = LotteryWaiters::default();
        waiters.insert(waiter(1, u64::MAX));
        waiters.insert(waiter(2, u64::MAX));
        assert_eq!(waiters.total_tickets(), 2 * u64::MAX as u128);
        assert_eq!(waiters.donation(), Some(u64::MAX));

        assert!(waiters.remove(&waiter(1, 0)));
        assert_eq!(waiters.total_tickets(), u64::MAX as u128);
    }
}
