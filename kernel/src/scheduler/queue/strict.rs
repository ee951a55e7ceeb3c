//! Strict priority waiters
//!
//! Ordered by effective priority (highest first), then by enqueue time
//! (oldest first), which gives round-robin among equals. The best waiter is
//! always the first element, so peek and pop agree by construction.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::cmp::Reverse;

use super::{Pick, SchedRng, WaitQueue, Waiter};
use crate::scheduler::priority::Priority;
use crate::scheduler::thread::ThreadId;

/// (priority desc, since asc, thread); the thread id only makes keys unique
type RankKey = (Reverse<Priority>, u64, ThreadId);

fn rank(waiter: &Waiter) -> RankKey {
    (Reverse(waiter.priority), waiter.since, waiter.thread)
}

#[derive(Debug, Default)]
pub struct StrictWaiters {
    ranked: BTreeSet<RankKey>,
}

impl StrictWaiters {
    fn best(&self) -> Option<&RankKey> {
        self.ranked.iter().next()
    }
}

impl WaitQueue for StrictWaiters {
    fn insert(&mut self, waiter: Waiter) {
        self.ranked.insert(rank(&waiter));
    }

    fn remove(&mut self, waiter: &Waiter) -> bool {
        self.ranked.remove(&rank(waiter))
    }

    fn len(&self) -> usize {
        self.ranked.len()
    }

    fn contains(&self, thread: ThreadId) -> bool {
        self.ranked.iter().any(|(_, _, queued)| *queued == thread)
    }

    fn donation(&self) -> Option<Priority> {
        self.best().map(|(Reverse(priority), _, _)| *priority)
    }

    fn pick(&mut self, _rng: &mut SchedRng) -> Option<Pick> {
        self.best().map(|(_, _, thread)| Pick { thread: *thread, drawn: false })
    }

    fn threads(&self) -> Vec<ThreadId> {
        self.ranked.iter().map(|(_, _, thread)| *thread).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn waiter(thread: ThreadId, priority: Priority, since: u64) -> Waiter {
        Waiter { thread, priority, since }
    }

    #[test]
    fn test_highest_priority_first() {
        let mut rng = SchedRng::seed_from_u64(0);
        let mut waiters = StrictWaiters::default();
        waiters.insert(waiter(1, 2, 1));
        waiters.insert(waiter(2, 3, 2));
        waiters.insert(waiter(3, 2, 3));

        assert_eq!(waiters.pick(&mut rng).map(|p| p.thread), Some(2));
        assert_eq!(waiters.donation(), Some(3));
        assert_eq!(waiters.threads(), alloc::vec![2, 1, 3]);
    }

    #[test]
    fn test_fifo_among_equals() {
        let mut rng = SchedRng::seed_from_u64(0);
        let mut waiters = StrictWaiters::default();
        waiters.insert(waiter(7, 4, 10));
        waiters.insert(waiter(5, 4, 11));
        assert_eq!(waiters.pick(&mut rng).map(|p| p.thread), Some(7));

        assert!(waiters.remove(&waiter(7, 4, 10)));
        assert_eq!(waiters.pick(&mut rng).map(|p| p.thread), Some(5));
    }

    #[test]
    fn test_rerank_requires_old_key() {
        let mut waiters = StrictWaiters::default();
        waiters.insert(waiter(1, 1, 1));
        assert!(!waiters.remove(&waiter(1, 5, 1)));
        assert!(waiters.remove(&waiter(1, 1, 1)));
        assert!(waiters.is_empty());
        assert_eq!(waiters.donation(), None);
    }
}
