//! Donation Policies
//!
//! The two disciplines differ only in how donations combine and how waiters
//! are ranked:
//! - `StrictPolicy`: effective = max(base, best waiter of each held queue)
//! - `LotteryPolicy`: effective = base + every waiter of each held queue
//!
//! Both combine rules are associative with identity 0, so recomputation can
//! fold held queues in any order.

use crate::scheduler::config::SchedulerKind;
use crate::scheduler::priority::{Priority, PriorityRange};
use crate::scheduler::queue::{LotteryWaiters, StrictWaiters, WaitQueue};

/// Scheduling discipline plugged into `Scheduler`
pub trait DonationPolicy: 'static {
    /// Waiter container used by every queue of this scheduler
    type Waiters: WaitQueue;

    const KIND: SchedulerKind;

    /// Valid base priorities
    const RANGE: PriorityRange;

    /// Fold one queue's donation into the running donation
    fn combine(acc: Priority, donation: Priority) -> Priority;

    /// Effective priority from base priority and combined donations
    fn effective(base: Priority, donated: Priority) -> Priority;
}

/// Strict priority: the maximum wins
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictPolicy;

impl DonationPolicy for StrictPolicy {
    type Waiters = StrictWaiters;

    const KIND: SchedulerKind = SchedulerKind::Priority;
    const RANGE: PriorityRange = PriorityRange::STRICT;

    #[inline]
    fn combine(acc: Priority, donation: Priority) -> Priority {
        acc.max(donation)
    }

    #[inline]
    fn effective(base: Priority, donated: Priority) -> Priority {
        base.max(donated)
    }
}

/// Lottery: tickets add up
#[derive(Debug, Clone, Copy, Default)]
pub struct LotteryPolicy;

impl DonationPolicy for LotteryPolicy {
    type Waiters = LotteryWaiters;

    const KIND: SchedulerKind = SchedulerKind::Lottery;
    const RANGE: PriorityRange = PriorityRange::LOTTERY;

    #[inline]
    fn combine(acc: Priority, donation: Priority) -> Priority {
        acc.saturating_add(donation)
    }

    #[inline]
    fn effective(base: Priority, donated: Priority) -> Priority {
        base.saturating_add(donated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_takes_maximum() {
        let donated = [2, 6, 3].into_iter().fold(0, StrictPolicy::combine);
        assert_eq!(donated, 6);
        assert_eq!(StrictPolicy::effective(1, donated), 6);
        assert_eq!(StrictPolicy::effective(7, donated), 7);
        assert_eq!(StrictPolicy::effective(4, 0), 4);
    }

    #[test]
    fn test_lottery_sums_and_saturates() {
        let donated = [2, 6, 3].into_iter().fold(0, LotteryPolicy::combine);
        assert_eq!(donated, 11);
        assert_eq!(LotteryPolicy::effective(1, donated), 12);
        assert_eq!(LotteryPolicy::effective(Priority::MAX, 5), Priority::MAX);
    }
}
