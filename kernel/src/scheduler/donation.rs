//! Priority donation
//!
//! Recomputation is never incremental: a thread's effective priority is
//! rebuilt from its base priority and every transferring queue it holds.
//! When the value changes the thread is re-ranked in the queue it waits on
//! and the walk moves to that queue's holder. A walk stops at the first
//! thread whose value did not change, so its cost is bounded by the length
//! of the waits-for chain.
//!
//! Each thread waits on at most one queue and each queue has at most one
//! holder, so the walk is a single path. Revisiting a thread therefore means
//! the path closed into a cycle (a deadlock); the walk stops there.

use alloc::vec::Vec;

use crate::sched_assert;
use crate::scheduler::core::metrics::SchedulerMetrics;
use crate::scheduler::core::policy::DonationPolicy;
use crate::scheduler::core::scheduler::Scheduler;
use crate::scheduler::priority::Priority;
use crate::scheduler::queue::{QueueId, WaitQueue};
use crate::scheduler::thread::ThreadId;

impl<P: DonationPolicy> Scheduler<P> {
    /// Donation `thread` currently receives through the queues it holds
    pub(crate) fn donated_to(&self, thread: ThreadId) -> Priority {
        let Some(record) = self.threads.get(&thread) else {
            return 0;
        };
        record
            .held()
            .filter_map(|queue| self.queues.get(queue))
            .filter_map(|queue| queue.donation())
            .fold(0, P::combine)
    }

    /// Recompute `start` and everything downstream of it on the waits-for
    /// chain.
    pub(crate) fn propagate_from(&mut self, start: ThreadId) {
        let mut visited: Vec<ThreadId> = Vec::new();
        let mut next = Some(start);

        while let Some(thread) = next {
            if visited.contains(&thread) {
                SchedulerMetrics::bump(&self.metrics.donation_cycles);
                log::warn!(
                    "donation cycle through thread {} (chain {:?}), stopping propagation",
                    thread,
                    visited
                );
                break;
            }
            visited.push(thread);
            next = self.update_effective_priority(thread);
        }
    }

    /// Recompute one thread. Returns the holder that must be recomputed next,
    /// if the value changed and the thread is waiting behind someone.
    fn update_effective_priority(&mut self, thread: ThreadId) -> Option<ThreadId> {
        let base = match self.threads.get(&thread) {
            Some(record) => record.priority(),
            None => return None,
        };
        let effective = P::effective(base, self.donated_to(thread));
        let previous = self.threads.get(&thread)?.effective_priority();
        if effective == previous {
            return None;
        }

        SchedulerMetrics::bump(&self.metrics.donations);
        log::debug!(
            "thread {} effective priority {} -> {}",
            thread,
            previous,
            effective
        );
        self.rerank(thread, effective)
    }

    /// Store a new effective priority, keeping the thread's position in the
    /// queue it waits on consistent (remove under the old key, reinsert
    /// under the new one). Returns that queue's holder unless it is the
    /// thread itself.
    fn rerank(&mut self, thread: ThreadId, effective: Priority) -> Option<ThreadId> {
        let Self { threads, queues, .. } = self;
        let record = threads.get_mut(&thread)?;
        let old_key = record.as_waiter();
        record.effective = effective;
        let new_key = record.as_waiter();

        let queue_id = record.waiting_on?;
        let queue = queues.get_mut(queue_id);
        sched_assert!(queue.is_some(), "waiting on a destroyed queue");
        let queue = queue?;

        let was_queued = queue.waiters.remove(&old_key);
        sched_assert!(was_queued, "waiter missing from the queue it waits on");
        queue.waiters.insert(new_key);

        log::trace!("re-ranked thread {} on queue {}", thread, queue_id);
        queue.holder.filter(|holder| *holder != thread)
    }

    /// `holder` loses `queue`: the queue becomes free and the holder's
    /// donation through it disappears, both for the holder and for
    /// everything downstream of it.
    pub(crate) fn relinquish(&mut self, holder: ThreadId, queue: QueueId) {
        if let Some(resource) = self.queues.get_mut(queue) {
            if resource.holder == Some(holder) {
                resource.holder = None;
            }
        }
        if let Some(record) = self.threads.get_mut(&holder) {
            record.held.remove(&queue);
        }
        log::debug!("thread {} relinquished queue {}", holder, queue);
        self.propagate_from(holder);
    }
}
