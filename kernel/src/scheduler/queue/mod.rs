//! Resource queues
//!
//! A resource queue guards one logical resource: it has at most one holder
//! and an ordered set of waiters. How waiters are ranked and what the queue
//! donates to its holder depends on the waiter container:
//! - `strict`: (effective priority desc, wait start asc), donates the maximum
//! - `lottery`: weighted random draw, donates the sum of all waiters
//!
//! Queues live in a generational table owned by the scheduler and are named
//! by `QueueId` handles, so a thread's back-reference to the queue it waits
//! on never owns the queue.

pub mod lottery;
pub mod strict;

pub use lottery::{LotteryWaiters, SchedRng};
pub use strict::StrictWaiters;

use alloc::vec::Vec;
use core::fmt;

use crate::scheduler::priority::Priority;
use crate::scheduler::thread::ThreadId;

/// Handle to a queue in the scheduler's queue table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueId {
    index: u32,
    generation: u32,
}

impl QueueId {
    pub const fn index(&self) -> u32 {
        self.index
    }

    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.generation)
    }
}

/// Ranking key of one waiter.
///
/// The key is captured when the waiter is inserted; re-ranking a waiter is
/// always remove(old key) then insert(new key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    pub thread: ThreadId,
    /// Effective priority (strict) or effective tickets (lottery)
    pub priority: Priority,
    /// Logical enqueue time
    pub since: u64,
}

/// Outcome of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub thread: ThreadId,
    /// A fresh random draw was spent to make this pick
    pub drawn: bool,
}

/// Waiter container of one resource queue
pub trait WaitQueue: Default + fmt::Debug {
    /// Insert a waiter ranked by its key
    fn insert(&mut self, waiter: Waiter);

    /// Remove a waiter; returns false if the thread was not queued
    fn remove(&mut self, waiter: &Waiter) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, thread: ThreadId) -> bool;

    /// Priority this queue hands to its holder, `None` when empty
    fn donation(&self) -> Option<Priority>;

    /// Choose the waiter `next_thread` would remove, without removing it.
    ///
    /// Repeated picks without an intervening insert/remove return the same
    /// thread.
    fn pick(&mut self, rng: &mut SchedRng) -> Option<Pick>;

    /// Waiting threads in container order
    fn threads(&self) -> Vec<ThreadId>;
}

/// A queue guarding one resource
#[derive(Debug)]
pub struct ResourceQueue<W> {
    id: QueueId,
    transfers_priority: bool,
    pub(crate) holder: Option<ThreadId>,
    pub(crate) waiters: W,
}

impl<W: WaitQueue> ResourceQueue<W> {
    fn new(id: QueueId, transfers_priority: bool) -> Self {
        Self {
            id,
            transfers_priority,
            holder: None,
            waiters: W::default(),
        }
    }

    pub fn id(&self) -> QueueId {
        self.id
    }

    /// Does this queue donate its waiters' priority to the holder?
    pub fn transfers_priority(&self) -> bool {
        self.transfers_priority
    }

    pub fn holder(&self) -> Option<ThreadId> {
        self.holder
    }

    pub fn waiters(&self) -> &W {
        &self.waiters
    }

    /// Donation reaching the holder through this queue
    pub fn donation(&self) -> Option<Priority> {
        if self.transfers_priority {
            self.waiters.donation()
        } else {
            None
        }
    }

    pub fn is_idle(&self) -> bool {
        self.holder.is_none() && self.waiters.is_empty()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            id: self.id,
            transfers_priority: self.transfers_priority,
            holder: self.holder,
            waiters: self.waiters.threads(),
        }
    }
}

/// Point-in-time view of a queue, for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueSnapshot {
    pub id: QueueId,
    pub transfers_priority: bool,
    pub holder: Option<ThreadId>,
    pub waiters: Vec<ThreadId>,
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue {}", self.id)?;
        if self.transfers_priority {
            write!(f, " (transfer)")?;
        }
        match self.holder {
            Some(holder) => write!(f, " held by {}", holder)?,
            None => write!(f, " free")?,
        }
        write!(f, ", waiting {:?}", self.waiters)
    }
}

struct Slot<W> {
    generation: u32,
    queue: Option<ResourceQueue<W>>,
}

/// Generational table of queues; destroyed slots are reused with a new
/// generation so stale handles never alias a newer queue.
pub(crate) struct QueueTable<W> {
    slots: Vec<Slot<W>>,
    free: Vec<u32>,
}

impl<W: WaitQueue> QueueTable<W> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, transfers_priority: bool) -> QueueId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                let id = QueueId { index, generation: slot.generation };
                slot.queue = Some(ResourceQueue::new(id, transfers_priority));
                id
            }
            None => {
                let index = self.slots.len() as u32;
                let id = QueueId { index, generation: 0 };
                self.slots.push(Slot {
                    generation: 0,
                    queue: Some(ResourceQueue::new(id, transfers_priority)),
                });
                id
            }
        }
    }

    pub(crate) fn get(&self, id: QueueId) -> Option<&ResourceQueue<W>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.queue.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: QueueId) -> Option<&mut ResourceQueue<W>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.queue.as_mut())
    }

    pub(crate) fn remove(&mut self, id: QueueId) -> Option<ResourceQueue<W>> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let queue = slot.queue.take()?;
        self.free.push(id.index);
        Some(queue)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ResourceQueue<W>> {
        self.slots.iter().filter_map(|slot| slot.queue.as_ref())
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut table: QueueTable<StrictWaiters> = QueueTable::new();
        let first = table.insert(true);
        assert!(table.remove(first).is_some());

        let second = table.insert(false);
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(table.get(first).is_none());
        assert!(!table.get(second).unwrap().transfers_priority());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_non_transferring_queue_donates_nothing() {
        let mut table: QueueTable<StrictWaiters> = QueueTable::new();
        let id = table.insert(false);
        let queue = table.get_mut(id).unwrap();
        queue.waiters.insert(Waiter { thread: 1, priority: 6, since: 1 });
        assert_eq!(queue.waiters.donation(), Some(6));
        assert_eq!(queue.donation(), None);
    }

    #[test]
    fn test_snapshot_display() {
        let mut table: QueueTable<StrictWaiters> = QueueTable::new();
        let id = table.insert(true);
        let queue = table.get_mut(id).unwrap();
        queue.holder = Some(4);
        queue.waiters.insert(Waiter { thread: 9, priority: 2, since: 1 });
        let text = alloc::format!("{}", queue.snapshot());
        assert_eq!(text, "queue 0.0 (transfer) held by 4, waiting [9]");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_snapshot_serde_roundtrip() {
        let mut table: QueueTable<StrictWaiters> = QueueTable::new();
        let id = table.insert(true);
        let queue = table.get_mut(id).unwrap();
        queue.holder = Some(4);
        queue.waiters.insert(Waiter { thread: 9, priority: 2, since: 1 });
        queue.waiters.insert(Waiter { thread: 3, priority: 5, since: 2 });

        let snapshot = queue.snapshot();
        let bytes = postcard::to_allocvec(&snapshot).unwrap();
        let decoded: QueueSnapshot = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.waiters, alloc::vec![3, 9]);
    }
}
