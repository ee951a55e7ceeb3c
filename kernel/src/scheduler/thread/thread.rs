//! Thread scheduling record
//!
//! Per-thread state the donation algorithm works on. The record does not own
//! any queue: `waiting_on` and `held` are handles into the scheduler's queue
//! table.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use super::state::QueueRelation;
use crate::scheduler::priority::Priority;
use crate::scheduler::queue::{QueueId, Waiter};

/// Thread ID type
pub type ThreadId = u64;

/// Scheduling record of one thread
#[derive(Debug, Clone)]
pub struct ThreadRecord {
    /// Thread this record belongs to
    id: ThreadId,

    /// Base priority (or base tickets), set explicitly
    priority: Priority,

    /// Base plus donations, never below `priority`
    pub(crate) effective: Priority,

    /// Queue this thread is enqueued on, if any
    pub(crate) waiting_on: Option<QueueId>,

    /// Logical enqueue time on `waiting_on`
    pub(crate) wait_start: u64,

    /// Queues this thread currently holds
    pub(crate) held: BTreeSet<QueueId>,
}

impl ThreadRecord {
    pub fn new(id: ThreadId, priority: Priority) -> Self {
        Self {
            id,
            priority,
            effective: priority,
            waiting_on: None,
            wait_start: 0,
            held: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub(crate) fn set_base(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn effective_priority(&self) -> Priority {
        self.effective
    }

    pub fn waiting_on(&self) -> Option<QueueId> {
        self.waiting_on
    }

    pub fn wait_start(&self) -> u64 {
        self.wait_start
    }

    pub fn holds(&self, queue: QueueId) -> bool {
        self.held.contains(&queue)
    }

    pub fn held(&self) -> impl Iterator<Item = QueueId> + '_ {
        self.held.iter().copied()
    }

    /// Relation between this thread and `queue`
    pub fn relation(&self, queue: QueueId) -> QueueRelation {
        if self.held.contains(&queue) {
            QueueRelation::Held
        } else if self.waiting_on == Some(queue) {
            QueueRelation::Waiting
        } else {
            QueueRelation::Unrelated
        }
    }

    /// Ranking key under which this thread is (or would be) queued
    pub(crate) fn as_waiter(&self) -> Waiter {
        Waiter {
            thread: self.id,
            priority: self.effective,
            since: self.wait_start,
        }
    }

    pub fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot {
            id: self.id,
            priority: self.priority,
            effective_priority: self.effective,
            waiting_on: self.waiting_on,
            held: self.held.iter().copied().collect(),
        }
    }
}

/// Point-in-time view of a thread record, for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThreadSnapshot {
    pub id: ThreadId,
    pub priority: Priority,
    pub effective_priority: Priority,
    pub waiting_on: Option<QueueId>,
    pub held: Vec<QueueId>,
}

impl core::fmt::Display for ThreadSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{{{} e:{} p:{}", self.id, self.effective_priority, self.priority)?;
        if let Some(queue) = self.waiting_on {
            write!(f, " w:{}", queue)?;
        }
        write!(f, "}}")
    }
}
