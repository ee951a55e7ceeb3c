//! State - thread/queue relation
//!
//! A thread is, with respect to one queue, unrelated to it, waiting on it,
//! or holding it.

use core::fmt;

/// Relation between a thread and one queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRelation {
    /// Neither waiting on nor holding the queue
    Unrelated,

    /// Enqueued on the queue's waiters
    Waiting,

    /// Current holder of the queue
    Held,
}

impl fmt::Display for QueueRelation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unrelated => write!(f, "Unrelated"),
            Self::Waiting => write!(f, "Waiting"),
            Self::Held => write!(f, "Held"),
        }
    }
}

/// Validate a relation transition
pub fn validate_transition(from: QueueRelation, to: QueueRelation) -> bool {
    use QueueRelation::*;

    match (from, to) {
        // wait_for_access
        (Unrelated, Waiting) => true,

        // next_thread, or acquire of a queued thread
        (Waiting, Held) => true,

        // acquire of a free resource
        (Unrelated, Held) => true,

        // Release or eviction
        (Held, Unrelated) => true,

        // Cancellation
        (Waiting, Unrelated) => true,

        // Re-acquiring a held queue is a no-op
        (Held, Held) => true,

        // All other transitions invalid
        _ => false,
    }
}
