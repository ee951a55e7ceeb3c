//! Scheduler Error Handling
//!
//! Typed errors for queue and priority operations, with recovery hints.

use core::fmt;

use crate::scheduler::priority::Priority;
use crate::scheduler::queue::QueueId;
use crate::scheduler::thread::ThreadId;

/// Scheduler error types with detailed context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    // ═══════════════════════════════════════════════════════════════
    // Priority Errors
    // ═══════════════════════════════════════════════════════════════

    /// Requested base priority outside the scheduler's range
    OutOfRange { value: Priority, min: Priority, max: Priority },

    // ═══════════════════════════════════════════════════════════════
    // Queue Errors
    // ═══════════════════════════════════════════════════════════════

    /// Handle does not name a live queue (destroyed or never created)
    QueueNotFound { queue: QueueId },

    /// Queue still has a holder or waiters
    QueueBusy { queue: QueueId, holder: Option<ThreadId>, waiters: usize },

    // ═══════════════════════════════════════════════════════════════
    // Thread State Errors
    // ═══════════════════════════════════════════════════════════════

    /// The holder of a queue tried to wait on it
    HolderCannotWait { thread_id: ThreadId, queue: QueueId },

    /// Thread is already waiting on a queue
    AlreadyWaiting { thread_id: ThreadId, queue: QueueId },

    // ═══════════════════════════════════════════════════════════════
    // Internal Errors (should never happen)
    // ═══════════════════════════════════════════════════════════════

    /// Internal scheduler invariant violated
    InvariantViolated { thread_id: ThreadId, reason: &'static str },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { value, min, max } => {
                write!(f, "Priority {} out of range [{}, {}]", value, min, max)
            }
            Self::QueueNotFound { queue } => write!(f, "Queue {} not found", queue),
            Self::QueueBusy { queue, holder, waiters } => match holder {
                Some(holder) => write!(
                    f,
                    "Queue {} busy: held by thread {}, {} waiters",
                    queue, holder, waiters
                ),
                None => write!(f, "Queue {} busy: {} waiters", queue, waiters),
            },
            Self::HolderCannotWait { thread_id, queue } => {
                write!(f, "Thread {} holds queue {} and cannot wait on it", thread_id, queue)
            }
            Self::AlreadyWaiting { thread_id, queue } => {
                write!(f, "Thread {} already waiting on queue {}", thread_id, queue)
            }
            Self::InvariantViolated { thread_id, reason } => {
                write!(f, "Invariant violated at thread {}: {}", thread_id, reason)
            }
        }
    }
}

impl SchedulerError {
    /// Get recovery hint for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } => "Clamp the request to the scheduler's priority range",
            Self::QueueNotFound { .. } => "Queue may have already been destroyed",
            Self::QueueBusy { .. } => "Drain waiters and release the holder before destroying",
            Self::HolderCannotWait { .. } => "Release the queue before waiting on it again",
            Self::AlreadyWaiting { .. } => "Cancel the pending wait first",
            Self::InvariantViolated { .. } => "Scheduler state is corrupted",
        }
    }

    /// Is this a recoverable error?
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvariantViolated { .. })
    }

    /// Should this error be logged?
    pub fn should_log(&self) -> bool {
        match self {
            Self::QueueNotFound { .. } => false, // Common during teardown
            Self::OutOfRange { .. } => false,    // Caller's request, not ours
            _ => true,
        }
    }
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Log a scheduler error with its hint and hand it back
#[macro_export]
macro_rules! sched_error {
    ($err:expr) => {{
        let err = $err;
        if err.should_log() {
            $crate::__log::error!("[SCHED] Error: {} (hint: {})", err, err.recovery_hint());
        }
        err
    }};
}

/// Critical scheduler assertion: corruption is never recovered
#[macro_export]
macro_rules! sched_assert {
    ($cond:expr, $reason:expr) => {
        if !$cond {
            panic!("[SCHED CRITICAL] Invariant violated: {}", $reason);
        }
    };
}
