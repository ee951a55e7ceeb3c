//! Scheduler subsystem
//!
//! Resource queues with priority donation: a thread waiting for a resource
//! lends its priority (strict scheduler) or its tickets (lottery scheduler)
//! to the thread holding it, transitively along the waits-for chain.

pub mod config;
pub mod core;
mod donation;
pub mod priority;
pub mod queue;
pub mod thread;

// Re-exports
pub use self::config::{SchedulerConfig, SchedulerKind, DEFAULT_LOTTERY_SEED};
pub use self::core::{
    AnyScheduler, DonationPolicy, InterruptControl, InterruptGuard, LotteryPolicy,
    LotteryScheduler, MetricsSnapshot, NoInterrupts, PriorityScheduler, Scheduler,
    SchedulerError, SchedulerLock, SchedulerMetrics, SchedulerResult, StrictPolicy,
};
pub use self::priority::{Priority, PriorityRange};
pub use self::queue::{QueueId, QueueSnapshot, ResourceQueue, WaitQueue};
pub use self::thread::{QueueRelation, ThreadId, ThreadRecord, ThreadSnapshot};
