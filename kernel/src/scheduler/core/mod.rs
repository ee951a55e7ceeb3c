//! Scheduler core module
//!
//! - `scheduler`: the scheduler context and its queue/priority operations
//! - `policy`: strict (maximum) and lottery (additive) donation
//! - `interrupt`: critical sections around scheduler mutations

pub mod error;
pub mod interrupt;
pub mod metrics;
pub mod policy;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use interrupt::{InterruptControl, InterruptGuard, NoInterrupts, SchedulerLock};
pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use policy::{DonationPolicy, LotteryPolicy, StrictPolicy};
pub use scheduler::{AnyScheduler, LotteryScheduler, PriorityScheduler, Scheduler};
