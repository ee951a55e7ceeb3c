// src/lib.rs
// Cœur d'ordonnancement: files de ressources avec donation de priorité
#![cfg_attr(not(test), no_std)]

// Import de alloc pour les allocations dynamiques
extern crate alloc;

// Utilisé par les macros exportées (sched_error!)
#[doc(hidden)]
pub use log as __log;

pub mod scheduler;

pub use scheduler::{
    AnyScheduler, LotteryScheduler, Priority, PriorityScheduler, QueueId, SchedulerConfig,
    SchedulerError, SchedulerKind, SchedulerResult, ThreadId,
};
