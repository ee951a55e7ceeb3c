//! Scheduler configuration

use core::fmt;

use crate::scheduler::priority::PriorityRange;

/// Seed used when the configuration does not name one
pub const DEFAULT_LOTTERY_SEED: u64 = 0x853c_49e6_748f_ea9b;

/// Which discipline the scheduler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchedulerKind {
    /// Strict priority with maximum donation
    #[default]
    Priority,
    /// Weighted lottery with additive ticket donation
    Lottery,
}

impl SchedulerKind {
    pub fn range(self) -> PriorityRange {
        match self {
            Self::Priority => PriorityRange::STRICT,
            Self::Lottery => PriorityRange::LOTTERY,
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Priority => write!(f, "priority"),
            Self::Lottery => write!(f, "lottery"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    pub kind: SchedulerKind,
    /// Seed of the lottery draw generator (ignored by the strict scheduler)
    pub lottery_seed: u64,
}

impl SchedulerConfig {
    pub const fn priority() -> Self {
        Self {
            kind: SchedulerKind::Priority,
            lottery_seed: DEFAULT_LOTTERY_SEED,
        }
    }

    pub const fn lottery(seed: u64) -> Self {
        Self {
            kind: SchedulerKind::Lottery,
            lottery_seed: seed,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::priority()
    }
}
