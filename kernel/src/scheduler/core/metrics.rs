//! Scheduler Metrics - Lock-Free Counters
//!
//! Counters for donation and queue activity. All fields are atomic so a
//! monitor can read them without entering the scheduler's critical section.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Ordering used for relaxed counters (metrics don't need strict ordering)
const RELAXED: Ordering = Ordering::Relaxed;

/// Lock-free scheduler metrics
#[derive(Debug)]
pub struct SchedulerMetrics {
    // ═══════════════════════════════════════════════════════════════
    // Priority Metrics
    // ═══════════════════════════════════════════════════════════════

    /// Accepted base priority changes
    pub priority_changes: AtomicU64,
    /// Recomputations that changed an effective priority
    pub donations: AtomicU64,
    /// Propagation walks stopped on a waits-for cycle
    pub donation_cycles: AtomicU64,

    // ═══════════════════════════════════════════════════════════════
    // Queue Metrics
    // ═══════════════════════════════════════════════════════════════

    /// Threads enqueued through wait_for_access
    pub waits: AtomicU64,
    /// Successful acquisitions (direct or through next_thread)
    pub acquisitions: AtomicU64,
    /// Holders forced out by another acquisition or by exit
    pub evictions: AtomicU64,
    /// Waits abandoned before selection
    pub cancellations: AtomicU64,
    /// Lottery draws performed
    pub lottery_draws: AtomicU64,
}

impl SchedulerMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            priority_changes: AtomicU64::new(0),
            donations: AtomicU64::new(0),
            donation_cycles: AtomicU64::new(0),
            waits: AtomicU64::new(0),
            acquisitions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
            lottery_draws: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, RELAXED);
    }

    /// Get a snapshot of all metrics (for reporting)
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            priority_changes: self.priority_changes.load(RELAXED),
            donations: self.donations.load(RELAXED),
            donation_cycles: self.donation_cycles.load(RELAXED),
            waits: self.waits.load(RELAXED),
            acquisitions: self.acquisitions.load(RELAXED),
            evictions: self.evictions.load(RELAXED),
            cancellations: self.cancellations.load(RELAXED),
            lottery_draws: self.lottery_draws.load(RELAXED),
        }
    }

    /// Reset all metrics to zero (for benchmarking)
    pub fn reset(&self) {
        self.priority_changes.store(0, RELAXED);
        self.donations.store(0, RELAXED);
        self.donation_cycles.store(0, RELAXED);
        self.waits.store(0, RELAXED);
        self.acquisitions.store(0, RELAXED);
        self.evictions.store(0, RELAXED);
        self.cancellations.store(0, RELAXED);
        self.lottery_draws.store(0, RELAXED);
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics snapshot for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub priority_changes: u64,
    pub donations: u64,
    pub donation_cycles: u64,
    pub waits: u64,
    pub acquisitions: u64,
    pub evictions: u64,
    pub cancellations: u64,
    pub lottery_draws: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Priority: {} changes, {} donations, {} cycles\n\
             Queues: {} waits, {} acquisitions, {} evictions, {} cancellations\n\
             Lottery: {} draws",
            self.priority_changes,
            self.donations,
            self.donation_cycles,
            self.waits,
            self.acquisitions,
            self.evictions,
            self.cancellations,
            self.lottery_draws,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_counters() {
        let metrics = SchedulerMetrics::new();
        SchedulerMetrics::bump(&metrics.waits);
        SchedulerMetrics::bump(&metrics.waits);
        SchedulerMetrics::bump(&metrics.lottery_draws);
        assert_eq!(metrics.snapshot().waits, 2);
        assert_eq!(metrics.snapshot().lottery_draws, 1);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
