//! Priority and ticket ranges
//!
//! Both disciplines use a plain unsigned value: a priority level for the
//! strict scheduler, a ticket count for the lottery scheduler.

/// Base or effective priority (strict) / ticket count (lottery)
pub type Priority = u64;

/// Lowest strict priority
pub const PRIORITY_MIN: Priority = 0;

/// Highest strict priority
pub const PRIORITY_MAX: Priority = 7;

/// Strict priority given to a thread on first contact
pub const PRIORITY_DEFAULT: Priority = 1;

/// Fewest tickets a lottery thread may own
pub const TICKETS_MIN: Priority = 1;

/// Most tickets a lottery thread may own as its base count.
///
/// Donated tickets are added on top of this and may exceed it.
pub const TICKETS_MAX: Priority = i32::MAX as Priority;

/// Tickets given to a thread on first contact
pub const TICKETS_DEFAULT: Priority = 1;

/// Closed range of valid base priorities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriorityRange {
    pub min: Priority,
    pub max: Priority,
    pub default: Priority,
}

impl PriorityRange {
    /// Range of the strict priority scheduler
    pub const STRICT: Self = Self {
        min: PRIORITY_MIN,
        max: PRIORITY_MAX,
        default: PRIORITY_DEFAULT,
    };

    /// Range of the lottery scheduler
    pub const LOTTERY: Self = Self {
        min: TICKETS_MIN,
        max: TICKETS_MAX,
        default: TICKETS_DEFAULT,
    };

    pub const fn contains(&self, value: Priority) -> bool {
        value >= self.min && value <= self.max
    }

    /// One step up, or `None` at the top of the range
    pub fn raised(&self, value: Priority) -> Option<Priority> {
        if value >= self.max {
            None
        } else {
            Some(value + 1)
        }
    }

    /// One step down, or `None` at the bottom of the range
    pub fn lowered(&self, value: Priority) -> Option<Priority> {
        if value <= self.min {
            None
        } else {
            Some(value - 1)
        }
    }
}

impl Default for PriorityRange {
    fn default() -> Self {
        Self::STRICT
    }
}
