//! Two-phase polling schedule.

use shopview_core::config::ProbeConfig;
use shopview_core::Millis;

/// Bounded polling: a fast phase for the first attempts, then a slower one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    /// Total attempt budget.
    pub max_attempts: u32,
    /// Attempts (1-indexed, inclusive) that use the fast interval.
    pub fast_attempts: u32,
    pub fast_interval: Millis,
    pub slow_interval: Millis,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::from_config(&ProbeConfig::default())
    }
}

impl PollSchedule {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            fast_attempts: config.fast_attempts,
            fast_interval: config.fast_interval_ms,
            slow_interval: config.slow_interval_ms,
        }
    }

    /// Delay preceding `attempt` (1-indexed), or `None` once the budget is spent.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Millis> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        if attempt <= self.fast_attempts {
            Some(self.fast_interval)
        } else {
            Some(self.slow_interval)
        }
    }

    /// Offset from the start of polling at which `attempt` runs.
    pub fn offset_of_attempt(&self, attempt: u32) -> Option<Millis> {
        (1..=attempt)
            .map(|n| self.delay_for_attempt(n))
            .sum::<Option<Millis>>()
    }

    /// Time from start until the last attempt.
    pub fn total_budget(&self) -> Millis {
        self.offset_of_attempt(self.max_attempts).unwrap_or(0)
    }
}
