//! Time Budget
//!
//! Each invocation runs under a hard wall-clock limit imposed by the host.
//! The scheduler consults the budget before every action call so that a new
//! call is never started once the remaining time drops below the safety
//! margin.

use std::time::{Duration, Instant};

/// Remaining-time signal for one invocation.
pub trait TimeBudget {
    /// Time left before the host stops the invocation.
    fn remaining(&self) -> Duration;

    /// Returns true when no new action call should be started.
    fn timeout_imminent(&self) -> bool;
}

/// Budget measured from a start instant against a maximum runtime.
#[derive(Debug, Clone)]
pub struct Deadline {
    start: Instant,
    max_runtime: Duration,
    safety_margin: Duration,
}

impl Deadline {
    /// Starts the clock now.
    pub fn start(max_runtime: Duration, safety_margin: Duration) -> Self {
        Self {
            start: Instant::now(),
            max_runtime,
            safety_margin,
        }
    }

    /// Time elapsed since the invocation started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl TimeBudget for Deadline {
    fn remaining(&self) -> Duration {
        self.max_runtime.saturating_sub(self.start.elapsed())
    }

    fn timeout_imminent(&self) -> bool {
        self.remaining() < self.safety_margin
    }
}
