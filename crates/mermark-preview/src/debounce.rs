//! Settle timer for diagram renders.
//!
//! Edits arrive faster than diagrams render. The timer holds a single
//! deadline that every edit pushes back, so sessions only start once the
//! document has been quiet for the settle delay.

use std::time::Duration;

use tokio::time::Instant;

/// Deadline-based debouncer for starting render batches.
#[derive(Debug, Clone)]
pub(crate) struct SettleTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl SettleTimer {
    /// Create a timer with the given settle delay.
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub(crate) fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm (or push back) the deadline to `now + delay`.
    pub(crate) fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    /// Arm the deadline to fire on the next check.
    pub(crate) fn arm_now(&mut self) {
        self.deadline = Some(Instant::now());
    }

    /// Current deadline, if armed.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm the timer, returning whether it was armed.
    pub(crate) fn clear(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Disarm and return `true` if the deadline has passed.
    pub(crate) fn take_due(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
