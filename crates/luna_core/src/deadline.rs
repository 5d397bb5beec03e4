//! Request-level time budget.
//!
//! One `Deadline` is created per dispatch and handed to every collaborator
//! call; HTTP adapters use `remaining()` as their per-call timeout.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started_at: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// Deadline that expires `budget` after now.
    pub fn after(budget: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            budget: Some(budget),
        }
    }

    /// Deadline that never expires.
    pub fn unbounded() -> Self {
        Self {
            started_at: Instant::now(),
            budget: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time left, `None` when unbounded. Saturates at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|budget| budget.saturating_sub(self.started_at.elapsed()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::Deadline;
    use std::time::Duration;

    #[test]
    fn unbounded_never_expires() {
        let deadline = Deadline::unbounded();
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), None);
    }

    #[test]
    fn zero_budget_is_expired_immediately() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn generous_budget_has_time_left() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.is_expired());
        assert!(deadline.remaining().expect("bounded") > Duration::from_secs(50));
    }
}
