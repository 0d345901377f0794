//! Cancellable timers for the single-threaded event loop.
//!
//! Timers never run on their own: the owner polls them with the current
//! time and reacts to the number of expirations. Cancelling a timer, or
//! dropping its owner, guarantees it never fires again.

use std::time::{Duration, Instant};

/// A single-shot or periodic deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
    period: Option<Duration>,
}

impl Timer {
    /// Fire once, `delay` after `now`.
    pub fn once(now: Instant, delay: Duration) -> Self {
        Self {
            deadline: Some(now + delay),
            period: None,
        }
    }

    /// Fire every `interval`, first at `now + interval`.
    ///
    /// A zero interval would fire unboundedly, so it is raised to 1 ms.
    pub fn periodic(now: Instant, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self {
            deadline: Some(now + interval),
            period: Some(interval),
        }
    }

    /// A timer that never fires.
    pub fn idle() -> Self {
        Self {
            deadline: None,
            period: None,
        }
    }

    /// Whether the timer can still fire
    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm the timer. Cancelling an idle timer is a no-op.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Count expirations up to `now` and re-arm or disarm accordingly.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let Some(deadline) = self.deadline else {
            return 0;
        };
        if now < deadline {
            return 0;
        }

        match self.period {
            None => {
                self.deadline = None;
                1
            }
            Some(period) => {
                let overdue = now.duration_since(deadline).as_nanos();
                let period_nanos = period.as_nanos();
                let fired = u32::try_from(overdue / period_nanos)
                    .unwrap_or(u32::MAX)
                    .saturating_add(1);

                // next deadline on the original grid, anchored at `now`
                let into_period = u64::try_from(overdue % period_nanos).unwrap_or(u64::MAX);
                self.deadline = now
                    .checked_sub(Duration::from_nanos(into_period))
                    .and_then(|last| last.checked_add(period));
                fired
            }
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::idle()
    }
}
