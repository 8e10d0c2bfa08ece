//! Interval timers for the control loop
//!
//! Both the reconnect cooldown and the resync interval are the same shape:
//! a last-fired tick plus a fixed period, compared against the monotonic
//! millisecond counter each pass.

/// Last-attempt timestamp plus a fixed period
#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    last_ms: u64,
    period_ms: u64,
}

/// Paces broker reconnect attempts
pub type RetryTimer = IntervalTimer;

/// Paces time service resyncs
pub type ResyncTimer = IntervalTimer;

impl IntervalTimer {
    /// Timer that last fired at tick zero
    pub const fn new(period_ms: u64) -> Self {
        Self {
            last_ms: 0,
            period_ms,
        }
    }

    pub const fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Milliseconds since the timer last fired
    pub fn elapsed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ms)
    }

    /// Whether a full period has passed since the timer last fired
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.elapsed(now_ms) >= self.period_ms
    }

    /// Mark the timer as fired at `now_ms`
    pub fn reset(&mut self, now_ms: u64) {
        self.last_ms = now_ms;
    }
}
