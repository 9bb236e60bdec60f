//! Retransmission timer.
//!
//! The timer is a logical clock, not a task: the transmission engine asks it
//! whether the current deadline has passed, and the ack processor restarts it
//! on forward progress.  The deadline is the RTT estimator's timeout interval
//! clamped to [`TimerConfig`]'s bounds.

use std::time::Duration;

use tokio::time::Instant;

/// Bounds applied to the retransmission timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// Shortest timeout ever used, whatever the RTT estimate says.
    pub min_rto: Duration,
    /// Longest timeout ever used.
    pub max_rto: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            min_rto: Duration::from_millis(10),
            max_rto: Duration::from_secs(60),
        }
    }
}

impl TimerConfig {
    /// Convert a timeout interval in seconds into the effective deadline.
    pub fn rto(&self, interval_secs: f64) -> Duration {
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return self.min_rto;
        }
        Duration::from_secs_f64(interval_secs.min(self.max_rto.as_secs_f64()))
            .clamp(self.min_rto, self.max_rto)
    }
}

/// Tracks time since the last forward progress.
#[derive(Debug, Clone, Default)]
pub struct RetransmitTimer {
    started: Option<Instant>,
}

impl RetransmitTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.started.is_some()
    }

    /// Start the clock if it is idle; a running clock is left alone.
    pub fn arm_if_idle(&mut self, now: Instant) {
        self.started.get_or_insert(now);
    }

    /// Start a fresh deadline from `now`.
    pub fn restart(&mut self, now: Instant) {
        self.started = Some(now);
    }

    pub fn disarm(&mut self) {
        self.started = None;
    }

    /// The instant the timer fires with timeout `rto`, if armed.
    pub fn deadline(&self, rto: Duration) -> Option<Instant> {
        self.started.map(|started| started + rto)
    }

    /// `true` once `rto` has elapsed since the timer was armed.
    pub fn expired(&self, now: Instant, rto: Duration) -> bool {
        self.started
            .is_some_and(|started| now.saturating_duration_since(started) >= rto)
    }
}
