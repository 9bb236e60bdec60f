//! Round-trip time estimation.
//!
//! At most one segment is timed at a time.  When the cumulative ack covers
//! the timed segment the elapsed time becomes a sample and feeds two
//! exponentially weighted moving averages:
//!
//! ```text
//! estimated = (1 - α)·estimated + α·sample
//! deviation = (1 - β)·deviation + β·|estimated - sample|
//! timeout   = estimated + 4·deviation
//! ```
//!
//! Note the deviation is taken against the *updated* estimate.

use std::time::Duration;

use tokio::time::Instant;

/// A segment currently being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RttSample {
    pub started: Instant,
    /// The sample completes once the cumulative ack reaches this offset.
    pub target: u64,
}

#[derive(Debug, Clone)]
pub struct RttEstimator {
    /// Smoothed round-trip time, in seconds.
    estimated: f64,
    /// Smoothed mean deviation, in seconds.
    deviation: f64,
    alpha: f64,
    beta: f64,
    sample: Option<RttSample>,
}

impl RttEstimator {
    pub fn new(initial_rtt: Duration, alpha: f64, beta: f64) -> Self {
        Self {
            estimated: initial_rtt.as_secs_f64(),
            deviation: 0.0,
            alpha,
            beta,
            sample: None,
        }
    }

    pub fn estimated_rtt(&self) -> f64 {
        self.estimated
    }

    pub fn deviation_rtt(&self) -> f64 {
        self.deviation
    }

    /// `estimated + 4 × deviation`, in seconds.
    pub fn timeout_interval(&self) -> f64 {
        self.estimated + 4.0 * self.deviation
    }

    pub fn is_sampling(&self) -> bool {
        self.sample.is_some()
    }

    pub fn sample(&self) -> Option<RttSample> {
        self.sample
    }

    /// Begin timing a segment ending at `target`, unless one is already timed.
    pub fn start_sample(&mut self, now: Instant, target: u64) {
        if self.sample.is_none() {
            self.sample = Some(RttSample {
                started: now,
                target,
            });
        }
    }

    /// Forget the in-flight sample (its segment is being retransmitted, so
    /// the ack would be ambiguous).
    pub fn cancel_sample(&mut self) {
        self.sample = None;
    }

    /// Complete the in-flight sample if `ack` covers it.
    ///
    /// Returns the measured round-trip time when a sample completed.
    pub fn on_ack(&mut self, ack: u64, now: Instant) -> Option<Duration> {
        let sample = self.sample?;
        if sample.target > ack {
            return None;
        }
        self.sample = None;
        let rtt = now.saturating_duration_since(sample.started);
        self.update(rtt.as_secs_f64());
        Some(rtt)
    }

    /// Fold one measured round-trip time (seconds) into the averages.
    pub fn update(&mut self, sample_rtt: f64) {
        self.estimated = (1.0 - self.alpha) * self.estimated + self.alpha * sample_rtt;
        self.deviation = (1.0 - self.beta) * self.deviation
            + self.beta * (self.estimated - sample_rtt).abs();
    }
}
