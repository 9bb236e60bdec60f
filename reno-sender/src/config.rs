//! Sender tuning knobs.

use std::time::Duration;

use crate::error::TransferError;
use crate::packet::{HEADER_LEN, MAX_DATAGRAM};
use crate::timer::TimerConfig;

/// Well-known port the receiver listens on.
pub const DEFAULT_PORT: u16 = 4950;

/// Payload bytes per segment; header + payload stays well inside one
/// unfragmented datagram on common links.
pub const DEFAULT_MSS: usize = 1024;

/// Initial slow-start threshold in bytes.
pub const INITIAL_SSTHRESH: u64 = 64_000;

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub max_segment_size: usize,
    pub initial_ssthresh: u64,
    /// RTT assumed before the first sample.
    pub initial_rtt: Duration,
    /// EWMA gain for the RTT estimate.
    pub alpha: f64,
    /// EWMA gain for the RTT deviation.
    pub beta: f64,
    /// Bound on every blocking receive (handshake echo, acks).
    pub recv_timeout: Duration,
    pub timer: TimerConfig,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_segment_size: DEFAULT_MSS,
            initial_ssthresh: INITIAL_SSTHRESH,
            initial_rtt: Duration::from_millis(100),
            alpha: 0.5,
            beta: 0.25,
            recv_timeout: Duration::from_secs(1),
            timer: TimerConfig::default(),
        }
    }
}

impl SenderConfig {
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.max_segment_size == 0 {
            return Err(TransferError::Config("segment size must be positive".into()));
        }
        if HEADER_LEN + self.max_segment_size > MAX_DATAGRAM {
            return Err(TransferError::Config(format!(
                "segment size {} exceeds the {} bytes one datagram can carry",
                self.max_segment_size,
                MAX_DATAGRAM - HEADER_LEN
            )));
        }
        for (name, gain) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !(gain > 0.0 && gain <= 1.0) {
                return Err(TransferError::Config(format!(
                    "{name} must be in (0, 1], got {gain}"
                )));
            }
        }
        if self.recv_timeout.is_zero() {
            return Err(TransferError::Config("receive timeout must be positive".into()));
        }
        if self.timer.min_rto > self.timer.max_rto {
            return Err(TransferError::Config("min_rto exceeds max_rto".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SenderConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_oversized_segments() {
        let config = SenderConfig {
            max_segment_size: MAX_DATAGRAM,
            ..SenderConfig::default()
        };
        assert!(matches!(config.validate(), Err(TransferError::Config(_))));

        let config = SenderConfig {
            max_segment_size: MAX_DATAGRAM - HEADER_LEN,
            ..SenderConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn rejects_zero_segment_size_and_bad_gains() {
        let zero = SenderConfig {
            max_segment_size: 0,
            ..SenderConfig::default()
        };
        assert!(zero.validate().is_err());

        let gain = SenderConfig {
            beta: 0.0,
            ..SenderConfig::default()
        };
        assert!(gain.validate().is_err());
    }
}
