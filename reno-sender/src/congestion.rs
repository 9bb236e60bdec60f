//! Reno congestion controller.
//!
//! Owns the congestion window, slow-start threshold, phase and duplicate-ack
//! count.  All arithmetic is in whole bytes; congestion-avoidance growth uses
//! integer division (`mss² / cwnd`).
//!
//! This module only manages state; the caller decides what to transmit.

use crate::state::Phase;

/// Duplicate acks that trigger fast retransmit.
pub const DUP_ACK_THRESHOLD: u32 = 3;

#[derive(Debug, Clone)]
pub struct CongestionController {
    mss: u64,
    cwnd: u64,
    ssthresh: u64,
    phase: Phase,
    dup_acks: u32,
}

impl CongestionController {
    /// A controller starting in slow start with a one-segment window.
    pub fn new(mss: u64, initial_ssthresh: u64) -> Self {
        Self {
            mss,
            cwnd: mss,
            ssthresh: initial_ssthresh,
            phase: Phase::SlowStart,
            dup_acks: 0,
        }
    }

    /// Congestion window in bytes.
    pub fn window(&self) -> u64 {
        self.cwnd
    }

    pub fn ssthresh(&self) -> u64 {
        self.ssthresh
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn duplicate_acks(&self) -> u32 {
        self.dup_acks
    }

    pub fn max_segment_size(&self) -> u64 {
        self.mss
    }

    /// The cumulative ack advanced.
    pub fn on_new_ack(&mut self) {
        self.dup_acks = 0;
        match self.phase {
            Phase::SlowStart => {
                self.cwnd += self.mss;
                if self.cwnd >= self.ssthresh {
                    self.enter(Phase::CongestionAvoidance);
                }
            }
            Phase::CongestionAvoidance => {
                if self.cwnd == 0 {
                    self.cwnd = self.mss;
                } else {
                    self.cwnd += self.mss * self.mss / self.cwnd;
                }
            }
            Phase::FastRecovery => {
                // Deflate.  The threshold can sit below one segment when the
                // window was under two segments at the loss.
                self.cwnd = self.ssthresh.max(self.mss);
                self.enter(Phase::CongestionAvoidance);
            }
        }
    }

    /// The same cumulative ack arrived again.
    ///
    /// Returns `true` when this ack started fast recovery.
    pub fn on_duplicate_ack(&mut self) -> bool {
        self.dup_acks += 1;
        if self.dup_acks == DUP_ACK_THRESHOLD && self.phase != Phase::FastRecovery {
            self.ssthresh = self.cwnd / 2;
            self.cwnd = self.ssthresh + DUP_ACK_THRESHOLD as u64 * self.mss;
            self.enter(Phase::FastRecovery);
            return true;
        }
        if self.phase == Phase::FastRecovery {
            // Each further duplicate means another segment left the network.
            self.cwnd += self.mss;
        }
        false
    }

    /// No forward progress within the retransmission timeout.
    pub fn on_timeout(&mut self) {
        self.dup_acks = 0;
        self.ssthresh = self.cwnd / 2;
        self.cwnd = self.mss;
        self.enter(Phase::SlowStart);
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            log::debug!(
                "[cc] {} → {} cwnd={} ssthresh={}",
                self.phase,
                phase,
                self.cwnd,
                self.ssthresh
            );
        }
        self.phase = phase;
    }
}
