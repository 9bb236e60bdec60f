//! Congestion-control phases.
//!
//! ```text
//!  SLOW_START ───── cwnd ≥ ssthresh ─────▶ CONGESTION_AVOIDANCE
//!       │                                     ▲          │
//!       │ 3rd duplicate ack           new ack │          │ 3rd duplicate ack
//!       │                                     │          │
//!       └──────────────────────▶ FAST_RECOVERY ◀─────────┘
//!
//!  any phase ── timeout ──▶ SLOW_START
//! ```
//!
//! Every phase is a variant, so there is no "unknown phase" to handle.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Window grows by one segment per new ack.
    #[default]
    SlowStart,
    /// Window grows by roughly one segment per round trip.
    CongestionAvoidance,
    /// Presumed loss after three duplicate acks; the missing segment is
    /// retransmitted while the window is inflated.
    FastRecovery,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::SlowStart => "slow-start",
            Phase::CongestionAvoidance => "congestion-avoidance",
            Phase::FastRecovery => "fast-recovery",
        };
        f.write_str(name)
    }
}
