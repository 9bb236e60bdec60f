//! Send-side control block.
//!
//! [`Control`] bundles every piece of mutable protocol state the transmission
//! engine and the ack processor share: the cursors, the congestion
//! controller, the RTT estimator and the retransmission timer.  It lives
//! behind a single mutex and is only touched through three operations:
//!
//! - [`Control::on_readable`]: the reader appended data,
//! - [`Control::on_ack`]: a cumulative ack arrived,
//! - [`Control::poll_transmit`]: decide what to put on the wire next.
//!
//! # Cursor layout
//!
//! ```text
//!  ack_offset        send_cursor      readable_limit        total
//!      │                  │                  │                │
//!  ────┼──────────────────┼──────────────────┼────────────────┼──▶ bytes
//!      │ <── in flight ──▶│ <── in store ───▶│ <── unread ───▶│
//!      │<──────── cwnd ─────────▶│
//!                          window_limit
//! ```
//!
//! `ack_offset ≤ send_cursor ≤ readable_limit ≤ total` holds after every
//! operation.  Segments may start at any offset up to and including
//! `window_limit`, so `send_cursor` can pass it by at most one segment, and
//! it trails `send_cursor` after the window shrinks.
//!
//! No I/O happens here; the caller sends whatever [`Transmit`] names.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::SenderConfig;
use crate::congestion::CongestionController;
use crate::packet::Segment;
use crate::rtt::RttEstimator;
use crate::state::Phase;
use crate::store::SegmentStore;
use crate::timer::{RetransmitTimer, TimerConfig};

/// Shortest pause between fast-recovery retransmissions.
const MIN_PACING: Duration = Duration::from_millis(1);

/// What the transmission engine should do next.
#[derive(Debug)]
pub enum Transmit {
    /// New data, in offset order.  Cursors and timer are already updated.
    Send(Vec<Arc<Segment>>),
    /// Retransmission after a timeout.
    Retransmit(Arc<Segment>),
    /// Fast-recovery retransmission, followed by a pause of `pace`.
    FastRetransmit { segment: Arc<Segment>, pace: Duration },
    /// Nothing to send until an ack, more data, or the timer deadline.
    Idle { deadline: Option<Instant> },
    /// Every byte has been acknowledged.
    Done,
}

/// How an incoming ack was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    /// The cumulative ack advanced by `acked` bytes.
    New { acked: u64 },
    /// Repeat of the current ack; `fast_retransmit` is set on the ack that
    /// started fast recovery.
    Duplicate { count: u32, fast_retransmit: bool },
    /// Older than the current ack; ignored.
    Stale,
    /// Acknowledges bytes never sent; ignored.
    Bogus,
}

/// Running totals, reported at the end of the transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub segments_sent: u64,
    pub retransmissions: u64,
    pub timeouts: u64,
    pub fast_recoveries: u64,
}

#[derive(Debug)]
pub struct Control {
    total: u64,
    ack_offset: u64,
    send_cursor: u64,
    readable_limit: u64,
    congestion: CongestionController,
    rtt: RttEstimator,
    timer: RetransmitTimer,
    timer_config: TimerConfig,
    /// Set when the timer fired and the retransmission is still pending.
    timed_out: bool,
    counters: Counters,
}

impl Control {
    pub fn new(total: u64, config: &SenderConfig) -> Self {
        Self {
            total,
            ack_offset: 0,
            send_cursor: 0,
            readable_limit: 0,
            congestion: CongestionController::new(
                config.max_segment_size as u64,
                config.initial_ssthresh,
            ),
            rtt: RttEstimator::new(config.initial_rtt, config.alpha, config.beta),
            timer: RetransmitTimer::new(),
            timer_config: config.timer,
            timed_out: false,
            counters: Counters::default(),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn ack_offset(&self) -> u64 {
        self.ack_offset
    }

    pub fn send_cursor(&self) -> u64 {
        self.send_cursor
    }

    pub fn readable_limit(&self) -> u64 {
        self.readable_limit
    }

    /// Highest offset a new segment may start at.
    pub fn window_limit(&self) -> u64 {
        self.ack_offset + self.congestion.window()
    }

    pub fn congestion(&self) -> &CongestionController {
        &self.congestion
    }

    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    pub fn timer(&self) -> &RetransmitTimer {
        &self.timer
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn is_complete(&self) -> bool {
        self.ack_offset == self.total
    }

    /// Retransmission timeout currently in force.
    pub fn rto(&self) -> Duration {
        self.timer_config.rto(self.rtt.timeout_interval())
    }

    /// When the retransmission timer will fire, if it is running.
    pub fn timer_deadline(&self) -> Option<Instant> {
        if self.timed_out {
            return None;
        }
        self.timer.deadline(self.rto())
    }

    /// The store now holds every byte below `end`.
    pub fn on_readable(&mut self, end: u64) {
        self.readable_limit = self.readable_limit.max(end.min(self.total));
        self.debug_check();
    }

    /// Process one cumulative ack.
    pub fn on_ack(&mut self, ack: u64, now: Instant) -> AckKind {
        if ack > self.send_cursor {
            return AckKind::Bogus;
        }

        if let Some(sample) = self.rtt.on_ack(ack, now) {
            log::debug!(
                "[rtt] sample={:?} estimated={:.6}s deviation={:.6}s timeout={:.6}s",
                sample,
                self.rtt.estimated_rtt(),
                self.rtt.deviation_rtt(),
                self.rtt.timeout_interval()
            );
        }

        let kind = if ack > self.ack_offset {
            let acked = ack - self.ack_offset;
            self.ack_offset = ack;
            if self.ack_offset < self.send_cursor {
                self.timer.restart(now);
            } else {
                self.timer.disarm();
            }
            self.congestion.on_new_ack();
            AckKind::New { acked }
        } else if ack == self.ack_offset {
            let fast_retransmit = self.congestion.on_duplicate_ack();
            if fast_retransmit {
                self.counters.fast_recoveries += 1;
            }
            AckKind::Duplicate {
                count: self.congestion.duplicate_acks(),
                fast_retransmit,
            }
        } else {
            AckKind::Stale
        };

        self.debug_check();
        kind
    }

    /// Decide the next transmission.
    ///
    /// Checks the retransmission timer first; a timeout collapses the window
    /// and retransmits the oldest unacknowledged segment.  During fast
    /// recovery only that segment is resent.  Otherwise every segment that
    /// fits in the window and has been read is released.
    pub fn poll_transmit(&mut self, now: Instant, store: &SegmentStore) -> Transmit {
        if self.is_complete() {
            return Transmit::Done;
        }

        if !self.timed_out && self.timer.expired(now, self.rto()) {
            log::warn!(
                "[timer] timeout after {:?} at ack={} cwnd={}",
                self.rto(),
                self.ack_offset,
                self.congestion.window()
            );
            self.congestion.on_timeout();
            self.counters.timeouts += 1;
            self.timed_out = true;
        }

        if self.timed_out {
            self.rtt.cancel_sample();
            return match store.get(self.ack_offset) {
                Some(segment) => {
                    self.timed_out = false;
                    self.timer.restart(now);
                    self.counters.retransmissions += 1;
                    Transmit::Retransmit(segment)
                }
                None => Transmit::Idle { deadline: None },
            };
        }

        if self.congestion.phase() == Phase::FastRecovery && self.ack_offset < self.send_cursor {
            self.rtt.cancel_sample();
            if let Some(segment) = store.get(self.ack_offset) {
                self.counters.retransmissions += 1;
                let pace = Duration::from_secs_f64(self.rtt.estimated_rtt() / 2.0).max(MIN_PACING);
                return Transmit::FastRetransmit { segment, pace };
            }
        }

        let mut batch = Vec::new();
        while self.send_cursor < self.readable_limit && self.send_cursor <= self.window_limit() {
            let Some(segment) = store.get(self.send_cursor) else {
                break;
            };
            self.timer.arm_if_idle(now);
            self.send_cursor = segment.end();
            self.rtt.start_sample(now, segment.end());
            self.counters.segments_sent += 1;
            batch.push(segment);
        }
        self.debug_check();

        if batch.is_empty() {
            Transmit::Idle {
                deadline: self.timer_deadline(),
            }
        } else {
            Transmit::Send(batch)
        }
    }

    fn debug_check(&self) {
        debug_assert!(
            self.ack_offset <= self.send_cursor
                && self.send_cursor <= self.readable_limit
                && self.readable_limit <= self.total,
            "cursor order violated: ack={} send={} readable={} total={}",
            self.ack_offset,
            self.send_cursor,
            self.readable_limit,
            self.total
        );
    }
}
