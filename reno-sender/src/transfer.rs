//! One file transfer, from handshake to the final acknowledgment.
//!
//! A [`Transfer`] owns everything a session needs: the transport, the
//! segment store, and the mutex-guarded [`Control`] block.  [`Transfer::run`]
//! drives three activities concurrently:
//!
//! ```text
//!   source ──▶ fill_store ──▶ SegmentStore ──▶ transmit ──▶ Transport
//!                                  ▲               ▲            │
//!                                  │     Control (Mutex)        │
//!                                  │               ▼            │
//!                                  └───────── process_acks ◀────┘
//! ```
//!
//! The reader starts immediately.  The transmission engine and the ack
//! processor start once the handshake has completed and the store holds
//! data.  All three end when every byte is acknowledged; the first fatal
//! error cancels the others, and the socket and file are released when
//! `run` returns.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config::SenderConfig;
use crate::control::{Control, Counters};
use crate::error::TransferError;
use crate::handshake::handshake;
use crate::packet::Segment;
use crate::socket::Transport;
use crate::store::SegmentStore;

/// Summary of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    /// Bytes acknowledged by the peer (the whole file).
    pub bytes: u64,
    pub elapsed: Duration,
    pub handshake_attempts: u32,
    pub segments_sent: u64,
    pub retransmissions: u64,
    pub timeouts: u64,
    pub fast_recoveries: u64,
}

impl TransferStats {
    /// Throughput in kilobytes (1000 bytes) per second.
    pub fn throughput_kbps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.bytes as f64 / 1000.0 / secs
    }
}

impl std::fmt::Display for TransferStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sent {} bytes in {:.2} s ({:.2} kB/s); {} segments, {} retransmissions, \
             {} timeouts, {} fast recoveries",
            self.bytes,
            self.elapsed.as_secs_f64(),
            self.throughput_kbps(),
            self.segments_sent,
            self.retransmissions,
            self.timeouts,
            self.fast_recoveries
        )
    }
}

pub struct Transfer<T> {
    pub(crate) transport: T,
    pub(crate) config: SenderConfig,
    pub(crate) store: SegmentStore,
    control: Mutex<Control>,
    /// Wakes the transmission engine after an ack or a newly read segment.
    pub(crate) wakeup: Notify,
    name: String,
    total: u64,
}

impl<T: Transport> Transfer<T> {
    /// Prepare a transfer of `total` bytes announced to the peer as `name`.
    pub fn new(
        transport: T,
        name: impl Into<String>,
        total: u64,
        config: SenderConfig,
    ) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self {
            control: Mutex::new(Control::new(total, &config)),
            transport,
            config,
            store: SegmentStore::new(),
            wakeup: Notify::new(),
            name: name.into(),
            total,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Lock the control block.  Never held across an `.await`.
    pub(crate) fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send everything `source` yields, which must be exactly `total` bytes.
    pub async fn run<R>(&self, source: R) -> Result<TransferStats, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        let started = Instant::now();

        let pipeline = async {
            let attempts = handshake(&self.transport, &self.name, self.config.recv_timeout).await;
            self.store.wait_ready().await;
            tokio::try_join!(self.transmit(), self.process_acks())?;
            Ok::<_, TransferError>(attempts)
        };
        let ((), handshake_attempts) = tokio::try_join!(self.fill_store(source), pipeline)?;

        let Counters {
            segments_sent,
            retransmissions,
            timeouts,
            fast_recoveries,
        } = self.control().counters();
        let stats = TransferStats {
            bytes: self.total,
            elapsed: started.elapsed(),
            handshake_attempts,
            segments_sent,
            retransmissions,
            timeouts,
            fast_recoveries,
        };
        log::info!("[transfer] {stats}");
        Ok(stats)
    }

    /// Read `source` into the store one segment at a time.
    async fn fill_store<R>(&self, mut source: R) -> Result<(), TransferError>
    where
        R: AsyncRead + Unpin,
    {
        let mss = self.config.max_segment_size as u64;
        let mut offset = 0u64;

        loop {
            let mut payload = Vec::with_capacity(self.config.max_segment_size);
            (&mut source)
                .take(mss)
                .read_to_end(&mut payload)
                .await
                .map_err(TransferError::Read)?;
            if payload.is_empty() {
                break;
            }

            let segment = Segment::new(offset, self.total, payload);
            if segment.end() > self.total {
                return Err(TransferError::FileChanged {
                    expected: self.total,
                    actual: segment.end(),
                });
            }
            log::trace!("[read] offset={} len={}", segment.offset, segment.len());
            offset = self.store.insert(segment);
            self.control().on_readable(offset);
            self.wakeup.notify_one();
        }

        if offset != self.total {
            return Err(TransferError::FileChanged {
                expected: self.total,
                actual: offset,
            });
        }
        self.store.mark_ready();
        log::debug!("[read] done: {} segments, {offset} bytes", self.store.len());
        Ok(())
    }
}
