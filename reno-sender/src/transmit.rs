//! Transmission engine.
//!
//! Each cycle asks [`Control::poll_transmit`](crate::control::Control::poll_transmit)
//! what to send, releases the lock, and performs the I/O.  When there is
//! nothing to do the engine parks until the ack processor or the reader
//! wakes it, or until the retransmission deadline passes.
//!
//! Send failures are logged and otherwise ignored; a datagram that never
//! left is indistinguishable from one the network dropped, and the timer
//! recovers both.

use tokio::time::Instant;

use crate::control::Transmit;
use crate::error::TransferError;
use crate::packet::Segment;
use crate::socket::Transport;
use crate::transfer::Transfer;

impl<T: Transport> Transfer<T> {
    pub(crate) async fn transmit(&self) -> Result<(), TransferError> {
        loop {
            let next = self.control().poll_transmit(Instant::now(), &self.store);

            match next {
                Transmit::Done => break,
                Transmit::Send(batch) => {
                    for segment in &batch {
                        log::debug!("[send] → DATA offset={} len={}", segment.offset, segment.len());
                        self.send_segment(segment).await;
                    }
                }
                Transmit::Retransmit(segment) => {
                    log::debug!("[send] → RETX offset={} (timeout)", segment.offset);
                    self.send_segment(&segment).await;
                }
                Transmit::FastRetransmit { segment, pace } => {
                    log::debug!(
                        "[send] → RETX offset={} (fast recovery, pace {pace:?})",
                        segment.offset
                    );
                    self.send_segment(&segment).await;
                    tokio::time::sleep(pace).await;
                }
                Transmit::Idle { deadline } => match deadline {
                    Some(deadline) => {
                        tokio::select! {
                            _ = self.wakeup.notified() => {}
                            _ = tokio::time::sleep_until(deadline) => {}
                        }
                    }
                    None => self.wakeup.notified().await,
                },
            }
        }

        log::debug!("[send] all {} bytes acknowledged", self.total());
        Ok(())
    }

    async fn send_segment(&self, segment: &Segment) {
        if let Err(e) = self.transport.send(&segment.encode()).await {
            log::warn!("[send] offset={} not sent: {e}", segment.offset);
        }
    }
}
