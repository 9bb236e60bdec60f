//! Acknowledgment processor.
//!
//! Blocks on the transport for the next cumulative ack, hands it to the
//! control block, and wakes the transmission engine.  The receive timeout
//! only bounds each wait so completion is noticed; protocol timeouts belong
//! to the retransmission timer.

use tokio::time::Instant;

use crate::control::AckKind;
use crate::error::TransferError;
use crate::packet::{decode_ack, MAX_DATAGRAM};
use crate::socket::Transport;
use crate::transfer::Transfer;

impl<T: Transport> Transfer<T> {
    pub(crate) async fn process_acks(&self) -> Result<(), TransferError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];

        while !self.control().is_complete() {
            let n = match self.transport.recv(&mut buf, self.config.recv_timeout).await {
                Ok(Some(n)) => n,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("[ack] receive failed: {e}");
                    continue;
                }
            };

            let ack = match decode_ack(&buf[..n]) {
                Ok(ack) => ack,
                Err(e) => {
                    log::debug!("[ack] ignoring datagram: {e}");
                    continue;
                }
            };

            let (kind, cwnd, phase) = {
                let mut control = self.control();
                let kind = control.on_ack(ack, Instant::now());
                (kind, control.congestion().window(), control.congestion().phase())
            };

            match kind {
                AckKind::New { acked } => {
                    log::debug!("[ack] ← ACK {ack} (+{acked}) cwnd={cwnd} {phase}");
                }
                AckKind::Duplicate { count, fast_retransmit: true } => {
                    log::info!("[ack] ← ACK {ack} duplicate #{count}: fast retransmit, cwnd={cwnd}");
                }
                AckKind::Duplicate { count, .. } => {
                    log::debug!("[ack] ← ACK {ack} duplicate #{count} cwnd={cwnd}");
                }
                AckKind::Stale => log::trace!("[ack] ← ACK {ack} stale"),
                AckKind::Bogus => log::debug!("[ack] ← ACK {ack} beyond anything sent; dropped"),
            }
            self.wakeup.notify_one();
        }

        log::debug!("[ack] transfer fully acknowledged");
        Ok(())
    }
}
