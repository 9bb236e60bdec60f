//! File-name handshake.
//!
//! The sender repeats the NUL-terminated file name until the peer echoes the
//! same bytes back.  Every failure (no reply within the receive timeout, a
//! receive error, a different payload) leads to another attempt.  There is
//! no retry limit, so a peer that never answers blocks the transfer forever.

use std::time::Duration;

use tokio::time::Instant;

use crate::packet::{encode_name, is_name_echo};
use crate::socket::Transport;

/// Large enough for any file name a filesystem will hand us.
const ECHO_BUF_LEN: usize = 1024;

/// Run the handshake and return the number of attempts it took.
pub async fn handshake<T: Transport>(transport: &T, name: &str, recv_timeout: Duration) -> u32 {
    let request = encode_name(name);
    let mut buf = vec![0u8; ECHO_BUF_LEN];
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let deadline = Instant::now() + recv_timeout;

        if let Err(e) = transport.send(&request).await {
            log::warn!("[handshake] send failed: {e}");
        }
        log::debug!("[handshake] → NAME {name:?} attempt={attempts}");

        match transport.recv(&mut buf, recv_timeout).await {
            Ok(Some(n)) if is_name_echo(&buf[..n], name) => {
                log::info!("[handshake] peer confirmed {name:?} after {attempts} attempt(s)");
                return attempts;
            }
            Ok(Some(n)) => {
                log::debug!("[handshake] ← {n} bytes that are not our name; retrying");
            }
            Ok(None) => {
                log::debug!("[handshake] no echo within {recv_timeout:?}; retrying");
            }
            Err(e) => {
                // Errors such as ICMP port-unreachable come back at once; hold
                // off for the rest of this attempt instead of spinning.
                log::warn!("[handshake] receive failed: {e}");
                tokio::time::sleep_until(deadline).await;
            }
        }
    }
}
