//! Loopback receiver used by the integration tests.
//!
//! The peer echoes the handshake name, reassembles segments (buffering any
//! that arrive out of order) and answers every segment with a cumulative
//! ack.  It exits once the handshake is done and the sender has been quiet
//! for [`PeerConfig::idle_exit`].

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use reno_sender::packet::{encode_ack, Segment, MAX_DATAGRAM};

#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Answer this many handshake datagrams with a wrong name first.
    pub wrong_echoes: u32,
    /// Delay before each ack leaves, to give the sender a measurable RTT.
    pub ack_delay: Duration,
    pub idle_exit: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            wrong_echoes: 0,
            ack_delay: Duration::ZERO,
            idle_exit: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Default)]
pub struct PeerReport {
    /// The name from the last handshake datagram.
    pub name: String,
    pub handshakes: u32,
    /// Bytes delivered in order.
    pub data: Vec<u8>,
    /// Total size carried in the segment headers, if any segment arrived.
    pub total: Option<u64>,
    pub segments: u64,
    /// Segments that were entirely below the delivery point.
    pub duplicates: u64,
}

pub struct Peer {
    pub addr: SocketAddr,
    handle: JoinHandle<PeerReport>,
}

impl Peer {
    pub async fn spawn(config: PeerConfig) -> Peer {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind peer");
        let addr = socket.local_addr().expect("peer address");
        let handle = tokio::spawn(serve(socket, config));
        Peer { addr, handle }
    }

    /// Wait for the peer to go idle and return what it received.
    pub async fn finish(self) -> PeerReport {
        tokio::time::timeout(Duration::from_secs(30), self.handle)
            .await
            .expect("peer did not go idle")
            .expect("peer task panicked")
    }
}

#[derive(Default)]
struct Reassembly {
    next: u64,
    data: Vec<u8>,
    pending: BTreeMap<u64, Vec<u8>>,
}

impl Reassembly {
    /// Accept one segment; returns `false` for a duplicate.
    fn accept(&mut self, segment: Segment) -> bool {
        if segment.end() <= self.next {
            return false;
        }
        if segment.offset > self.next {
            return self.pending.insert(segment.offset, segment.payload).is_none();
        }
        let skip = (self.next - segment.offset) as usize;
        self.data.extend_from_slice(&segment.payload[skip..]);
        self.next = segment.end();

        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() > self.next {
                break;
            }
            let (offset, payload) = entry.remove_entry();
            let end = offset + payload.len() as u64;
            if end > self.next {
                let skip = (self.next - offset) as usize;
                self.data.extend_from_slice(&payload[skip..]);
                self.next = end;
            }
        }
        true
    }
}

async fn serve(socket: UdpSocket, config: PeerConfig) -> PeerReport {
    let mut report = PeerReport::default();
    let mut reassembly = Reassembly::default();
    let mut wrong_left = config.wrong_echoes;
    let mut handshake_done = false;
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let received = if handshake_done {
            match tokio::time::timeout(config.idle_exit, socket.recv_from(&mut buf)).await {
                Ok(received) => received,
                Err(_idle) => break,
            }
        } else {
            socket.recv_from(&mut buf).await
        };
        let (n, from) = received.expect("peer receive");
        let datagram = &buf[..n];

        match Segment::decode(datagram) {
            Ok(segment) if handshake_done => {
                report.segments += 1;
                report.total = Some(segment.total_size);
                if !reassembly.accept(segment) {
                    report.duplicates += 1;
                }
                if !config.ack_delay.is_zero() {
                    tokio::time::sleep(config.ack_delay).await;
                }
                socket
                    .send_to(&encode_ack(reassembly.next), from)
                    .await
                    .expect("peer send ack");
            }
            _ => {
                report.handshakes += 1;
                let name = datagram.split(|&b| b == 0).next().unwrap_or_default();
                report.name = String::from_utf8_lossy(name).into_owned();
                if wrong_left > 0 {
                    wrong_left -= 1;
                    socket.send_to(b"not-the-name\0", from).await.expect("peer send");
                } else {
                    socket.send_to(datagram, from).await.expect("peer echo");
                    handshake_done = true;
                }
            }
        }
    }

    report.data = reassembly.data;
    report
}

/// Deterministic, non-repeating-looking file contents.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) ^ (i >> 8)) as u8).collect()
}
