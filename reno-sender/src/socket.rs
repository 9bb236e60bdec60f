//! Datagram transport.
//!
//! [`Transport`] is the seam between the protocol engine and the network: the
//! engine only ever sends whole datagrams and receives with a bounded wait.
//! [`Socket`] implements it on top of a connected `tokio::net::UdpSocket`;
//! [`crate::simulator::Simulator`] wraps any transport to inject faults.
//!
//! Nothing here assumes delivery, ordering, or exactly-once semantics.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::TransferError;

/// A datagram channel to a single peer.
pub trait Transport: Send + Sync {
    /// Send one datagram.  Returns the number of bytes handed to the network.
    fn send(&self, datagram: &[u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Wait up to `timeout` for the next datagram.
    ///
    /// `Ok(None)` means the wait elapsed without anything arriving.
    fn recv(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> impl Future<Output = io::Result<Option<usize>>> + Send;
}

/// Resolve `host` and `port` to the first matching socket address.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransferError> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| TransferError::Resolve {
            host: host.to_string(),
            reason: e.to_string(),
        })?;
    addrs.next().ok_or_else(|| TransferError::Resolve {
        host: host.to_string(),
        reason: "no addresses found".into(),
    })
}

/// A UDP socket connected to one peer.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after the OS assigns a port).
    pub local_addr: SocketAddr,
    /// The peer every datagram goes to.
    pub peer: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind an ephemeral port of the peer's address family and connect it to
    /// `peer`.
    pub async fn connect(peer: SocketAddr) -> Result<Self, TransferError> {
        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let inner = UdpSocket::bind(local)
            .await
            .map_err(TransferError::Socket)?;
        inner.connect(peer).await.map_err(TransferError::Socket)?;
        let local_addr = inner.local_addr().map_err(TransferError::Socket)?;
        log::debug!("[socket] {local_addr} connected to {peer}");
        Ok(Self {
            local_addr,
            peer,
            inner,
        })
    }
}

impl Transport for Socket {
    async fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        self.inner.send(datagram).await
    }

    async fn recv(&self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        match tokio::time::timeout(timeout, self.inner.recv(buf)).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connected_socket_exchanges_datagrams() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket = Socket::connect(peer.local_addr().unwrap()).await.unwrap();

        socket.send(b"ping").await.unwrap();
        let mut buf = [0u8; 16];
        let (n, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");

        peer.send_to(b"pong", from).await.unwrap();
        let n = socket
            .recv(&mut buf, Duration::from_secs(5))
            .await
            .unwrap()
            .expect("reply");
        assert_eq!(&buf[..n], b"pong");
    }

    #[tokio::test]
    async fn recv_times_out_with_none() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket = Socket::connect(peer.local_addr().unwrap()).await.unwrap();
        let mut buf = [0u8; 16];
        let got = socket
            .recv(&mut buf, Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn resolve_numeric_address() {
        let addr = resolve("127.0.0.1", 4950).await.unwrap();
        assert_eq!(addr, "127.0.0.1:4950".parse().unwrap());
    }
}
