//! Fault-injecting transport for tests and experiments.
//!
//! [`Simulator`] wraps another [`Transport`] and interferes with outbound
//! segments according to a [`SimulatorConfig`]:
//!
//! | Fault            | Description                                           |
//! |------------------|-------------------------------------------------------|
//! | Targeted drop    | The first transmission of each listed offset is lost. |
//! | Random loss      | Any segment is dropped with probability `loss_rate`.  |
//! | Duplication      | A segment is delivered twice with `duplicate_rate`.   |
//!
//! Non-segment datagrams (the handshake) and everything received pass through
//! untouched.  The RNG is seeded so failures are reproducible.

use std::collections::BTreeSet;
use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::packet::Segment;
use crate::socket::Transport;

/// Fault model.  All probabilities are in `[0.0, 1.0]`.
#[derive(Debug, Clone, Default)]
pub struct SimulatorConfig {
    /// Offsets whose first transmission is dropped.
    pub drop_offsets: Vec<u64>,
    /// Probability that any given segment is silently dropped.
    pub loss_rate: f64,
    /// Probability that a segment is sent twice.
    pub duplicate_rate: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatorStats {
    pub passed: u64,
    pub dropped: u64,
    pub duplicated: u64,
}

#[derive(Debug)]
struct Faults {
    rng: StdRng,
    pending_drops: BTreeSet<u64>,
    stats: SimulatorStats,
}

#[derive(Debug)]
pub struct Simulator<T> {
    inner: T,
    loss_rate: f64,
    duplicate_rate: f64,
    faults: Mutex<Faults>,
}

enum Verdict {
    Drop,
    Pass,
    Duplicate,
}

impl<T: Transport> Simulator<T> {
    pub fn new(inner: T, config: SimulatorConfig) -> Self {
        Self {
            inner,
            loss_rate: config.loss_rate.clamp(0.0, 1.0),
            duplicate_rate: config.duplicate_rate.clamp(0.0, 1.0),
            faults: Mutex::new(Faults {
                rng: StdRng::seed_from_u64(config.seed),
                pending_drops: config.drop_offsets.into_iter().collect(),
                stats: SimulatorStats::default(),
            }),
        }
    }

    pub fn stats(&self) -> SimulatorStats {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).stats
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn judge(&self, datagram: &[u8]) -> Verdict {
        let Ok(segment) = Segment::decode(datagram) else {
            return Verdict::Pass;
        };
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);

        let verdict = if faults.pending_drops.remove(&segment.offset)
            || faults.rng.random_bool(self.loss_rate)
        {
            faults.stats.dropped += 1;
            Verdict::Drop
        } else if faults.rng.random_bool(self.duplicate_rate) {
            faults.stats.duplicated += 1;
            Verdict::Duplicate
        } else {
            Verdict::Pass
        };
        if !matches!(verdict, Verdict::Drop) {
            faults.stats.passed += 1;
        }
        verdict
    }
}

impl<T: Transport> Transport for Simulator<T> {
    async fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        match self.judge(datagram) {
            Verdict::Drop => {
                log::trace!("[sim] dropped {} bytes", datagram.len());
                Ok(datagram.len())
            }
            Verdict::Pass => self.inner.send(datagram).await,
            Verdict::Duplicate => {
                self.inner.send(datagram).await?;
                self.inner.send(datagram).await
            }
        }
    }

    async fn recv(&self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        self.inner.recv(buf, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what reaches the "network".
    #[derive(Default)]
    struct Sink {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl Transport for Sink {
        async fn send(&self, datagram: &[u8]) -> io::Result<usize> {
            self.sent.lock().unwrap().push(datagram.to_vec());
            Ok(datagram.len())
        }

        async fn recv(&self, _buf: &mut [u8], _timeout: Duration) -> io::Result<Option<usize>> {
            Ok(None)
        }
    }

    fn segment(offset: u64) -> Vec<u8> {
        Segment::new(offset, 10_000, vec![7; 100]).encode()
    }

    #[tokio::test]
    async fn targeted_drop_hits_first_transmission_only() {
        let sim = Simulator::new(
            Sink::default(),
            SimulatorConfig {
                drop_offsets: vec![100],
                ..SimulatorConfig::default()
            },
        );
        for offset in [0, 100, 200, 100] {
            sim.send(&segment(offset)).await.unwrap();
        }
        let stats = sim.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.passed, 3);

        let sent = sim.into_inner().sent.into_inner().unwrap();
        let offsets: Vec<u64> = sent
            .iter()
            .map(|d| Segment::decode(d).unwrap().offset)
            .collect();
        assert_eq!(offsets, vec![0, 200, 100]);
    }

    #[tokio::test]
    async fn handshake_datagrams_are_never_touched() {
        let sim = Simulator::new(
            Sink::default(),
            SimulatorConfig {
                loss_rate: 1.0,
                ..SimulatorConfig::default()
            },
        );
        sim.send(b"name.txt\0").await.unwrap();
        sim.send(&segment(0)).await.unwrap();
        assert_eq!(sim.stats().dropped, 1);
        assert_eq!(sim.into_inner().sent.into_inner().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplication_sends_twice() {
        let sim = Simulator::new(
            Sink::default(),
            SimulatorConfig {
                duplicate_rate: 1.0,
                ..SimulatorConfig::default()
            },
        );
        sim.send(&segment(0)).await.unwrap();
        assert_eq!(sim.stats().duplicated, 1);
        assert_eq!(sim.into_inner().sent.into_inner().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn seeded_loss_is_reproducible() {
        async fn dropped_with(seed: u64) -> u64 {
            let sim = Simulator::new(
                Sink::default(),
                SimulatorConfig {
                    loss_rate: 0.3,
                    seed,
                    ..SimulatorConfig::default()
                },
            );
            for i in 0..200 {
                sim.send(&segment(i * 100 % 9_900)).await.unwrap();
            }
            sim.stats().dropped
        }
        let first = dropped_with(42).await;
        assert_eq!(first, dropped_with(42).await);
        assert!(first > 20 && first < 120, "dropped {first} of 200");
    }
}
