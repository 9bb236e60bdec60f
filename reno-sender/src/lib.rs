//! `reno-sender`: the sending end of a reliable file transfer over UDP, with
//! TCP Reno congestion control and adaptive retransmission timeouts.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  segments  ┌──────────────┐  datagrams  ┌──────────┐
//!  │  reader  │──────────▶│ SegmentStore │─────────────▶│ transmit │──┐
//!  └──────────┘            └──────────────┘              └────▲─────┘  │
//!                                                             │        │
//!                          ┌──────────────────────────────────┴──┐     │
//!                          │        Control (one Mutex)          │     │
//!                          │ cursors · congestion · RTT · timer  │     │
//!                          └──────────────────────────────────▲──┘     │
//!                                                             │        ▼
//!                                                        ┌────┴─────┐ ┌───────────┐
//!                                                        │   acks   │◀│ Transport │
//!                                                        └──────────┘ └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]     : wire format (segments, acks, handshake name)
//! - [`socket`]     : datagram transport trait and the tokio UDP socket
//! - [`store`]      : append-only segment store and "data available" signal
//! - [`rtt`]        : RTT estimation and timeout interval
//! - [`timer`]      : retransmission timer
//! - [`state`]      : congestion-control phases
//! - [`congestion`] : Reno window / threshold state machine
//! - [`control`]    : shared send-side control block
//! - [`handshake`]  : file-name exchange
//! - [`transfer`]   : session driver: reader, pipeline, statistics
//! - [`simulator`]  : lossy transport wrapper for testing
//! - [`config`]     : tunables
//! - [`error`]      : fatal error type

mod acks;
pub mod config;
pub mod congestion;
pub mod control;
pub mod error;
pub mod handshake;
pub mod packet;
pub mod rtt;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod store;
pub mod timer;
pub mod transfer;
mod transmit;

pub use config::SenderConfig;
pub use error::TransferError;
pub use transfer::{Transfer, TransferStats};
