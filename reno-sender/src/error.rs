//! Error type shared by the transfer pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Unrecoverable failures.  Transient network conditions never surface here;
/// they are absorbed by the retransmission machinery.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("could not resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("socket setup failed: {0}")]
    Socket(#[source] io::Error),

    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read error: {0}")]
    Read(#[source] io::Error),

    #[error("source is {actual} bytes but {expected} were advertised")]
    FileChanged { expected: u64, actual: u64 },

    #[error("invalid configuration: {0}")]
    Config(String),
}
