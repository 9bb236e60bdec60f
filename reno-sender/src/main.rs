//! Entry point for `sender`.
//!
//! Parses CLI arguments, performs setup (file size, address resolution,
//! socket), and hands the file to [`reno_sender::Transfer`].  All protocol
//! work lives in the library; `main.rs` owns only process setup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use reno_sender::config::{DEFAULT_MSS, DEFAULT_PORT, INITIAL_SSTHRESH};
use reno_sender::socket::{self, Socket};
use reno_sender::{SenderConfig, Transfer, TransferError};

/// Send a file to a receiver over UDP with TCP Reno congestion control.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Receiver host name or address.
    host: String,

    /// File to send.
    file: PathBuf,

    /// Receiver port.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Payload bytes per segment.
    #[arg(long, default_value_t = DEFAULT_MSS)]
    mss: usize,

    /// Initial slow-start threshold in bytes.
    #[arg(long, default_value_t = INITIAL_SSTHRESH)]
    ssthresh: u64,
}

#[tokio::main]
async fn main() {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{e:#}");
        eprintln!("sender: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SenderConfig {
        max_segment_size: cli.mss,
        initial_ssthresh: cli.ssthresh,
        ..SenderConfig::default()
    };
    config.validate()?;

    let open_error = |source| TransferError::Open {
        path: cli.file.clone(),
        source,
    };
    let total = tokio::fs::metadata(&cli.file).await.map_err(open_error)?.len();
    let name = file_name(&cli.file)?;

    let peer = socket::resolve(&cli.host, cli.port).await?;
    let socket = Socket::connect(peer).await?;
    let file = tokio::fs::File::open(&cli.file).await.map_err(open_error)?;

    log::info!("sending {name:?} ({total} bytes) to {peer}");
    let transfer = Transfer::new(socket, name, total, config)?;
    let stats = transfer
        .run(file)
        .await
        .with_context(|| format!("transfer of {} failed", cli.file.display()))?;

    println!("Sender: {stats}");
    Ok(())
}

/// The name announced to the receiver: the final path component.
fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .with_context(|| format!("{} has no usable file name", path.display()))
}
