pub mod cli;
pub mod logging;

pub use cli::Cli;
pub use logging::{LoggingError, init_logging};

use crate::config::ConfigResolver;
use crate::sender::StatsSnapshot;
use crate::transport::HttpTransport;
use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info};

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Feeds every non-empty line of `reader` into the transport until EOF or
/// Ctrl+C. Returns the number of lines read.
pub async fn pump_lines<R>(transport: &HttpTransport, reader: R) -> anyhow::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0u64;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                transport.write_json(line);
                count += 1;
            }
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    Ok(count)
}

pub fn format_summary(stats: &StatsSnapshot) -> String {
    format!(
        "written={} dropped={} sent={} batches_sent={} batches_failed={} requeued={} discarded={} requests={} bytes={}",
        stats.entries_written,
        stats.entries_dropped,
        stats.entries_sent,
        stats.batches_sent,
        stats.batches_failed,
        stats.entries_requeued,
        stats.entries_discarded,
        stats.requests_attempted,
        stats.bytes_sent,
    )
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level).context("Failed to initialize logging")?;

    let explicit = cli.explicit_layer().context("Failed to load configuration")?;
    let config = ConfigResolver::new()
        .with_explicit(explicit)
        .resolve()
        .context("Invalid configuration")?;

    info!("Starting rask-log-transport v{}", get_version());
    let transport = HttpTransport::new(config).context("Failed to start HTTP transport")?;

    let stdin = BufReader::new(tokio::io::stdin());
    let result = pump_lines(&transport, stdin).await;

    transport.close().await;
    let stats = transport.stats();
    println!("{}", format_summary(&stats));

    if let Err(e) = &result {
        error!("Input error: {:#}", e);
    }
    if transport.pending() > 0 {
        error!("{} entries were not delivered", transport.pending());
    }
    result.map(|_| ())
}
