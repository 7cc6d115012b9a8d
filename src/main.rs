use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use livetiming::region::FileRegion;
use livetiming::{DecoderConfig, LiveSession, LiveSessionConfig, LogSink, TelemetryDecoder};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Relay live iRacing standings as JSON snapshots.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Replay a captured telemetry region instead of the live simulator
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Longest wait for new telemetry per tick, in milliseconds
    #[arg(short, long, default_value_t = 100)]
    wait: u64,

    /// Seconds between standings snapshots
    #[arg(short, long, default_value_t = 10)]
    refresh: u64,

    /// Replace driver names with their car index
    #[arg(long)]
    redact: bool,

    /// Write snapshots here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn decoder_for(file: Option<PathBuf>) -> anyhow::Result<TelemetryDecoder> {
    let config = DecoderConfig::default();
    match file {
        Some(path) => {
            let region = FileRegion::open(&path)
                .with_context(|| format!("opening region capture {}", path.display()))?;
            Ok(TelemetryDecoder::new(region, config))
        }
        None => live_decoder(config),
    }
}

#[cfg(windows)]
fn live_decoder(config: DecoderConfig) -> anyhow::Result<TelemetryDecoder> {
    let region = livetiming::windows::MappedRegion::open().context("mapping iRacing telemetry")?;
    Ok(TelemetryDecoder::new(region, config))
}

#[cfg(not(windows))]
fn live_decoder(_config: DecoderConfig) -> anyhow::Result<TelemetryDecoder> {
    Err(livetiming::TelemetryError::unsupported_platform("Live telemetry", "Windows"))
        .context("no --file given")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let writer: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };

    let decoder = decoder_for(args.file)?;
    let config = LiveSessionConfig {
        poll_timeout: Duration::from_millis(args.wait),
        post_interval: Duration::from_secs(args.refresh),
        redact: args.redact,
    };
    let mut live = LiveSession::new(decoder, LogSink::new(writer), config);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, sending final report");
                on_signal.cancel();
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
        }
    });

    if let Err(e) = live.run(cancel).await {
        for hint in e.recovery_suggestions() {
            warn!(hint, "Recovery suggestion");
        }
        return Err(e).context("live standings relay failed");
    }
    Ok(())
}
