//! CLI entry point for the OE10 commander.
//!
//! # Usage
//!
//! Poll the unit for status:
//! ```bash
//! oe10-commander poll --duration 5s
//! ```
//!
//! Tilt to a calibrated angle:
//! ```bash
//! oe10-commander move --angle 10
//! ```
//!
//! Analyze a logic-analyzer capture pair:
//! ```bash
//! oe10-commander analyze captures/tilt10_tx.csv captures/tilt10_rx.csv
//! ```
//!
//! `--simulate` swaps the serial port for a scripted device that replays
//! the captured status response, useful without hardware attached.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use oe10_commander::channel::{ByteChannel, MockChannel};
use oe10_commander::{capture, telemetry, Config, SessionController};

#[derive(Parser)]
#[command(name = "oe10-commander")]
#[command(about = "Reverse-engineered OE10 pan/tilt serial commander", long_about = None)]
struct Cli {
    /// Configuration file (TOML); defaults apply when absent
    #[arg(long, default_value = "config/oe10.toml")]
    config: PathBuf,

    /// Serial port override
    #[arg(long)]
    port: Option<String>,

    /// Run against a scripted device instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Pretty log output instead of compact
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the status polling loop
    Poll {
        /// How long to poll, e.g. "5s"
        #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
        duration: Duration,
    },

    /// Move to a calibrated tilt angle
    Move {
        /// Tilt angle in degrees (must be near a calibration sample)
        #[arg(long)]
        angle: f64,
    },

    /// Analyze a TX/RX logic-analyzer capture pair
    Analyze {
        /// TX-side capture CSV
        tx: PathBuf,
        /// RX-side capture CSV
        rx: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.pretty {
        telemetry::OutputFormat::Pretty
    } else {
        telemetry::OutputFormat::Compact
    };
    telemetry::init(format).map_err(|e| anyhow!("tracing init failed: {e}"))?;

    let mut config = Config::load_from(&cli.config).context("loading configuration")?;
    if let Some(port) = cli.port {
        config.transport.port = port;
    }

    match cli.command {
        Commands::Poll { duration } => {
            let channel = open_channel(&config, cli.simulate)?;
            let mut session = SessionController::new(channel, config.session_config())
                .with_timing(config.timing_model());
            session.run(duration).await.context("polling session")?;
            report_feedback(&session);
        }
        Commands::Move { angle } => {
            let channel = open_channel(&config, cli.simulate)?;
            let mut session = SessionController::new(channel, config.session_config())
                .with_timing(config.timing_model());
            session.start().await.context("session handshake")?;
            session.move_to(angle).await.context("movement command")?;
            // Keep polling briefly so the device settles, as the factory
            // controller does after a movement.
            session
                .run(Duration::from_secs(2))
                .await
                .context("post-movement polling")?;
            report_feedback(&session);
        }
        Commands::Analyze { tx, rx } => analyze_pair(&tx, &rx)?,
    }

    Ok(())
}

fn open_channel(config: &Config, simulate: bool) -> Result<Box<dyn ByteChannel>> {
    if simulate {
        info!("simulation mode: scripted device, no hardware");
        return Ok(Box::new(MockChannel::simulated_device()));
    }

    #[cfg(feature = "hardware")]
    {
        let channel =
            oe10_commander::SerialChannel::open(&config.transport.port, config.transport.baud)
                .with_context(|| format!("opening serial port {}", config.transport.port))?;
        info!(port = %config.transport.port, baud = config.transport.baud, "serial port open");
        Ok(Box::new(channel))
    }

    #[cfg(not(feature = "hardware"))]
    {
        let _ = config;
        Err(anyhow!(
            "built without the `hardware` feature; use --simulate"
        ))
    }
}

fn report_feedback<C: ByteChannel>(session: &SessionController<C>) {
    match session.last_feedback() {
        Some(report) => info!(?report, "last feedback"),
        None => info!("no feedback received"),
    }
}

fn analyze_pair(tx_path: &Path, rx_path: &Path) -> Result<()> {
    let tx = capture::read_capture(tx_path).context("reading TX capture")?;
    let rx = capture::read_capture(rx_path).context("reading RX capture")?;

    let tx_sequences = capture::find_sequences(&tx);
    let rx_sequences = capture::find_sequences(&rx);
    println!(
        "TX: {} sequences, RX: {} sequences",
        tx_sequences.len(),
        rx_sequences.len()
    );

    let (Some(tx_seq), Some(rx_seq)) = (tx_sequences.first(), rx_sequences.first()) else {
        return Err(anyhow!("need at least one complete sequence on each side"));
    };

    for (label, seq) in [("TX", tx_seq), ("RX", rx_seq)] {
        if let Some(summary) = capture::summarize(seq) {
            println!(
                "{label}: start {:#04x}, {} bytes, {} sync, {:.4}s",
                summary.start_marker, summary.len, summary.sync_count, summary.duration
            );
            let data: Vec<String> = summary
                .data_bytes
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect();
            println!("{label} data: {}", data.join(" "));
        }
    }

    let response_delay = match (tx_seq.first(), rx_seq.first()) {
        (Some(t), Some(r)) => r.timestamp - t.timestamp,
        _ => 0.0,
    };
    println!("command-to-response delay: {response_delay:.4}s");

    Ok(())
}
