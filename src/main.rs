//! Command-line interface for lora-to-csv
//!
//! Subscribes to the LoRa APRS messages heard by one receiving station and
//! writes them as CSV to stdout and to a file at the same time.
//!
//! # Usage Examples
//!
//! ```bash
//! # Log everything heard by DB0ABC-10 to ./lora-syslog.csv and stdout
//! lora-to-csv DB0ABC-10
//!
//! # Authenticated broker, validating its certificate
//! LORA_MQTT_PASSWORD=secret lora-to-csv DB0ABC-10 \
//!   --host broker.example.net --port 443 \
//!   --username station --ca-file broker-ca.pem
//! ```
//!
//! Diagnostics go to stderr; `RUST_LOG` controls their verbosity (default `info`).

use anyhow::Context;
use clap::Parser;
use lora_to_csv_mqtt_source::{setup_shutdown_handler, Client, Config};
use lora_to_csv_transcode::{Bridge, DualSink, Transcoder, DEFAULT_OUTPUT_FILE};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lora-to-csv")]
#[command(about = "MQTT to CSV converter for LoRa APRS messages")]
#[command(long_about = None)]
struct Cli {
    /// RX callsign to subscribe to
    callsign: String,

    /// MQTT broker options
    #[command(flatten)]
    mqtt: Config,

    /// CSV output file (truncated at startup)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing; stdout carries only CSV
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Open (and truncate) the output file before touching the network
    let sink = DualSink::open(&cli.output)?;
    let bridge = Bridge::new(Transcoder::new(cli.callsign.as_str()), sink);

    let mut client = Client::connect(&cli.mqtt, &cli.callsign).await?;

    let shutdown = setup_shutdown_handler();
    client
        .run(
            |message| {
                // Failures are logged by the bridge and only drop this message
                let _ = bridge.handle(&message.topic, &message.payload);
            },
            shutdown,
        )
        .await?;

    match bridge.columns() {
        Some(columns) => info!("Logged messages with {} columns", columns.len()),
        None => info!("No messages received"),
    }
    bridge
        .close()
        .with_context(|| format!("Failed to flush {}", cli.output.display()))?;
    info!("Closed {}", cli.output.display());
    Ok(())
}
