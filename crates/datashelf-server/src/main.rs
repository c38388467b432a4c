//! Datashelf Server - HTTP service for publishing and serving datasets.
//!
//! This binary wraps the datashelf-core catalog with a small REST surface:
//! list and fetch dataset metadata, download dataset files, and publish new
//! dataset versions from multipart uploads.

mod handlers;
mod response;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use datashelf_core::{AppConfig, DatasetCatalog, PathsConfig, PublisherConfig};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, Layer, Registry};

#[derive(Parser, Debug)]
#[command(name = "datashelf-server")]
#[command(about = "HTTP server for the Datashelf dataset catalog")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = AppConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory holding datasets.json and uploaded files
    #[arg(long, default_value = PathsConfig::DATA_DIR_NAME)]
    data_dir: PathBuf,

    /// Publisher configuration file
    #[arg(long, default_value = AppConfig::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Maximum accepted request body, in MiB
    #[arg(long, default_value = "1024")]
    max_upload_mb: usize,

    /// Per-request timeout, in seconds
    #[arg(long, default_value = "300")]
    request_timeout_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// File receiving a JSON copy of every log line
    #[arg(long, default_value = AppConfig::DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log to stdout only
    #[arg(long)]
    no_log_file: bool,
}

/// Install stdout logging plus the optional JSON log file.
fn init_logging(args: &Args) -> Result<()> {
    let level = LevelFilter::from_level(if args.debug { Level::DEBUG } else { Level::INFO });
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let stdout = fmt::layer().with_target(false).with_thread_ids(false);
    if args.log_json {
        layers.push(stdout.json().with_filter(level).boxed());
    } else {
        layers.push(stdout.compact().with_filter(level).boxed());
    }

    if !args.no_log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log_file)
            .with_context(|| format!("opening log file {}", args.log_file.display()))?;
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .json()
                .with_filter(level)
                .boxed(),
        );
    }

    tracing_subscriber::registry().with(layers).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("Starting Datashelf server");

    let publisher = PublisherConfig::load(&args.config)
        .with_context(|| format!("loading publisher config {}", args.config.display()))?;
    info!(
        "Publishing as {} ({}) on {}",
        publisher.creator_name, publisher.creator_uuid, publisher.cloud_name
    );

    let catalog = DatasetCatalog::open(&args.data_dir, publisher)
        .with_context(|| format!("opening data directory {}", args.data_dir.display()))?;
    info!(
        "Loaded {} datasets from {}",
        catalog.store().len().await,
        args.data_dir.display()
    );

    let options = server::ServerOptions {
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    };

    let addr = server::start_server(catalog, options, &args.host, args.port).await?;

    // Port discovery line for supervisors and tests (intentional stdout)
    println!("LISTENING_PORT={}", addr.port());

    info!("Datashelf server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
