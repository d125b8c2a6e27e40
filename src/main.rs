//! # Position Logger
//!
//! Logs aircraft position from a flight simulator's streaming text files to CSV.
//!
//! Every poll interval the latitude, longitude and altitude files are read and
//! appended to the position log as one timestamped row.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use position_logger::config::{Config, LoggingConfig};
use position_logger::poller::Poller;
use position_logger::telemetry::{CsvLog, FileSource};

/// Config file read when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the daily diagnostics log
const DIAGNOSTICS_FILE_PREFIX: &str = "position-logger.log";

#[derive(Debug, Parser)]
#[command(name = "position-logger")]
#[command(version, about = "Log flight-sim position telemetry to CSV")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,
}

/// Main entry point for Position Logger
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Parse command line and load configuration (built-in defaults if the
///      file is absent)
///    - Set up logging with tracing subscriber
///    - Create the position log with its header if needed
///
/// 2. **Main Loop**
///    - Read lat/lon/altitude, append a row, apply retention
///    - Sleep for the poll interval
///    - Ctrl+C or SIGTERM stops the loop between or during sleeps
///
/// 3. **Graceful Shutdown**
///    - Log cycle totals
///    - Flush diagnostics and exit
///
/// # Errors
///
/// Returns error if the configuration is invalid or the position log cannot
/// be created. Failures inside a poll cycle are logged and do not stop the
/// process.
///
/// # Examples
///
/// ```bash
/// cargo run --release -- --config config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO position_logger: Position Logger v0.1.0 starting...
/// INFO position_logger::poller: Polling every 60s into ./logs/data_log.csv (retention: 100 rows)
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_found = cli.config.exists();
    let config = if config_found {
        Config::load(&cli.config)
            .with_context(|| format!("Failed to load config from {}", cli.config.display()))?
    } else {
        Config::default()
    };

    let _guard = init_logging(&config.logging);

    info!("Position Logger v{} starting...", env!("CARGO_PKG_VERSION"));
    if !config_found {
        warn!("Config file {} not found, using built-in defaults", cli.config.display());
    }
    info!("Reading telemetry from {}", config.source.dir);

    let source = FileSource::from_config(&config.source);
    let log = CsvLog::from_config(&config.log);
    let mut poller = Poller::new(source, log, config.poll.interval());

    if cli.once {
        poller.log().ensure_initialized()?;
        let sample = poller.poll_once()?;
        info!(
            "Logged {} lat={} lon={} alt={}",
            sample.timestamp, sample.latitude, sample.longitude, sample.altitude
        );
        return Ok(());
    }

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("Shutdown requested, stopping after current cycle...");
        let _ = stop.send(true);
    });

    info!("Press Ctrl+C to exit");
    let stats = poller.run_forever(shutdown).await?;

    info!(
        "Stopped after {} cycle(s): {} logged, {} failed",
        stats.cycles,
        stats.logged,
        stats.failures
    );

    Ok(())
}

/// Console logging plus an optional daily-rolling file.
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// flushes the file writer on drop and must live until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = if config.dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.dir, DIAGNOSTICS_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
