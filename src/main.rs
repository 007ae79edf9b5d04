//! accelstat - continuous accelerometer sampling with magnitude statistics
//!
//! Samples a three-axis accelerometer in the background and, once per
//! trigger period, emits a signal enriched with statistics over everything
//! sampled since the previous signal.
//!
//! Exit codes:
//!   0 - Success (count reached or interrupted)
//!   1 - Runtime error (invalid configuration, sensor unavailable, etc.)

mod analysis;
mod cli;
mod config;
mod enricher;
mod error;
mod models;
mod report;
mod sampler;
mod sensor;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, RunnerConfig, DEFAULT_CONFIG_FILE};
use enricher::SignalEnricher;
use models::Signal;
use std::path::Path;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("accelstat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("accelstat failed: {:#}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .accelstat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging on stderr; RUST_LOG takes precedence over -v/-q.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(args.log_level().into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Configure, start, emit signals until done, then stop.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args, Path::new("."))?;
    config.merge_with_args(&args);

    let settings = config.validate().context("Invalid configuration")?;
    info!(
        "Sensor: {} at 0x{:02X}, {} range, {}ms interval, {} mode",
        settings.chip,
        settings.address,
        settings.range,
        settings.interval.as_millis(),
        settings.mode
    );

    let mut enricher = SignalEnricher::configure(settings)?;
    enricher.start()?;

    let result = emit_signals(&mut enricher, &config.runner, args.format).await;

    enricher.stop().await;
    if let Some(health) = enricher.health() {
        info!(
            "Sampled {} readings over {} ticks ({} failed)",
            health.appended, health.ticks, health.failures
        );
    }
    result
}

/// Emit one signal per trigger period until the count is reached or Ctrl-C.
async fn emit_signals(
    enricher: &mut SignalEnricher,
    runner: &RunnerConfig,
    format: OutputFormat,
) -> Result<()> {
    let mut timer = tokio::time::interval(Duration::from_millis(runner.trigger_ms));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; let one full period accumulate.
    timer.tick().await;

    let field = enricher.settings().field.clone();
    let units = enricher.settings().units;
    let stdout = std::io::stdout();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut seq: u64 = 0;
    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, shutting down");
                break;
            }
            _ = timer.tick() => {}
        }

        seq += 1;
        let signal = Signal::new()
            .with("seq", seq)
            .with("timestamp", Utc::now().to_rfc3339());

        match enricher.process_signals(vec![signal]) {
            Ok(enriched) => {
                let mut out = stdout.lock();
                for signal in &enriched {
                    report::write_signal(&mut out, signal, format, &field, units)?;
                }
            }
            Err(e) => warn!("Signal {} not enriched: {:#}", seq, e),
        }

        if runner.count.is_some_and(|count| seq >= count) {
            debug!("Emitted {} signals, done", seq);
            break;
        }
    }

    Ok(())
}

/// Load configuration from `--config`, else from `dir`, else use defaults.
///
/// A config file that exists but fails to parse is an error either way.
fn load_config(args: &Args, dir: &Path) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_from_dir(dir).context("Invalid default configuration")? {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
