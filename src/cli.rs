//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Sensor and sampling flags are optional so that
//! values from `.accelstat.toml` survive unless overridden.

use crate::models::{SampleMode, Units};
use crate::sensor::ChipType;
use clap::Parser;
use std::path::PathBuf;

/// accelstat - continuous accelerometer sampling with magnitude statistics
///
/// Samples a three-axis accelerometer in the background and, once per
/// trigger period, emits a signal enriched with max/min/mean/stdev of the
/// acceleration magnitude collected since the previous one.
///
/// Examples:
///   accelstat
///   accelstat --mode last --trigger-ms 200
///   accelstat --chip adxl345 --bus /dev/i2c-1 --range 8 --format text
///   accelstat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .accelstat.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sensor chip driver
    #[arg(long, env = "ACCELSTAT_CHIP")]
    pub chip: Option<ChipType>,

    /// I2C device node for hardware chips
    #[arg(long, value_name = "PATH", env = "ACCELSTAT_BUS")]
    pub bus: Option<PathBuf>,

    /// 7-bit I2C address (decimal or 0x-prefixed hex)
    #[arg(long, value_name = "ADDR", value_parser = parse_address)]
    pub address: Option<u16>,

    /// Sampling period in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Summary mode (stats: buffered statistics, last: on-demand reading)
    #[arg(long, value_name = "MODE")]
    pub mode: Option<SampleMode>,

    /// Full-scale range in g (2, 4, 8, 16)
    #[arg(long, value_name = "G")]
    pub range: Option<u8>,

    /// Units of reported values
    #[arg(long)]
    pub units: Option<Units>,

    /// Field name the summary is attached under
    #[arg(long, value_name = "NAME")]
    pub field: Option<String>,

    /// Period between emitted signals in milliseconds
    #[arg(long, value_name = "MS")]
    pub trigger_ms: Option<u64>,

    /// Stop after emitting this many signals
    #[arg(long, value_name = "N")]
    pub count: Option<u64>,

    /// Output format (json, text)
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .accelstat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for enriched signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line (default)
    #[default]
    Json,
    /// Compact human-readable line
    Text,
}

fn parse_address(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.interval_ms == Some(0) {
            return Err("Sampling interval must be at least 1ms".to_string());
        }

        if self.trigger_ms == Some(0) {
            return Err("Trigger period must be at least 1ms".to_string());
        }

        if self.count == Some(0) {
            return Err("Count must be at least 1".to_string());
        }

        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                return Err(format!(
                    "Config file does not exist: {}",
                    config_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: None,
            chip: None,
            bus: None,
            address: None,
            interval_ms: None,
            mode: None,
            range: None,
            units: None,
            field: None,
            trigger_ms: None,
            count: None,
            format: OutputFormat::Json,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "accelstat",
            "--mode",
            "last",
            "--address",
            "0x1d",
            "--range",
            "8",
            "--format",
            "text",
        ])
        .unwrap();

        assert_eq!(args.mode, Some(SampleMode::Last));
        assert_eq!(args.address, Some(0x1D));
        assert_eq!(args.range, Some(8));
        assert_eq!(args.format, OutputFormat::Text);
        assert!(args.interval_ms.is_none());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("83"), Ok(83));
        assert_eq!(parse_address("0x53"), Ok(0x53));
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_values() {
        let mut args = make_args();
        args.interval_ms = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.count = Some(0);
        assert!(args.validate().is_err());

        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
