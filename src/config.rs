//! Configuration file handling.
//!
//! This module handles loading `.accelstat.toml`, merging CLI overrides and
//! validating the result into the immutable [`SensorSettings`] a running
//! instance uses.

use crate::error::ConfigError;
use crate::models::{SampleMode, Units};
use crate::sensor::{adxl345, ChipType, Range};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = ".accelstat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sensor settings.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Sampling settings.
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Settings for the standalone runner.
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Which chip to talk to and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Chip driver.
    #[serde(default)]
    pub chip: ChipType,

    /// 7-bit bus address.
    #[serde(default = "default_address")]
    pub address: u16,

    /// I2C device node.
    #[serde(default = "default_bus")]
    pub bus: PathBuf,

    /// Full-scale range in g (2, 4, 8 or 16).
    #[serde(default = "default_range")]
    pub range: u8,

    /// Units of reported values.
    #[serde(default)]
    pub units: Units,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            chip: ChipType::default(),
            address: default_address(),
            bus: default_bus(),
            range: default_range(),
            units: Units::default(),
        }
    }
}

fn default_address() -> u16 {
    u16::from(adxl345::DEFAULT_ADDRESS)
}

fn default_bus() -> PathBuf {
    PathBuf::from("/dev/i2c-1")
}

fn default_range() -> u8 {
    2
}

/// How often to sample and how to summarize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Sampling period in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Summary mode.
    #[serde(default)]
    pub mode: SampleMode,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            mode: SampleMode::default(),
        }
    }
}

fn default_interval_ms() -> u64 {
    50
}

/// Where results land on each signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Field name the summary is attached under.
    #[serde(default = "default_field")]
    pub field: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            field: default_field(),
        }
    }
}

fn default_field() -> String {
    "accelerometer".to_string()
}

/// Standalone runner pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Period between emitted signals in milliseconds.
    #[serde(default = "default_trigger_ms")]
    pub trigger_ms: u64,

    /// Stop after this many signals (runs until Ctrl-C when unset).
    #[serde(default)]
    pub count: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            trigger_ms: default_trigger_ms(),
            count: None,
        }
    }
}

fn default_trigger_ms() -> u64 {
    1000
}

/// Validated, immutable settings for one running instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSettings {
    pub chip: ChipType,
    pub address: u8,
    pub bus: PathBuf,
    pub range: Range,
    pub units: Units,
    pub interval: Duration,
    pub mode: SampleMode,
    pub field: String,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load [`DEFAULT_CONFIG_FILE`] from `dir`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let default_path = dir.join(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(&default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(chip) = args.chip {
            self.sensor.chip = chip;
        }
        if let Some(address) = args.address {
            self.sensor.address = address;
        }
        if let Some(ref bus) = args.bus {
            self.sensor.bus = bus.clone();
        }
        if let Some(range) = args.range {
            self.sensor.range = range;
        }
        if let Some(units) = args.units {
            self.sensor.units = units;
        }

        if let Some(interval) = args.interval_ms {
            self.sampling.interval_ms = interval;
        }
        if let Some(mode) = args.mode {
            self.sampling.mode = mode;
        }

        if let Some(ref field) = args.field {
            self.output.field = field.clone();
        }

        if let Some(trigger) = args.trigger_ms {
            self.runner.trigger_ms = trigger;
        }
        if args.count.is_some() {
            self.runner.count = args.count;
        }
    }

    /// Check every value and freeze the result.
    pub fn validate(&self) -> Result<SensorSettings, ConfigError> {
        let range = Range::try_from(self.sensor.range)?;

        let address = u8::try_from(self.sensor.address)
            .ok()
            .filter(|a| *a <= 0x7F)
            .ok_or(ConfigError::InvalidAddress(self.sensor.address))?;

        if self.sampling.interval_ms == 0 || self.runner.trigger_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let field = self.output.field.trim();
        if field.is_empty() {
            return Err(ConfigError::EmptyField);
        }

        Ok(SensorSettings {
            chip: self.sensor.chip,
            address,
            bus: self.sensor.bus.clone(),
            range,
            units: self.sensor.units,
            interval: Duration::from_millis(self.sampling.interval_ms),
            mode: self.sampling.mode,
            field: field.to_string(),
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
