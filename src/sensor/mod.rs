//! Accelerometer drivers.
//!
//! Every chip implements [`Sensor`]. The set of chips is closed: adding one
//! means adding a [`ChipType`] variant and a match arm in [`open_sensor`].

// Only reachable from `open_sensor` with a Linux bus; always built for its tests.
#[cfg_attr(not(feature = "linux-i2c"), allow(dead_code))]
pub mod adxl345;
pub mod simulated;

#[cfg(feature = "linux-i2c")]
pub use adxl345::Adxl345;
pub use simulated::SimulatedSensor;

use crate::config::SensorSettings;
use crate::error::SensorError;
use crate::models::Reading;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Capabilities the sampler and aggregator need from a chip.
pub trait Sensor: Send {
    /// Poll the three axes once.
    fn read(&mut self) -> Result<Reading, SensorError>;

    /// Change the full-scale sensitivity.
    fn set_range(&mut self, range: Range) -> Result<(), SensorError>;

    /// Short chip name for logs.
    fn name(&self) -> &'static str;
}

/// Full-scale sensitivity range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Range {
    #[default]
    G2,
    G4,
    G8,
    G16,
}

impl Range {
    /// Range in standard gravities.
    pub const fn g(self) -> u8 {
        match self {
            Range::G2 => 2,
            Range::G4 => 4,
            Range::G8 => 8,
            Range::G16 => 16,
        }
    }
}

impl TryFrom<u8> for Range {
    type Error = SensorError;

    fn try_from(g: u8) -> Result<Self, Self::Error> {
        match g {
            2 => Ok(Range::G2),
            4 => Ok(Range::G4),
            8 => Ok(Range::G8),
            16 => Ok(Range::G16),
            other => Err(SensorError::InvalidRange(other)),
        }
    }
}

impl From<Range> for u8 {
    fn from(range: Range) -> Self {
        range.g()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}g", self.g())
    }
}

/// Supported chips.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ChipType {
    /// Analog Devices ADXL345 on a Linux I2C bus.
    Adxl345,
    /// Synthetic source, no hardware needed.
    #[default]
    Simulated,
}

impl fmt::Display for ChipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChipType::Adxl345 => write!(f, "ADXL345"),
            ChipType::Simulated => write!(f, "simulated"),
        }
    }
}

/// Open and configure the driver selected by `settings`.
///
/// The range is applied before returning; a rejected range is fatal.
pub fn open_sensor(settings: &SensorSettings) -> Result<Box<dyn Sensor>> {
    let mut sensor: Box<dyn Sensor> = match settings.chip {
        ChipType::Adxl345 => open_adxl345(settings)?,
        ChipType::Simulated => Box::new(SimulatedSensor::new(settings.units)),
    };

    sensor
        .set_range(settings.range)
        .with_context(|| format!("Failed to set {} range on {}", settings.range, sensor.name()))?;

    info!(
        "Opened {} sensor at 0x{:02X} ({}, {})",
        sensor.name(),
        settings.address,
        settings.range,
        settings.units
    );
    Ok(sensor)
}

#[cfg(feature = "linux-i2c")]
fn open_adxl345(settings: &SensorSettings) -> Result<Box<dyn Sensor>> {
    let bus = linux_embedded_hal::I2cdev::new(&settings.bus)
        .with_context(|| format!("Failed to open I2C bus {}", settings.bus.display()))?;

    let mut chip = Adxl345::new(bus, settings.address, settings.units);
    chip.init(settings.range)
        .context("Failed to initialize ADXL345")?;
    Ok(Box::new(chip))
}

#[cfg(not(feature = "linux-i2c"))]
fn open_adxl345(_settings: &SensorSettings) -> Result<Box<dyn Sensor>> {
    anyhow::bail!("ADXL345 support requires building with the `linux-i2c` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_range_try_from() {
        assert_eq!(Range::try_from(2).unwrap(), Range::G2);
        assert_eq!(Range::try_from(16).unwrap(), Range::G16);
        assert!(matches!(
            Range::try_from(3),
            Err(SensorError::InvalidRange(3))
        ));
        assert!(Range::try_from(0).is_err());
        assert!(Range::try_from(32).is_err());
    }

    #[test]
    fn test_range_serde() {
        let range: Range = serde_json::from_str("8").unwrap();
        assert_eq!(range, Range::G8);
        assert_eq!(serde_json::to_string(&Range::G4).unwrap(), "4");
        assert!(serde_json::from_str::<Range>("5").is_err());
    }

    #[test]
    fn test_open_simulated() {
        let settings = Config::default().validate().unwrap();
        let mut sensor = open_sensor(&settings).unwrap();
        assert_eq!(sensor.name(), "simulated");
        assert!(sensor.read().is_ok());
    }

    #[cfg(not(feature = "linux-i2c"))]
    #[test]
    fn test_adxl345_needs_feature() {
        let mut config = Config::default();
        config.sensor.chip = ChipType::Adxl345;
        let settings = config.validate().unwrap();
        let err = open_sensor(&settings).err().unwrap();
        assert!(err.to_string().contains("linux-i2c"));
    }
}
