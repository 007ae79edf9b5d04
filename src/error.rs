//! Error types for sampling, aggregation and configuration.
//!
//! Sensor and aggregation failures are typed so callers can tell a
//! recoverable condition (an empty buffer, a flaky bus read) apart from a
//! fatal one (an unsupported range at configure time).

use thiserror::Error;

/// Failures reported by a sensor driver.
#[derive(Debug, Error)]
pub enum SensorError {
    /// A bus transaction failed during a read or register write.
    #[error("sensor I/O error: {0}")]
    Io(String),

    /// The requested sensitivity range is not one of 2, 4, 8 or 16 g.
    #[error("invalid range {0}g (supported: 2, 4, 8, 16)")]
    InvalidRange(u8),

    /// The device at the configured address did not identify as expected.
    #[error("unexpected device id 0x{found:02X} (expected 0x{expected:02X})")]
    UnexpectedDevice { expected: u8, found: u8 },
}

/// Failures returned by a single aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Stats mode found nothing in the buffer since the last drain.
    #[error("no samples available")]
    EmptyBuffer,

    /// Last mode could not read the sensor.
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

/// Configuration rejected before anything is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Range(#[from] SensorError),

    #[error("sampling and trigger intervals must be at least 1ms")]
    ZeroInterval,

    #[error("I2C address 0x{0:02X} is outside the 7-bit range")]
    InvalidAddress(u16),

    #[error("output field name must not be empty")]
    EmptyField,
}
