//! Data models for accelerometer sampling.
//!
//! This module contains the reading, statistics and signal types shared by
//! the sampler, the aggregator and the enrichment surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One three-axis acceleration sample.
///
/// Serialized as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Reading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Reading {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm of the three components.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl From<[f64; 3]> for Reading {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Reading> for [f64; 3] {
    fn from(r: Reading) -> Self {
        [r.x, r.y, r.z]
    }
}

impl From<(f64, f64, f64)> for Reading {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

/// How each inbound signal is summarized.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SampleMode {
    /// Read the sensor on demand and report that single reading.
    Last,
    /// Summarize everything sampled since the previous signal.
    #[default]
    Stats,
}

impl fmt::Display for SampleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleMode::Last => write!(f, "last"),
            SampleMode::Stats => write!(f, "stats"),
        }
    }
}

/// Unit of the values a driver reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Standard gravities.
    G,
    /// Metres per second squared.
    #[default]
    Ms2,
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::G => write!(f, "g"),
            Units::Ms2 => write!(f, "m/s²"),
        }
    }
}

/// Output of a Last-mode aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastReading {
    pub last: Reading,
    pub last_magnitude: f64,
}

impl LastReading {
    pub fn from_reading(reading: Reading) -> Self {
        Self {
            last_magnitude: reading.magnitude(),
            last: reading,
        }
    }
}

/// Magnitude summary over one drained batch of readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeStats {
    /// Reading with the largest magnitude (first one on ties).
    pub max: Reading,
    /// Reading with the smallest magnitude (first one on ties).
    pub min: Reading,
    /// Arithmetic mean of all magnitudes.
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two readings.
    pub stdev: Option<f64>,
    /// Most recently appended reading.
    pub last: Reading,
    pub last_magnitude: f64,
    pub max_magnitude: f64,
    pub min_magnitude: f64,
    /// Number of readings summarized.
    pub count: usize,
}

/// Value attached to a signal under the configured field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccelValue {
    Stats(MagnitudeStats),
    Last(LastReading),
}

/// One inbound unit of work flowing through the enricher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signal(pub Map<String, Value>);

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set `field` to the serialized value, replacing anything already there.
    pub fn enrich(&mut self, field: &str, value: &AccelValue) -> serde_json::Result<()> {
        self.0.insert(field.to_string(), serde_json::to_value(value)?);
        Ok(())
    }
}
