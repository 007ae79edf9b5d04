//! Magnitude statistics over drained readings.
//!
//! This module turns a batch of readings into a [`MagnitudeStats`] summary
//! and provides the [`Aggregator`] that produces one value per trigger.

use crate::error::AggregateError;
use crate::models::{AccelValue, LastReading, MagnitudeStats, Reading, SampleMode};
use crate::sampler::SampleBuffer;
use crate::sensor::Sensor;
use tracing::debug;

/// Magnitude of every reading, in order.
pub fn magnitudes(readings: &[Reading]) -> Vec<f64> {
    readings.iter().map(Reading::magnitude).collect()
}

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation around `mean`. Undefined below two values.
pub fn sample_stdev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Index of the largest value; the earliest one wins ties.
pub fn first_max_index(values: &[f64]) -> Option<usize> {
    first_extreme(values, |candidate, best| candidate > best)
}

/// Index of the smallest value; the earliest one wins ties.
pub fn first_min_index(values: &[f64]) -> Option<usize> {
    first_extreme(values, |candidate, best| candidate < best)
}

fn first_extreme(values: &[f64], replaces: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if !replaces(v, values[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Summarize a batch. `None` when there is nothing to summarize.
pub fn summarize(readings: &[Reading]) -> Option<MagnitudeStats> {
    let last = *readings.last()?;
    let mags = magnitudes(readings);

    let max_i = first_max_index(&mags)?;
    let min_i = first_min_index(&mags)?;
    let mean = mean(&mags)?;

    Some(MagnitudeStats {
        max: readings[max_i],
        min: readings[min_i],
        mean,
        stdev: sample_stdev(&mags, mean),
        last,
        last_magnitude: mags[mags.len() - 1],
        max_magnitude: mags[max_i],
        min_magnitude: mags[min_i],
        count: readings.len(),
    })
}

/// Produces one value per trigger.
///
/// Each mode owns exactly the resource it reads: the sensor in Last mode,
/// the drain side of the buffer in Stats mode.
pub enum Aggregator {
    Last(Box<dyn Sensor>),
    Stats(SampleBuffer),
}

impl Aggregator {
    pub fn mode(&self) -> SampleMode {
        match self {
            Aggregator::Last(_) => SampleMode::Last,
            Aggregator::Stats(_) => SampleMode::Stats,
        }
    }

    pub fn aggregate(&mut self) -> Result<AccelValue, AggregateError> {
        match self {
            Aggregator::Last(sensor) => {
                let reading = sensor.read()?;
                Ok(AccelValue::Last(LastReading::from_reading(reading)))
            }
            Aggregator::Stats(buffer) => {
                let batch = buffer.drain();
                debug!("Drained {} readings", batch.len());
                summarize(&batch)
                    .map(AccelValue::Stats)
                    .ok_or(AggregateError::EmptyBuffer)
            }
        }
    }
}
