//! Synthetic accelerometer.
//!
//! Produces gravity on the z axis plus a slow vibration on x and y, clipped
//! to the configured range. A scripted variant replays a fixed sequence and
//! can inject bus failures.

use super::{Range, Sensor};
use crate::error::SensorError;
use crate::models::{Reading, Units};

const EARTH_GRAVITY_MS2: f64 = 9.80665;
const VIBRATION_G: f64 = 0.25;
const PHASE_STEP: f64 = 0.3;

enum Source {
    Wave { tick: u64 },
    /// `None` entries fail with an I/O error. The script repeats.
    Script { steps: Vec<Option<Reading>>, next: usize },
}

pub struct SimulatedSensor {
    source: Source,
    units: Units,
    range: Range,
}

impl SimulatedSensor {
    pub fn new(units: Units) -> Self {
        Self {
            source: Source::Wave { tick: 0 },
            units,
            range: Range::default(),
        }
    }

    /// Replay `steps` in order, wrapping around at the end.
    #[allow(dead_code)] // Used to drive sampler and aggregator tests
    pub fn scripted(steps: Vec<Option<Reading>>) -> Self {
        Self {
            source: Source::Script { steps, next: 0 },
            units: Units::G,
            range: Range::G16,
        }
    }

    /// A sensor whose every read fails.
    #[allow(dead_code)] // Used to drive sampler and aggregator tests
    pub fn failing() -> Self {
        Self::scripted(vec![None])
    }

    fn scale(&self) -> f64 {
        match self.units {
            Units::G => 1.0,
            Units::Ms2 => EARTH_GRAVITY_MS2,
        }
    }

    fn clip(&self, value: f64) -> f64 {
        let limit = f64::from(self.range.g()) * self.scale();
        value.clamp(-limit, limit)
    }
}

impl Sensor for SimulatedSensor {
    fn read(&mut self) -> Result<Reading, SensorError> {
        let raw = match &mut self.source {
            Source::Wave { tick } => {
                let phase = *tick as f64 * PHASE_STEP;
                *tick += 1;
                Reading::new(
                    VIBRATION_G * phase.sin(),
                    VIBRATION_G * 0.5 * phase.cos(),
                    1.0,
                )
            }
            Source::Script { steps, next } => {
                if steps.is_empty() {
                    return Err(SensorError::Io("empty script".to_string()));
                }
                let step = steps[*next % steps.len()];
                *next += 1;
                match step {
                    Some(reading) => return Ok(reading),
                    None => return Err(SensorError::Io("simulated bus failure".to_string())),
                }
            }
        };

        let scale = self.scale();
        Ok(Reading::new(
            self.clip(raw.x * scale),
            self.clip(raw.y * scale),
            self.clip(raw.z * scale),
        ))
    }

    fn set_range(&mut self, range: Range) -> Result<(), SensorError> {
        self.range = range;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_reports_gravity() {
        let mut sensor = SimulatedSensor::new(Units::G);
        let first = sensor.read().unwrap();
        assert_eq!(first.z, 1.0);
        assert_eq!(first.x, 0.0);

        let mut sensor = SimulatedSensor::new(Units::Ms2);
        assert_eq!(sensor.read().unwrap().z, EARTH_GRAVITY_MS2);
    }

    #[test]
    fn test_wave_varies_between_reads() {
        let mut sensor = SimulatedSensor::new(Units::G);
        let a = sensor.read().unwrap();
        let b = sensor.read().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_script_replays_and_fails() {
        let r = Reading::new(1.0, 2.0, 3.0);
        let mut sensor = SimulatedSensor::scripted(vec![Some(r), None]);

        assert_eq!(sensor.read().unwrap(), r);
        assert!(matches!(sensor.read(), Err(SensorError::Io(_))));
        assert_eq!(sensor.read().unwrap(), r);
    }

    #[test]
    fn test_failing_always_fails() {
        let mut sensor = SimulatedSensor::failing();
        for _ in 0..3 {
            assert!(sensor.read().is_err());
        }
    }
}
