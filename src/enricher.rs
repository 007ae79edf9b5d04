//! Signal enrichment lifecycle.
//!
//! [`SignalEnricher`] is what a host drives: configure once, start and stop
//! around the sampling task, and call [`SignalEnricher::process_signals`] for
//! every batch of inbound signals.

use crate::analysis::Aggregator;
use crate::config::SensorSettings;
use crate::error::AggregateError;
use crate::models::{SampleMode, Signal};
use crate::sampler::{SampleBuffer, Sampler, SamplerHealth};
use crate::sensor::{self, Sensor};
use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Configured,
    Running,
    Stopped,
}

pub struct SignalEnricher {
    settings: SensorSettings,
    aggregator: Aggregator,
    /// Stats-mode sensor waiting to be handed to the sampler.
    idle_sensor: Option<Box<dyn Sensor>>,
    sampler: Option<Sampler>,
    state: State,
}

impl SignalEnricher {
    /// Open the configured driver and prepare the aggregator for `settings.mode`.
    pub fn configure(settings: SensorSettings) -> Result<Self> {
        let sensor = sensor::open_sensor(&settings)
            .with_context(|| format!("Failed to open {} sensor", settings.chip))?;
        Ok(Self::with_sensor(settings, sensor))
    }

    /// Build around an already opened sensor.
    pub fn with_sensor(settings: SensorSettings, sensor: Box<dyn Sensor>) -> Self {
        let (aggregator, idle_sensor) = match settings.mode {
            SampleMode::Last => (Aggregator::Last(sensor), None),
            SampleMode::Stats => (Aggregator::Stats(SampleBuffer::new()), Some(sensor)),
        };

        debug!(
            "Configured {} mode, enriching field '{}'",
            settings.mode, settings.field
        );

        Self {
            settings,
            aggregator,
            idle_sensor,
            sampler: None,
            state: State::Configured,
        }
    }

    pub fn settings(&self) -> &SensorSettings {
        &self.settings
    }

    /// Sampler progress, if one is running or has run.
    pub fn health(&self) -> Option<SamplerHealth> {
        self.sampler.as_ref().map(Sampler::health)
    }

    /// Start background sampling (Stats mode). Must run inside a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            State::Running => bail!("Enricher is already running"),
            State::Stopped => bail!("Enricher was stopped and cannot be restarted"),
            State::Configured => {}
        }

        if let (Some(sensor), Aggregator::Stats(buffer)) =
            (self.idle_sensor.take(), &self.aggregator)
        {
            self.sampler = Some(Sampler::start(
                self.settings.interval,
                sensor,
                buffer.clone(),
            ));
        }

        self.state = State::Running;
        info!("Accelerometer enricher started ({} mode)", self.aggregator.mode());
        Ok(())
    }

    /// Stop background sampling. Safe to call more than once.
    pub async fn stop(&mut self) {
        if let Some(sampler) = self.sampler.as_mut() {
            sampler.stop().await;
        }
        if let Aggregator::Stats(buffer) = &self.aggregator {
            debug!("{} readings left undrained", buffer.len());
        }
        if self.state != State::Stopped {
            self.state = State::Stopped;
            info!("Accelerometer enricher stopped");
        }
    }

    /// Run one aggregation and attach it to every signal.
    ///
    /// With nothing buffered the batch is dropped and an empty vector is
    /// returned. Sensor failures are returned to the caller.
    pub fn process_signals(&mut self, mut signals: Vec<Signal>) -> Result<Vec<Signal>> {
        let value = match self.aggregator.aggregate() {
            Ok(value) => value,
            Err(AggregateError::EmptyBuffer) => {
                warn!("Accelerometer has no samples!");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).context("Failed to read accelerometer"),
        };

        for signal in &mut signals {
            signal
                .enrich(&self.settings.field, &value)
                .context("Failed to serialize accelerometer value")?;
        }

        Ok(signals)
    }
}
