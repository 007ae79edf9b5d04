//! Background sampling of the accelerometer.
//!
//! A [`Sampler`] owns the sensor inside a tokio task that polls it on a fixed
//! period and appends each reading to a [`SampleBuffer`]. Stopping signals the
//! task and waits for it to finish, so no append can happen after
//! [`Sampler::stop`] returns.

pub mod buffer;

pub use buffer::SampleBuffer;

use crate::error::SensorError;
use crate::models::Reading;
use crate::sensor::Sensor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Consecutive failed reads after which the sensor is reported offline.
pub const OFFLINE_THRESHOLD: u64 = 20;

/// Counters updated by the sampling task.
#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    appended: AtomicU64,
    failures: AtomicU64,
    consecutive_failures: AtomicU64,
}

/// Point-in-time view of the sampling task's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerHealth {
    pub ticks: u64,
    pub appended: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
}

impl Counters {
    fn snapshot(&self) -> SamplerHealth {
        SamplerHealth {
            ticks: self.ticks.load(Ordering::Relaxed),
            appended: self.appended.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running sampling task.
pub struct Sampler {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<Option<Box<dyn Sensor>>>>,
    counters: Arc<Counters>,
}

impl Sampler {
    /// Spawn the sampling task on the current tokio runtime.
    ///
    /// The first reading is taken immediately, then one per `interval`.
    pub fn start(interval: Duration, sensor: Box<dyn Sensor>, buffer: SampleBuffer) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let counters = Arc::new(Counters::default());

        info!(
            "Starting sampler for {} every {}ms",
            sensor.name(),
            interval.as_millis()
        );
        let task = tokio::spawn(run(interval, sensor, buffer, signal, counters.clone()));

        Self {
            shutdown,
            task: Some(task),
            counters,
        }
    }

    #[allow(dead_code)] // Status accessor for hosts polling the task
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn health(&self) -> SamplerHealth {
        self.counters.snapshot()
    }

    /// Stop sampling and wait for the task to exit.
    ///
    /// Returns the sensor on the first call; later calls return `None`, as
    /// does a sampler whose sensor panicked mid-read.
    pub async fn stop(&mut self) -> Option<Box<dyn Sensor>> {
        let task = self.task.take()?;
        // The receiver is gone only if the task already exited.
        let _ = self.shutdown.send(true);

        match task.await {
            Ok(sensor) => {
                let health = self.health();
                info!(
                    "Sampler stopped after {} ticks ({} samples, {} failed reads)",
                    health.ticks, health.appended, health.failures
                );
                if health.consecutive_failures > 0 {
                    warn!(
                        "Sensor was still failing at shutdown ({} consecutive failed reads)",
                        health.consecutive_failures
                    );
                }
                sensor
            }
            Err(e) => {
                error!("Sampler task ended abnormally: {}", e);
                None
            }
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!("Sampler dropped while running, aborting task");
            task.abort();
        }
    }
}

async fn run(
    interval: Duration,
    mut sensor: Box<dyn Sensor>,
    buffer: SampleBuffer,
    mut shutdown: watch::Receiver<bool>,
    counters: Arc<Counters>,
) -> Option<Box<dyn Sensor>> {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = timer.tick() => {}
        }

        // Bus reads block, so they run on the blocking pool.
        let read = tokio::task::spawn_blocking(move || {
            let result = sensor.read();
            (sensor, result)
        });
        match read.await {
            Ok((returned, result)) => {
                sensor = returned;
                record(sensor.name(), result, &buffer, &counters);
            }
            Err(e) => {
                error!("Sensor read task failed, sensor lost: {}", e);
                return None;
            }
        }
    }

    debug!("Sampling loop exited");
    Some(sensor)
}

fn record(
    name: &str,
    result: Result<Reading, SensorError>,
    buffer: &SampleBuffer,
    counters: &Counters,
) {
    counters.ticks.fetch_add(1, Ordering::Relaxed);

    match result {
        Ok(reading) => {
            buffer.append(reading);
            counters.appended.fetch_add(1, Ordering::Relaxed);

            let missed = counters.consecutive_failures.swap(0, Ordering::Relaxed);
            if missed >= OFFLINE_THRESHOLD {
                info!("{} sensor recovered after {} failed reads", name, missed);
            }
        }
        Err(e) => {
            counters.failures.fetch_add(1, Ordering::Relaxed);
            let streak = counters.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;

            if streak < OFFLINE_THRESHOLD {
                warn!("Sensor read failed, skipping sample: {}", e);
            } else if streak == OFFLINE_THRESHOLD {
                error!(
                    "{} sensor unresponsive for {} consecutive reads: {}",
                    name, streak, e
                );
            } else {
                debug!("Sensor read failed ({} in a row): {}", streak, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SimulatedSensor;
    use tokio::time::{sleep, timeout};

    fn counting_script(n: usize) -> SimulatedSensor {
        SimulatedSensor::scripted(
            (0..n)
                .map(|i| Some(Reading::new(i as f64, 0.0, 0.0)))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_sampler_fills_buffer_in_order() {
        let buffer = SampleBuffer::new();
        let mut sampler = Sampler::start(
            Duration::from_millis(2),
            Box::new(counting_script(100_000)),
            buffer.clone(),
        );

        sleep(Duration::from_millis(50)).await;
        assert!(sampler.is_running());
        assert!(sampler.stop().await.is_some());

        let drained = buffer.drain();
        assert!(!drained.is_empty());
        for (i, r) in drained.iter().enumerate() {
            assert_eq!(r.x, i as f64);
        }
    }

    #[tokio::test]
    async fn test_no_appends_after_stop() {
        let buffer = SampleBuffer::new();
        let mut sampler = Sampler::start(
            Duration::from_millis(1),
            Box::new(counting_script(10)),
            buffer.clone(),
        );

        sleep(Duration::from_millis(20)).await;
        sampler.stop().await;
        let after_stop = buffer.len();

        sleep(Duration::from_millis(20)).await;
        assert_eq!(buffer.len(), after_stop);
        assert!(!sampler.is_running());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut sampler = Sampler::start(
            Duration::from_millis(5),
            Box::new(counting_script(10)),
            SampleBuffer::new(),
        );

        assert!(sampler.stop().await.is_some());
        assert!(sampler.stop().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_preempts_long_interval() {
        let buffer = SampleBuffer::new();
        let mut sampler = Sampler::start(
            Duration::from_secs(3600),
            Box::new(counting_script(10)),
            buffer.clone(),
        );

        sleep(Duration::from_millis(10)).await;
        let stopped = timeout(Duration::from_secs(1), sampler.stop()).await;
        assert!(stopped.is_ok(), "stop() waited for the next tick");
        assert_eq!(buffer.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_sensor_keeps_loop_alive() {
        let buffer = SampleBuffer::new();
        let mut sampler = Sampler::start(
            Duration::from_millis(1),
            Box::new(SimulatedSensor::failing()),
            buffer.clone(),
        );

        sleep(Duration::from_millis(40)).await;
        assert!(sampler.is_running());
        assert!(sampler.stop().await.is_some());

        let health = sampler.health();
        assert!(health.ticks > 1);
        assert_eq!(health.failures, health.ticks);
        assert_eq!(health.appended, 0);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_failed_reads_are_skipped() {
        let r = Reading::new(0.0, 0.0, 1.0);
        let buffer = SampleBuffer::new();
        let mut sampler = Sampler::start(
            Duration::from_millis(1),
            Box::new(SimulatedSensor::scripted(vec![Some(r), None])),
            buffer.clone(),
        );

        sleep(Duration::from_millis(30)).await;
        sampler.stop().await;

        let health = sampler.health();
        assert_eq!(health.appended + health.failures, health.ticks);
        assert_eq!(buffer.len() as u64, health.appended);
        assert!(buffer.drain().iter().all(|x| *x == r));
    }

    #[test]
    fn test_offline_streak_resets_on_success() {
        let counters = Counters::default();
        let buffer = SampleBuffer::new();
        let failure = || Err(SensorError::Io("nack".to_string()));

        for _ in 0..OFFLINE_THRESHOLD + 2 {
            record("test", failure(), &buffer, &counters);
        }
        assert_eq!(
            counters.snapshot().consecutive_failures,
            OFFLINE_THRESHOLD + 2
        );

        record("test", Ok(Reading::new(1.0, 1.0, 1.0)), &buffer, &counters);
        let health = counters.snapshot();
        assert_eq!(health.consecutive_failures, 0);
        assert_eq!(health.appended, 1);
        assert_eq!(health.ticks, OFFLINE_THRESHOLD + 3);
        assert_eq!(buffer.len(), 1);
    }

    /// Blocks the calling thread on every read, like a slow bus.
    struct SlowSensor {
        delay: Duration,
    }

    impl Sensor for SlowSensor {
        fn read(&mut self) -> Result<Reading, SensorError> {
            std::thread::sleep(self.delay);
            Ok(Reading::new(0.0, 0.0, 1.0))
        }

        fn set_range(&mut self, _range: crate::sensor::Range) -> Result<(), SensorError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_slow_reads_do_not_stall_runtime() {
        let buffer = SampleBuffer::new();
        let mut sampler = Sampler::start(
            Duration::from_millis(1),
            Box::new(SlowSensor {
                delay: Duration::from_millis(200),
            }),
            buffer.clone(),
        );

        // On a single-threaded runtime this timer only fires on time if the
        // read is off the runtime thread.
        let started = std::time::Instant::now();
        sleep(Duration::from_millis(20)).await;
        assert!(started.elapsed() < Duration::from_millis(150));

        assert!(sampler.stop().await.is_some());
        assert!(buffer.len() >= 1);
    }

    struct PanickingSensor;

    impl Sensor for PanickingSensor {
        fn read(&mut self) -> Result<Reading, SensorError> {
            panic!("driver bug");
        }

        fn set_range(&mut self, _range: crate::sensor::Range) -> Result<(), SensorError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_panicking_read_ends_sampler() {
        let mut sampler = Sampler::start(
            Duration::from_millis(1),
            Box::new(PanickingSensor),
            SampleBuffer::new(),
        );

        sleep(Duration::from_millis(20)).await;
        let stopped = timeout(Duration::from_secs(1), sampler.stop()).await;
        assert!(matches!(stopped, Ok(None)));
        assert!(!sampler.is_running());
    }
}
