// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Sensor worker - owns one device and samples it on its own thread

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use super::error::WorkerError;
use super::status::{Liveness, StatusCell, StatusRecord, StatusWriter};
use super::{SensorDescriptor, SensorDevice};

/// What a worker does when one cycle fails to read or convert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadFailurePolicy {
    /// Log, skip the publish and try again next cycle
    #[default]
    Tolerate,
    /// Go inactive and release the transport
    FailFast,
}

/// Timing and failure handling of one worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Wait after a successful setup before the first sample
    pub settle: Duration,
    pub failure_policy: ReadFailurePolicy,
}

impl WorkerConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            settle: Duration::ZERO,
            failure_policy: ReadFailurePolicy::default(),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_failure_policy(mut self, policy: ReadFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1)).with_settle(Duration::from_secs(1))
    }
}

struct WorkerTask {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// One sensor: its identity, latest record, liveness and sampling thread.
///
/// The device is set up inside [`SensorWorker::start`]. On success it moves
/// to a dedicated thread that samples it until the worker goes inactive or is
/// shut down; the transport is closed exactly once, by whichever path ends
/// the worker.
pub struct SensorWorker {
    descriptor: SensorDescriptor,
    location: String,
    status: Arc<StatusCell>,
    liveness: Arc<Liveness>,
    task: Mutex<Option<WorkerTask>>,
}

impl SensorWorker {
    /// Set up `device` and start sampling it.
    ///
    /// A failed setup is not an error here: the transport is released, the
    /// worker comes back inactive with its initial record, and no thread is
    /// started.
    pub fn start<D: SensorDevice>(mut device: D, config: WorkerConfig) -> Self {
        let descriptor = device.descriptor().clone();
        let location = device.location();
        let (writer, status) = StatusCell::new(descriptor.clone());
        let worker = Self {
            descriptor,
            location,
            status,
            liveness: Arc::new(Liveness::new()),
            task: Mutex::new(None),
        };

        if let Err(e) = device.setup() {
            error!("Setup failed for {} at {}: {}", worker.descriptor.kind(), worker.location, e);
            if let Err(e) = device.close() {
                warn!("Error closing {} after failed setup: {}", worker.location, e);
            }
            worker.liveness.clear();
            return worker;
        }
        info!(
            "Set up {} ({}) at {}",
            worker.descriptor.kind(),
            worker.descriptor.model_number(),
            worker.location
        );

        let (stop, stop_rx) = bounded::<()>(0);
        let sampler = Sampler {
            device,
            writer,
            liveness: Arc::clone(&worker.liveness),
            stop: stop_rx,
            config,
            location: worker.location.clone(),
        };
        let spawned = thread::Builder::new()
            .name(format!("{}@{}", worker.descriptor.kind(), worker.location))
            .spawn(move || sampler.run());

        match spawned {
            Ok(handle) => *worker.task.lock() = Some(WorkerTask { stop, handle }),
            Err(e) => {
                // the sampler was dropped with the closure, which closed the device
                error!("Could not start sampling thread for {}: {}", worker.location, e);
                worker.liveness.clear();
            }
        }
        worker
    }

    /// An inactive worker for a sensor whose transport could not be opened
    pub fn unavailable(descriptor: SensorDescriptor, location: impl Into<String>) -> Self {
        let (_, status) = StatusCell::new(descriptor.clone());
        let liveness = Arc::new(Liveness::new());
        liveness.clear();
        Self {
            descriptor,
            location: location.into(),
            status,
            liveness,
            task: Mutex::new(None),
        }
    }

    pub fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Latest record. Never blocks behind the sampling thread for longer than a pointer swap.
    pub fn status(&self) -> Arc<StatusRecord> {
        self.status.load()
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// True while the sampling thread exists and has not exited
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop sampling and wait for the transport to be released.
    ///
    /// Safe to call any number of times and after the worker already stopped
    /// on its own.
    pub fn shutdown(&self) {
        let task = self.task.lock().take();
        if let Some(WorkerTask { stop, handle }) = task {
            debug!("Stopping {} at {}", self.descriptor.kind(), self.location);
            drop(stop);
            if handle.join().is_err() {
                error!("Sampling thread for {} panicked", self.location);
            }
        }
        self.liveness.clear();
    }
}

impl Drop for SensorWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sampling loop state, owned by the worker thread
struct Sampler<D: SensorDevice> {
    device: D,
    writer: StatusWriter,
    liveness: Arc<Liveness>,
    stop: Receiver<()>,
    config: WorkerConfig,
    location: String,
}

impl<D: SensorDevice> Sampler<D> {
    fn run(mut self) {
        debug!("Sampling {} every {:?}", self.location, self.config.interval);
        if self.wait(self.config.settle) {
            return;
        }

        while self.liveness.is_alive() {
            match self.cycle() {
                Ok(record) => trace!("{} cycle {} published", self.location, record.sequence),
                Err(e) => match self.config.failure_policy {
                    ReadFailurePolicy::Tolerate => {
                        warn!("Skipping cycle for {}: {}", self.location, e);
                    }
                    ReadFailurePolicy::FailFast => {
                        error!("Cycle failed for {}, going inactive: {}", self.location, e);
                        return;
                    }
                },
            }
            if self.wait(self.config.interval) {
                return;
            }
        }
    }

    /// Sample, convert and publish. Any failure leaves the record untouched.
    fn cycle(&mut self) -> Result<Arc<StatusRecord>, WorkerError> {
        let raw = self.device.sample()?;
        let measured_time = Utc::now();
        let measurement = self.device.convert(raw)?;
        Ok(self.writer.publish(measurement, measured_time)?)
    }

    /// Sleep for `timeout`; true if shutdown was requested meanwhile
    fn wait(&self, timeout: Duration) -> bool {
        match self.stop.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

impl<D: SensorDevice> Drop for Sampler<D> {
    fn drop(&mut self) {
        if let Err(e) = self.device.close() {
            warn!("Error closing {}: {}", self.location, e);
        }
        if self.liveness.clear() {
            info!("{} is no longer active", self.location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::convert::sensirion_crc;
    use crate::sensors::environmental::{lps25h, sht31, PressureSensor, TemperatureHumiditySensor};
    use crate::sensors::thermal::Thermistor;
    use crate::sensors::Measurement;
    use crate::transport::mock::{Event, MockBus, MockLine};
    use crate::transport::{LineSelector, SharedLine};
    use std::time::Instant;

    fn eventually(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    fn fast() -> WorkerConfig {
        WorkerConfig::new(Duration::from_millis(5))
    }

    fn lps25h_bus() -> MockBus {
        MockBus::new(lps25h::DEFAULT_ADDRESS)
            .with_register(lps25h::WHO_AM_I, lps25h::WHO_AM_I_ID)
            .with_registers(lps25h::PRESS_OUT_XL, &[0x00, 0x40, 0x3F, 0xFF, 0xFF])
    }

    #[test]
    fn test_failed_setup_leaves_worker_inactive() {
        let bus = lps25h_bus().failing_writes(1);
        let recorder = bus.recorder();
        let worker = SensorWorker::start(PressureSensor::new(Box::new(bus)), fast());

        assert!(!worker.is_alive());
        assert!(!worker.is_running());
        assert_eq!(recorder.closes(), 1);

        thread::sleep(Duration::from_millis(30));
        assert!(worker.status().is_initial());
        // only the identity check and the close reached the bus
        assert_eq!(recorder.events(), vec![Event::RegRead(lps25h::WHO_AM_I), Event::Close]);
    }

    #[test]
    fn test_records_advance_with_monotonic_time() {
        let bus = lps25h_bus();
        let worker = SensorWorker::start(PressureSensor::new(Box::new(bus)), fast());
        assert!(worker.is_alive());

        let mut last_time = worker.status().measured_time;
        let mut last_seq = 0;
        for _ in 0..5 {
            assert!(eventually(|| worker.status().sequence > last_seq));
            let record = worker.status();
            assert!(record.measured_time >= last_time);
            last_time = record.measured_time;
            last_seq = record.sequence;
        }
        assert!(matches!(worker.status().measurement, Measurement::Pressure { .. }));
    }

    #[test]
    fn test_shutdown_closes_once_and_is_idempotent() {
        let bus = lps25h_bus();
        let recorder = bus.recorder();
        let worker = SensorWorker::start(PressureSensor::new(Box::new(bus)), fast());
        assert!(eventually(|| worker.status().sequence >= 2));

        worker.shutdown();
        assert!(!worker.is_alive());
        assert!(!worker.is_running());
        assert_eq!(recorder.closes(), 1);

        let frozen = worker.status();
        worker.shutdown();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(recorder.closes(), 1);
        assert_eq!(worker.status().sequence, frozen.sequence);
    }

    #[test]
    fn test_shutdown_interrupts_long_interval() {
        let worker = SensorWorker::start(
            PressureSensor::new(Box::new(lps25h_bus())),
            WorkerConfig::new(Duration::from_secs(60)),
        );
        assert!(eventually(|| worker.status().sequence == 1));
        let started = Instant::now();
        worker.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_tolerated_read_errors_keep_worker_alive() {
        let t = 0x6666u16.to_be_bytes();
        let h = 0x8000u16.to_be_bytes();
        let frame = [t[0], t[1], sensirion_crc(t), h[0], h[1], sensirion_crc(h)];
        let bus = MockBus::new(sht31::DEFAULT_ADDRESS)
            .with_block(0x00, &frame)
            .failing_reads(3);
        let worker = SensorWorker::start(TemperatureHumiditySensor::new(Box::new(bus)), fast());

        assert!(eventually(|| worker.status().sequence >= 1));
        assert!(worker.is_alive());
    }

    #[test]
    fn test_tolerated_conversion_errors_skip_publish() {
        let mut first = true;
        let mock = MockLine::new("ttyACM0").with_responder(move |_| {
            let reply = if first { "bogus" } else { "19.5" };
            first = false;
            Ok(reply.to_string())
        });
        let line = SharedLine::new(Box::new(mock), Duration::from_millis(100));
        let worker = SensorWorker::start(Thermistor::new(LineSelector::new(line, "1")), fast());

        assert!(eventually(|| worker.status().sequence >= 1));
        assert!(worker.is_alive());
        assert_eq!(
            worker.status().measurement,
            Measurement::Temperature { temperature_celsius: 19.5 }
        );
    }

    #[test]
    fn test_fail_fast_goes_inactive_and_releases() {
        let mock = MockLine::new("ttyACM0").with_replies(&[]);
        let recorder = mock.recorder();
        let line = SharedLine::new(Box::new(mock), Duration::from_millis(100));
        let worker = SensorWorker::start(
            Thermistor::new(LineSelector::new(line, "1")),
            fast().with_failure_policy(ReadFailurePolicy::FailFast),
        );

        assert!(eventually(|| !worker.is_alive()));
        assert!(eventually(|| recorder.closes() == 1));
        assert!(worker.status().is_initial());
        worker.shutdown();
        assert_eq!(recorder.closes(), 1);
    }
}
