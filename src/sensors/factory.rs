// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Build the sensor manager from configuration
//!
//! Serial lines are opened once and shared by every sensor that selects a
//! device on them. Each sensor gets `setup.attempts` tries to come up; every
//! try opens a fresh transport handle, and a sensor that never comes up is
//! kept as an inactive entry so indices match the configuration.

use std::collections::HashMap;
use std::thread;

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use super::environmental::{PressureSensor, TemperatureHumiditySensor};
use super::pulse::PulseWaveSensor;
use super::seismic::Accelerometer;
use super::simulator::{SimulatedBus, SimulatedLine};
use super::thermal::Thermistor;
use super::worker::{SensorWorker, WorkerConfig};
use super::{SensorDescriptor, SensorKind, SensorManager};
use crate::config::{Config, SensorEntry, SerialLineConfig};
use crate::transport::{I2cBus, LineSelector, SerialLine, SharedLine};

/// Source of the physical (or simulated) transports
pub trait TransportProvider {
    fn open_line(&self, line: &SerialLineConfig) -> Result<Box<dyn SerialLine>>;

    fn open_bus(&self, kind: SensorKind, address: u16) -> Result<Box<dyn I2cBus>>;
}

/// Real devices: serialport lines and the Linux I2C character device
pub struct HardwareTransports {
    bus: String,
}

impl HardwareTransports {
    pub fn new(bus: &str) -> Self {
        Self { bus: bus.to_string() }
    }
}

impl TransportProvider for HardwareTransports {
    #[cfg(feature = "serial")]
    fn open_line(&self, line: &SerialLineConfig) -> Result<Box<dyn SerialLine>> {
        let port = crate::transport::SerialPortLine::open(&line.path, line.baud_rate, line.timeout())?;
        Ok(Box::new(port))
    }

    #[cfg(not(feature = "serial"))]
    fn open_line(&self, line: &SerialLineConfig) -> Result<Box<dyn SerialLine>> {
        Err(anyhow!(
            "cannot open {}: built without the `serial` feature",
            line.path
        ))
    }

    #[cfg(feature = "hardware")]
    fn open_bus(&self, _kind: SensorKind, address: u16) -> Result<Box<dyn I2cBus>> {
        let bus = crate::transport::LinuxI2cBus::open(&self.bus, address)?;
        Ok(Box::new(bus))
    }

    #[cfg(not(feature = "hardware"))]
    fn open_bus(&self, _kind: SensorKind, address: u16) -> Result<Box<dyn I2cBus>> {
        Err(anyhow!(
            "cannot open {} at {:#04x}: built without the `hardware` feature",
            self.bus,
            address
        ))
    }
}

/// Demo mode: every transport is simulated
pub struct SimulatedTransports {
    attached: HashMap<String, Vec<(String, SensorKind)>>,
}

impl SimulatedTransports {
    pub fn new(config: &Config) -> Self {
        let mut attached: HashMap<String, Vec<(String, SensorKind)>> = HashMap::new();
        for sensor in &config.sensors {
            if let (Some(line), Some(signal)) = (&sensor.line, &sensor.signal) {
                attached
                    .entry(line.clone())
                    .or_default()
                    .push((signal.clone(), sensor.kind));
            }
        }
        Self { attached }
    }
}

impl TransportProvider for SimulatedTransports {
    fn open_line(&self, line: &SerialLineConfig) -> Result<Box<dyn SerialLine>> {
        let mut sim = SimulatedLine::new(&line.path);
        for (signal, kind) in self.attached.get(&line.name).into_iter().flatten() {
            sim.attach(signal, *kind);
        }
        Ok(Box::new(sim))
    }

    fn open_bus(&self, kind: SensorKind, address: u16) -> Result<Box<dyn I2cBus>> {
        Ok(Box::new(SimulatedBus::new(kind, address)))
    }
}

/// Build every configured sensor with the transports `demo_mode` selects
pub fn build_manager(config: &Config) -> Result<SensorManager> {
    if config.demo_mode {
        info!("Demo mode - using simulated transports");
        build_manager_with(config, &SimulatedTransports::new(config))
    } else {
        build_manager_with(config, &HardwareTransports::new(&config.i2c.bus))
    }
}

pub fn build_manager_with(config: &Config, transports: &dyn TransportProvider) -> Result<SensorManager> {
    config.validate()?;
    let lines = open_lines(config, transports)?;

    let builder = Builder {
        config,
        transports,
        lines: &lines,
    };
    let workers: Result<Vec<SensorWorker>> = config
        .sensors
        .iter()
        .enumerate()
        .map(|(i, entry)| builder.start_with_retry(i + 1, entry))
        .collect();

    // workers hold their own handles from here on
    release_lines(lines);
    Ok(SensorManager::new(workers?))
}

fn open_lines(config: &Config, transports: &dyn TransportProvider) -> Result<HashMap<String, SharedLine>> {
    let mut lines = HashMap::new();
    for line in &config.serial_lines {
        let in_use = config
            .sensors
            .iter()
            .any(|s| s.line.as_deref() == Some(line.name.as_str()));
        if !in_use {
            debug!("Serial line {} has no sensors, not opening", line.name);
            continue;
        }
        match transports.open_line(line) {
            Ok(port) => {
                info!("Opened serial line {} ({} @ {})", line.name, line.path, line.baud_rate);
                lines.insert(
                    line.name.clone(),
                    SharedLine::new(port, config.worker.lock_timeout()),
                );
            }
            Err(e) => {
                release_lines(lines);
                return Err(e.context(format!("opening serial line {}", line.name)));
            }
        }
    }
    Ok(lines)
}

fn release_lines(lines: HashMap<String, SharedLine>) {
    for (name, line) in lines {
        if let Err(e) = line.release() {
            warn!("Error closing serial line {}: {}", name, e);
        }
    }
}

struct Builder<'a> {
    config: &'a Config,
    transports: &'a dyn TransportProvider,
    lines: &'a HashMap<String, SharedLine>,
}

impl Builder<'_> {
    fn worker_config(&self, entry: &SensorEntry) -> WorkerConfig {
        WorkerConfig::new(entry.interval())
            .with_settle(self.config.setup.settle())
            .with_failure_policy(self.config.worker.failure_policy)
    }

    fn start_with_retry(&self, index: usize, entry: &SensorEntry) -> Result<SensorWorker> {
        let setup = &self.config.setup;
        let mut attempt = 1;
        loop {
            let worker = self.start(entry)?;
            if worker.is_alive() || attempt >= setup.attempts {
                return Ok(worker);
            }
            warn!(
                "Sensor {} ({}) failed setup, attempt {}/{}; retrying in {:?}",
                index,
                entry.kind,
                attempt,
                setup.attempts,
                setup.backoff()
            );
            drop(worker);
            thread::sleep(setup.backoff());
            attempt += 1;
        }
    }

    fn start(&self, entry: &SensorEntry) -> Result<SensorWorker> {
        let model = entry.model_number();
        let config = self.worker_config(entry);
        let worker = match entry.kind {
            SensorKind::Thermistor => {
                SensorWorker::start(Thermistor::with_model(self.selector(entry)?, model), config)
            }
            SensorKind::Accelerometer => {
                SensorWorker::start(Accelerometer::with_model(self.selector(entry)?, model), config)
            }
            SensorKind::PressureSensor => match self.bus(entry)? {
                Ok(bus) => SensorWorker::start(PressureSensor::with_model(bus, model), config),
                Err(unavailable) => unavailable,
            },
            SensorKind::TemperatureHumiditySensor => match self.bus(entry)? {
                Ok(bus) => {
                    SensorWorker::start(TemperatureHumiditySensor::with_model(bus, model), config)
                }
                Err(unavailable) => unavailable,
            },
            SensorKind::PulseWaveSensor => match self.bus(entry)? {
                Ok(bus) => SensorWorker::start(PulseWaveSensor::with_model(bus, model), config),
                Err(unavailable) => unavailable,
            },
        };
        Ok(worker)
    }

    fn selector(&self, entry: &SensorEntry) -> Result<LineSelector> {
        let (Some(name), Some(signal)) = (&entry.line, &entry.signal) else {
            return Err(anyhow!("{} needs a serial line and signal", entry.kind));
        };
        let line = self
            .lines
            .get(name)
            .ok_or_else(|| anyhow!("serial line {} is not open", name))?;
        Ok(LineSelector::new(line.clone(), signal.as_str()))
    }

    /// Open the sensor's bus, or an inactive worker standing in for it
    fn bus(&self, entry: &SensorEntry) -> Result<std::result::Result<Box<dyn I2cBus>, SensorWorker>> {
        let address = entry
            .address
            .ok_or_else(|| anyhow!("{} needs an I2C address", entry.kind))?;
        Ok(match self.transports.open_bus(entry.kind, address) {
            Ok(bus) => Ok(bus),
            Err(e) => {
                warn!("Could not open {} at {:#04x}: {:#}", entry.kind, address, e);
                Err(SensorWorker::unavailable(
                    SensorDescriptor::new(entry.kind, entry.model_number()),
                    format!("i2c:{:#04x}", address),
                ))
            }
        })
    }
}
