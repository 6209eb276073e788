// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Configuration module

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::sensors::{ReadFailurePolicy, SensorKind};
use crate::streaming::PublisherConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// Enable demo mode (simulated transports)
    pub demo_mode: bool,

    /// Device setup retry policy
    #[serde(default)]
    pub setup: SetupConfig,

    /// Sampling loop behaviour
    #[serde(default)]
    pub worker: WorkerSettings,

    /// I2C bus
    #[serde(default)]
    pub i2c: I2cConfig,

    /// Serial lines shared by signal-selected sensors
    #[serde(default)]
    pub serial_lines: Vec<SerialLineConfig>,

    /// Sensors, in index order
    #[serde(default)]
    pub sensors: Vec<SensorEntry>,

    /// Status publisher
    #[serde(default)]
    pub publisher: PublisherConfig,
}

impl Default for Config {
    fn default() -> Self {
        let line = SerialLineConfig::default();
        Self {
            log_level: "info".to_string(),
            demo_mode: false,
            setup: SetupConfig::default(),
            worker: WorkerSettings::default(),
            i2c: I2cConfig::default(),
            sensors: vec![
                SensorEntry::on_line(SensorKind::Thermistor, &line.name, "1"),
                SensorEntry::on_line(SensorKind::Thermistor, &line.name, "2"),
                SensorEntry::on_line(SensorKind::Accelerometer, &line.name, "5"),
                SensorEntry::at_address(SensorKind::PressureSensor, 0x5C),
                SensorEntry::at_address(SensorKind::TemperatureHumiditySensor, 0x45),
                SensorEntry::at_address(SensorKind::PulseWaveSensor, 0x5B),
            ],
            serial_lines: vec![line],
            publisher: PublisherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("sensorhub"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn serial_line(&self, name: &str) -> Option<&SerialLineConfig> {
        self.serial_lines.iter().find(|l| l.name == name)
    }

    /// Reject configurations the factory could not build
    pub fn validate(&self) -> Result<()> {
        if self.setup.attempts == 0 {
            bail!("setup.attempts must be at least 1");
        }

        let mut names = HashSet::new();
        for line in &self.serial_lines {
            if !names.insert(line.name.as_str()) {
                bail!("serial line '{}' is defined twice", line.name);
            }
        }

        let mut selected = HashSet::new();
        for (i, sensor) in self.sensors.iter().enumerate() {
            let index = i + 1;
            if sensor.interval_ms == 0 {
                bail!("sensor {}: interval_ms must be positive", index);
            }
            if sensor.kind.uses_serial_line() {
                let (Some(line), Some(signal)) = (&sensor.line, &sensor.signal) else {
                    bail!("sensor {} ({}): needs both line and signal", index, sensor.kind);
                };
                if self.serial_line(line).is_none() {
                    bail!("sensor {} ({}): unknown serial line '{}'", index, sensor.kind, line);
                }
                if signal.is_empty() {
                    bail!("sensor {} ({}): empty signal", index, sensor.kind);
                }
                if !selected.insert((line.as_str(), signal.as_str())) {
                    bail!("sensor {}: signal '{}' on '{}' is already taken", index, signal, line);
                }
            } else {
                match sensor.address {
                    None => bail!("sensor {} ({}): missing I2C address", index, sensor.kind),
                    Some(address) if address > 0x7F => {
                        bail!("sensor {} ({}): address {:#x} is not 7-bit", index, sensor.kind, address)
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

/// Device setup retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Setup attempts per sensor, including the first
    pub attempts: u32,

    /// Wait between attempts
    pub backoff_ms: u64,

    /// Wait after a successful setup before the first sample
    pub settle_ms: u64,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff_ms: 1000,
            settle_ms: 1000,
        }
    }
}

impl SetupConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// What a failed read or conversion does to the sensor
    pub failure_policy: ReadFailurePolicy,

    /// Longest wait for a shared serial line
    pub lock_timeout_ms: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            failure_policy: ReadFailurePolicy::Tolerate,
            lock_timeout_ms: 2000,
        }
    }
}

impl WorkerSettings {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct I2cConfig {
    /// Bus device node
    pub bus: String,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            bus: "/dev/i2c-1".to_string(),
        }
    }
}

/// One physical serial line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialLineConfig {
    /// Name sensors refer to
    pub name: String,

    /// Device path
    pub path: String,

    pub baud_rate: u32,

    /// Per-read timeout
    pub timeout_ms: u64,
}

impl Default for SerialLineConfig {
    fn default() -> Self {
        Self {
            name: "board".to_string(),
            path: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            timeout_ms: 1000,
        }
    }
}

impl SerialLineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One sensor.
///
/// I2C devices need `address`; serial devices need `line` and `signal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEntry {
    pub kind: SensorKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,

    /// Sampling interval
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Overrides the kind's default model number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,
}

fn default_interval_ms() -> u64 {
    1000
}

impl SensorEntry {
    pub fn at_address(kind: SensorKind, address: u16) -> Self {
        Self {
            kind,
            address: Some(address),
            line: None,
            signal: None,
            interval_ms: default_interval_ms(),
            model_number: None,
        }
    }

    pub fn on_line(kind: SensorKind, line: &str, signal: &str) -> Self {
        Self {
            kind,
            address: None,
            line: Some(line.to_string()),
            signal: Some(signal.to_string()),
            interval_ms: default_interval_ms(),
            model_number: None,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn model_number(&self) -> &str {
        self.model_number
            .as_deref()
            .unwrap_or_else(|| self.kind.default_model())
    }
}
