// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Sensor traits and common types

use std::fmt;
use serde::{Deserialize, Serialize};

use super::error::{ConversionError, ReadError, SetupError, TransportError};

/// Sensor kinds supported by the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Thermistor,                 // 103JT over the shared serial line
    PressureSensor,             // LPS25H
    Accelerometer,              // KX224 over the shared serial line
    TemperatureHumiditySensor,  // SHT31
    PulseWaveSensor,            // BH1792GLC
}

impl SensorKind {
    /// Wire tag used in published payloads
    pub fn tag(&self) -> &'static str {
        match self {
            SensorKind::Thermistor => "thermistor",
            SensorKind::PressureSensor => "pressure_sensor",
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::TemperatureHumiditySensor => "temperature_humidity_sensor",
            SensorKind::PulseWaveSensor => "pulse_wave_sensor",
        }
    }

    /// Model number fitted in the reference deployment
    pub fn default_model(&self) -> &'static str {
        match self {
            SensorKind::Thermistor => "103JT-050",
            SensorKind::PressureSensor => "LPS25H",
            SensorKind::Accelerometer => "KX224-1053",
            SensorKind::TemperatureHumiditySensor => "SHT31",
            SensorKind::PulseWaveSensor => "BH1792GLC",
        }
    }

    /// Measurement keys published for this kind, in payload order
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            SensorKind::Thermistor => &["temperature_celsius"],
            SensorKind::PressureSensor => &["pressure_hpa", "temperature_celsius", "altitude_meters"],
            SensorKind::Accelerometer => &[
                "accelerometer_x_mps2",
                "accelerometer_y_mps2",
                "accelerometer_z_mps2",
            ],
            SensorKind::TemperatureHumiditySensor => &["temperature_celsius", "humidity_percent"],
            SensorKind::PulseWaveSensor => &["heart_bpm"],
        }
    }

    /// True for kinds that multiplex a serial line using a selection signal
    pub fn uses_serial_line(&self) -> bool {
        matches!(self, SensorKind::Thermistor | SensorKind::Accelerometer)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Static identity of a sensor. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    kind: SensorKind,
    model_number: String,
}

impl SensorDescriptor {
    pub fn new(kind: SensorKind, model_number: impl Into<String>) -> Self {
        Self {
            kind,
            model_number: model_number.into(),
        }
    }

    /// Descriptor with the kind's default model number
    pub fn of(kind: SensorKind) -> Self {
        Self::new(kind, kind.default_model())
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn model_number(&self) -> &str {
        &self.model_number
    }
}

/// Converted reading in engineering units.
///
/// One variant per sensor kind, so the set of fields a sensor publishes is
/// fixed by its kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Measurement {
    Temperature {
        temperature_celsius: f64,
    },
    Pressure {
        pressure_hpa: f64,
        temperature_celsius: f64,
        altitude_meters: f64,
    },
    Acceleration {
        x_mps2: f64,
        y_mps2: f64,
        z_mps2: f64,
    },
    TemperatureHumidity {
        temperature_celsius: f64,
        humidity_percent: f64,
    },
    PulseWave {
        heart_bpm: f64,
    },
}

impl Measurement {
    /// All-zero measurement held by a record before its first successful cycle
    pub fn zeroed(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Thermistor => Measurement::Temperature { temperature_celsius: 0.0 },
            SensorKind::PressureSensor => Measurement::Pressure {
                pressure_hpa: 0.0,
                temperature_celsius: 0.0,
                altitude_meters: 0.0,
            },
            SensorKind::Accelerometer => Measurement::Acceleration {
                x_mps2: 0.0,
                y_mps2: 0.0,
                z_mps2: 0.0,
            },
            SensorKind::TemperatureHumiditySensor => Measurement::TemperatureHumidity {
                temperature_celsius: 0.0,
                humidity_percent: 0.0,
            },
            SensorKind::PulseWaveSensor => Measurement::PulseWave { heart_bpm: 0.0 },
        }
    }

    /// Sensor kind this measurement belongs to
    pub fn kind(&self) -> SensorKind {
        match self {
            Measurement::Temperature { .. } => SensorKind::Thermistor,
            Measurement::Pressure { .. } => SensorKind::PressureSensor,
            Measurement::Acceleration { .. } => SensorKind::Accelerometer,
            Measurement::TemperatureHumidity { .. } => SensorKind::TemperatureHumiditySensor,
            Measurement::PulseWave { .. } => SensorKind::PulseWaveSensor,
        }
    }

    /// Values in the same order as [`SensorKind::field_names`]
    pub fn values(&self) -> Vec<f64> {
        match *self {
            Measurement::Temperature { temperature_celsius } => vec![temperature_celsius],
            Measurement::Pressure { pressure_hpa, temperature_celsius, altitude_meters } => {
                vec![pressure_hpa, temperature_celsius, altitude_meters]
            }
            Measurement::Acceleration { x_mps2, y_mps2, z_mps2 } => vec![x_mps2, y_mps2, z_mps2],
            Measurement::TemperatureHumidity { temperature_celsius, humidity_percent } => {
                vec![temperature_celsius, humidity_percent]
            }
            Measurement::PulseWave { heart_bpm } => vec![heart_bpm],
        }
    }

    /// `(key, value)` pairs for publishing
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        self.kind()
            .field_names()
            .iter()
            .copied()
            .zip(self.values())
            .collect()
    }
}

/// Capability contract every sensor device implements.
///
/// A device owns its transport. `setup` runs once before the periodic task,
/// `sample` performs the bus/serial transaction(s) for one cycle and
/// `convert` is a pure transformation of the raw reading.
pub trait SensorDevice: Send + 'static {
    /// Unconverted reading produced by `sample`
    type Raw: Send + fmt::Debug;

    /// Static identity of this device
    fn descriptor(&self) -> &SensorDescriptor;

    /// Human readable transport location, used for thread names and logs
    fn location(&self) -> String;

    /// One-time device handshake
    fn setup(&mut self) -> Result<(), SetupError>;

    /// Fetch one raw reading
    fn sample(&mut self) -> Result<Self::Raw, ReadError>;

    /// Convert a raw reading into engineering units
    fn convert(&self, raw: Self::Raw) -> Result<Measurement, ConversionError>;

    /// Release the transport. Called exactly once by the owning worker.
    fn close(&mut self) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_match_values() {
        let kinds = [
            SensorKind::Thermistor,
            SensorKind::PressureSensor,
            SensorKind::Accelerometer,
            SensorKind::TemperatureHumiditySensor,
            SensorKind::PulseWaveSensor,
        ];
        for kind in kinds {
            let m = Measurement::zeroed(kind);
            assert_eq!(m.kind(), kind);
            assert_eq!(m.values().len(), kind.field_names().len());
        }
    }

    #[test]
    fn test_kind_tags_roundtrip_through_serde() {
        let json = serde_json::to_string(&SensorKind::TemperatureHumiditySensor).unwrap();
        assert_eq!(json, "\"temperature_humidity_sensor\"");
        let kind: SensorKind = serde_json::from_str("\"pulse_wave_sensor\"").unwrap();
        assert_eq!(kind, SensorKind::PulseWaveSensor);
        assert_eq!(kind.to_string(), "pulse_wave_sensor");
    }

    #[test]
    fn test_acceleration_fields() {
        let m = Measurement::Acceleration { x_mps2: 0.1, y_mps2: -0.2, z_mps2: 9.8 };
        let fields = m.fields();
        assert_eq!(fields[0], ("accelerometer_x_mps2", 0.1));
        assert_eq!(fields[2], ("accelerometer_z_mps2", 9.8));
    }
}
