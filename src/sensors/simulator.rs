// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Simulated transports for demo mode
//!
//! These stand in for the serial sensor board and the I2C devices, producing
//! raw frames in the same formats as the hardware so the whole pipeline
//! (setup, sample, convert, publish) runs unchanged.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::time::Instant;

use rand::prelude::*;
use rand_distr::Normal;

use super::convert::sensirion_crc;
use super::environmental::lps25h;
use super::pulse::bh1792;
use super::{SensorKind, TransportError};
use crate::transport::{I2cBus, SerialLine};

const STANDARD_GRAVITY: f64 = 9.80665;

/// Slowly wandering ambient conditions shared by the generators
struct Ambient {
    rng: StdRng,
    drift: f64,
    anomaly_probability: f64,
    started: Instant,
}

impl Ambient {
    fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            drift: 0.0,
            anomaly_probability: 0.02,
            started: Instant::now(),
        }
    }

    fn step(&mut self) {
        self.drift = (self.drift + self.rng.gen_range(-0.01..0.01)).clamp(-2.0, 2.0);
    }

    fn noise(&mut self, std_dev: f64) -> f64 {
        match Normal::new(0.0, std_dev) {
            Ok(normal) => self.rng.sample(normal),
            Err(_) => 0.0,
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn temperature_celsius(&mut self) -> f64 {
        22.0 + self.drift + self.noise(0.05)
    }

    fn acceleration(&mut self) -> [f64; 3] {
        let mut data = [
            self.noise(0.05),
            self.noise(0.05),
            STANDARD_GRAVITY + self.noise(0.05),
        ];
        // occasional knock
        if self.rng.gen::<f64>() < self.anomaly_probability {
            let axis = self.rng.gen_range(0..3);
            data[axis] += self.rng.gen_range(1.0..5.0) * self.rng.gen_range(-1.0..1.0);
        }
        data
    }
}

/// Serial sensor board answering thermistor and accelerometer signals
pub struct SimulatedLine {
    name: String,
    devices: HashMap<String, SensorKind>,
    pending: Option<String>,
    ambient: Ambient,
    closed: bool,
}

impl SimulatedLine {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            devices: HashMap::new(),
            pending: None,
            ambient: Ambient::new(),
            closed: false,
        }
    }

    /// Answer `signal` as a device of `kind`
    pub fn attach(&mut self, signal: &str, kind: SensorKind) {
        self.devices.insert(signal.to_string(), kind);
    }

    fn check_open(&self) -> Result<(), TransportError> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl SerialLine for SimulatedLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset_buffers(&mut self) -> Result<(), TransportError> {
        self.check_open()?;
        self.pending = None;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.check_open()?;
        self.pending = None;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.check_open()?;
        self.pending = Some(String::from_utf8_lossy(bytes).to_string());
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        self.check_open()?;
        let signal = self.pending.take().ok_or(TransportError::Timeout)?;
        self.ambient.step();
        match self.devices.get(&signal) {
            Some(SensorKind::Thermistor) => {
                Ok(format!("{:.2}", self.ambient.temperature_celsius()))
            }
            Some(SensorKind::Accelerometer) => {
                let [x, y, z] = self.ambient.acceleration();
                Ok(format!("{:.3},{:.3},{:.3}", x, y, z))
            }
            _ => Err(TransportError::Timeout),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.check_open()?;
        self.closed = true;
        Ok(())
    }
}

/// I2C device with the register behaviour of one sensor kind
pub struct SimulatedBus {
    address: u16,
    kind: SensorKind,
    ambient: Ambient,
    latched: [u8; 5],
    closed: bool,
}

impl SimulatedBus {
    pub fn new(kind: SensorKind, address: u16) -> Self {
        Self {
            address,
            kind,
            ambient: Ambient::new(),
            latched: [0; 5],
            closed: false,
        }
    }

    fn check_open(&self) -> Result<(), TransportError> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    /// Fresh LPS25H output registers, latched when PRESS_OUT_XL is read
    fn latch_lps25h(&mut self) {
        self.ambient.step();
        let pressure_hpa = 1013.25 - self.ambient.drift * 2.0 + self.ambient.noise(0.02);
        let pressure = (pressure_hpa * 4096.0).round() as u32;
        let temperature_celsius = self.ambient.temperature_celsius();
        let temperature = ((temperature_celsius - 42.5) * 480.0 + 65535.0)
            .round()
            .clamp(0.0, 65535.0) as u16;
        let p = pressure.to_le_bytes();
        let t = temperature.to_le_bytes();
        self.latched = [p[0], p[1], p[2], t[0], t[1]];
    }

    fn sht31_frame(&mut self) -> Vec<u8> {
        self.ambient.step();
        let temperature_celsius = self.ambient.temperature_celsius();
        let humidity_percent = (45.0 + self.ambient.drift * 3.0 + self.ambient.noise(0.3)).clamp(0.0, 100.0);
        let t = (((temperature_celsius + 45.0) / 175.0 * 65535.0).round() as u16).to_be_bytes();
        let h = ((humidity_percent / 100.0 * 65535.0).round() as u16).to_be_bytes();
        vec![t[0], t[1], sensirion_crc(t), h[0], h[1], sensirion_crc(h)]
    }

    fn pulse_count(&mut self) -> Vec<u8> {
        // ~72 bpm photoplethysmogram riding on a DC level
        let t = self.ambient.elapsed_secs();
        let wave = (2.0 * PI * 1.2 * t).sin() + 0.3 * (4.0 * PI * 1.2 * t).sin();
        let count = (1200.0 + 150.0 * wave + self.ambient.noise(5.0)).clamp(0.0, 65535.0) as u16;
        count.to_le_bytes().to_vec()
    }
}

impl I2cBus for SimulatedBus {
    fn address(&self) -> u16 {
        self.address
    }

    fn write_byte_data(&mut self, _register: u8, _value: u8) -> Result<(), TransportError> {
        self.check_open()
    }

    fn read_byte_data(&mut self, register: u8) -> Result<u8, TransportError> {
        self.check_open()?;
        let value = match (self.kind, register) {
            (SensorKind::PressureSensor, lps25h::WHO_AM_I) => lps25h::WHO_AM_I_ID,
            (SensorKind::PressureSensor, r)
                if (lps25h::PRESS_OUT_XL..lps25h::PRESS_OUT_XL + lps25h::OUTPUT_LEN).contains(&r) =>
            {
                if r == lps25h::PRESS_OUT_XL {
                    self.latch_lps25h();
                }
                self.latched[(r - lps25h::PRESS_OUT_XL) as usize]
            }
            (SensorKind::PulseWaveSensor, bh1792::MANUFACTURER_ID) => bh1792::MANUFACTURER_ID_VALUE,
            (SensorKind::PulseWaveSensor, bh1792::PART_ID) => bh1792::PART_ID_VALUE,
            _ => 0,
        };
        Ok(value)
    }

    fn read_block_data(&mut self, register: u8, len: u8) -> Result<Vec<u8>, TransportError> {
        self.check_open()?;
        let mut block = match (self.kind, register) {
            (SensorKind::TemperatureHumiditySensor, 0x00) => self.sht31_frame(),
            (SensorKind::PulseWaveSensor, bh1792::DATAOUT_LEDON) => self.pulse_count(),
            _ => Vec::new(),
        };
        block.truncate(len as usize);
        Ok(block)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.check_open()?;
        self.closed = true;
        Ok(())
    }
}
