// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Environmental sensors - pressure, temperature and humidity over I2C

use super::convert::{
    altitude_meters, lps25h_pressure_hpa, lps25h_temperature_celsius, sht31_checked_word,
    sht31_humidity_percent, sht31_temperature_celsius,
};
use super::error::{ConversionError, ReadError, SetupError, TransportError};
use super::{Measurement, SensorDescriptor, SensorDevice, SensorKind};
use crate::transport::I2cBus;

/// LPS25H register map (the subset in use)
pub mod lps25h {
    pub const DEFAULT_ADDRESS: u16 = 0x5C;
    pub const WHO_AM_I: u8 = 0x0F;
    pub const WHO_AM_I_ID: u8 = 0xBD;
    pub const CTRL_REG1: u8 = 0x20;
    /// Power on, 25 Hz output data rate
    pub const CTRL_REG1_ACTIVE_25HZ: u8 = 0xC0;
    pub const PRESS_OUT_XL: u8 = 0x28;
    /// PRESS_OUT_XL..TEMP_OUT_H
    pub const OUTPUT_LEN: u8 = 5;
}

/// SHT31 command words (MSB, LSB)
pub mod sht31 {
    pub const DEFAULT_ADDRESS: u16 = 0x45;
    /// Periodic mode, 1 measurement per second, high repeatability
    pub const PERIODIC_1MPS_HIGH: (u8, u8) = (0x21, 0x30);
    pub const FETCH_DATA: (u8, u8) = (0xE0, 0x00);
    /// temperature MSB, LSB, CRC, humidity MSB, LSB, CRC
    pub const FRAME_LEN: u8 = 6;
}

/// Raw output registers of an LPS25H
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureRaw {
    pub pressure: [u8; 3],
    pub temperature: [u8; 2],
}

/// LPS25H barometric pressure sensor
pub struct PressureSensor {
    descriptor: SensorDescriptor,
    bus: Box<dyn I2cBus>,
    closed: bool,
}

impl PressureSensor {
    pub fn new(bus: Box<dyn I2cBus>) -> Self {
        Self::with_model(bus, SensorKind::PressureSensor.default_model())
    }

    pub fn with_model(bus: Box<dyn I2cBus>, model_number: &str) -> Self {
        Self {
            descriptor: SensorDescriptor::new(SensorKind::PressureSensor, model_number),
            bus,
            closed: false,
        }
    }
}

impl SensorDevice for PressureSensor {
    type Raw = PressureRaw;

    fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    fn location(&self) -> String {
        format!("i2c:{:#04x}", self.bus.address())
    }

    fn setup(&mut self) -> Result<(), SetupError> {
        let found = self.bus.read_byte_data(lps25h::WHO_AM_I)?;
        if found != lps25h::WHO_AM_I_ID {
            return Err(SetupError::Identity {
                register: lps25h::WHO_AM_I,
                expected: lps25h::WHO_AM_I_ID,
                found,
            });
        }
        self.bus
            .write_byte_data(lps25h::CTRL_REG1, lps25h::CTRL_REG1_ACTIVE_25HZ)?;
        Ok(())
    }

    fn sample(&mut self) -> Result<PressureRaw, ReadError> {
        let mut out = [0u8; lps25h::OUTPUT_LEN as usize];
        for (offset, slot) in out.iter_mut().enumerate() {
            *slot = self.bus.read_byte_data(lps25h::PRESS_OUT_XL + offset as u8)?;
        }
        Ok(PressureRaw {
            pressure: [out[0], out[1], out[2]],
            temperature: [out[3], out[4]],
        })
    }

    fn convert(&self, raw: PressureRaw) -> Result<Measurement, ConversionError> {
        let pressure_hpa = lps25h_pressure_hpa(raw.pressure);
        let temperature_celsius = lps25h_temperature_celsius(raw.temperature);
        Ok(Measurement::Pressure {
            pressure_hpa,
            temperature_celsius,
            altitude_meters: altitude_meters(pressure_hpa, temperature_celsius),
        })
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.closed = true;
        self.bus.close()
    }
}

/// SHT31 temperature and humidity sensor
pub struct TemperatureHumiditySensor {
    descriptor: SensorDescriptor,
    bus: Box<dyn I2cBus>,
    closed: bool,
}

impl TemperatureHumiditySensor {
    pub fn new(bus: Box<dyn I2cBus>) -> Self {
        Self::with_model(bus, SensorKind::TemperatureHumiditySensor.default_model())
    }

    pub fn with_model(bus: Box<dyn I2cBus>, model_number: &str) -> Self {
        Self {
            descriptor: SensorDescriptor::new(SensorKind::TemperatureHumiditySensor, model_number),
            bus,
            closed: false,
        }
    }
}

impl SensorDevice for TemperatureHumiditySensor {
    type Raw = [u8; 6];

    fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    fn location(&self) -> String {
        format!("i2c:{:#04x}", self.bus.address())
    }

    fn setup(&mut self) -> Result<(), SetupError> {
        let (msb, lsb) = sht31::PERIODIC_1MPS_HIGH;
        self.bus.write_byte_data(msb, lsb)?;
        Ok(())
    }

    fn sample(&mut self) -> Result<[u8; 6], ReadError> {
        let (msb, lsb) = sht31::FETCH_DATA;
        self.bus.write_byte_data(msb, lsb)?;
        let block = self.bus.read_block_data(0x00, sht31::FRAME_LEN)?;
        block.as_slice().try_into().map_err(|_| ReadError::ShortRead {
            expected: sht31::FRAME_LEN as usize,
            got: block.len(),
        })
    }

    fn convert(&self, raw: [u8; 6]) -> Result<Measurement, ConversionError> {
        let temperature = sht31_checked_word([raw[0], raw[1], raw[2]])?;
        let humidity = sht31_checked_word([raw[3], raw[4], raw[5]])?;
        Ok(Measurement::TemperatureHumidity {
            temperature_celsius: sht31_temperature_celsius(temperature),
            humidity_percent: sht31_humidity_percent(humidity),
        })
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.closed = true;
        self.bus.close()
    }
}
