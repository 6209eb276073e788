// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Pulse wave sensor

use super::error::{ConversionError, ReadError, SetupError, TransportError};
use super::{Measurement, SensorDescriptor, SensorDevice, SensorKind};
use crate::transport::I2cBus;

/// BH1792GLC register map (the subset in use)
pub mod bh1792 {
    pub const DEFAULT_ADDRESS: u16 = 0x5B;
    pub const MANUFACTURER_ID: u8 = 0x0F;
    pub const MANUFACTURER_ID_VALUE: u8 = 0xE0;
    pub const PART_ID: u8 = 0x10;
    pub const PART_ID_VALUE: u8 = 0x0E;
    pub const RESET: u8 = 0x40;
    pub const RESET_SWRESET: u8 = 0x80;
    pub const MEAS_CONTROL1: u8 = 0x41;
    /// RDY, green channel, single measurement mode
    pub const MEAS_CONTROL1_SINGLE: u8 = 0x85;
    pub const MEAS_CONTROL2: u8 = 0x42;
    /// LED1 enabled at the lowest current step
    pub const MEAS_CONTROL2_LED: u8 = 0x0F;
    pub const MEAS_START: u8 = 0x47;
    pub const MEAS_START_FLAG: u8 = 0x01;
    /// Green channel LED-on count, LSB first
    pub const DATAOUT_LEDON: u8 = 0x56;
}

/// BH1792GLC optical pulse sensor in single-measurement mode.
///
/// Publishes the green LED-on photodiode count per cycle as `heart_bpm`.
pub struct PulseWaveSensor {
    descriptor: SensorDescriptor,
    bus: Box<dyn I2cBus>,
    closed: bool,
}

impl PulseWaveSensor {
    pub fn new(bus: Box<dyn I2cBus>) -> Self {
        Self::with_model(bus, SensorKind::PulseWaveSensor.default_model())
    }

    pub fn with_model(bus: Box<dyn I2cBus>, model_number: &str) -> Self {
        Self {
            descriptor: SensorDescriptor::new(SensorKind::PulseWaveSensor, model_number),
            bus,
            closed: false,
        }
    }

    fn expect_register(&mut self, register: u8, expected: u8) -> Result<(), SetupError> {
        let found = self.bus.read_byte_data(register)?;
        if found != expected {
            return Err(SetupError::Identity { register, expected, found });
        }
        Ok(())
    }
}

impl SensorDevice for PulseWaveSensor {
    type Raw = [u8; 2];

    fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    fn location(&self) -> String {
        format!("i2c:{:#04x}", self.bus.address())
    }

    fn setup(&mut self) -> Result<(), SetupError> {
        self.bus.write_byte_data(bh1792::RESET, bh1792::RESET_SWRESET)?;
        self.expect_register(bh1792::MANUFACTURER_ID, bh1792::MANUFACTURER_ID_VALUE)?;
        self.expect_register(bh1792::PART_ID, bh1792::PART_ID_VALUE)?;
        self.bus
            .write_byte_data(bh1792::MEAS_CONTROL1, bh1792::MEAS_CONTROL1_SINGLE)?;
        self.bus
            .write_byte_data(bh1792::MEAS_CONTROL2, bh1792::MEAS_CONTROL2_LED)?;
        Ok(())
    }

    fn sample(&mut self) -> Result<[u8; 2], ReadError> {
        self.bus
            .write_byte_data(bh1792::MEAS_START, bh1792::MEAS_START_FLAG)?;
        let block = self.bus.read_block_data(bh1792::DATAOUT_LEDON, 2)?;
        block.as_slice().try_into().map_err(|_| ReadError::ShortRead {
            expected: 2,
            got: block.len(),
        })
    }

    fn convert(&self, raw: [u8; 2]) -> Result<Measurement, ConversionError> {
        Ok(Measurement::PulseWave {
            heart_bpm: u16::from_le_bytes(raw) as f64,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{Event, MockBus};

    fn genuine() -> MockBus {
        MockBus::new(bh1792::DEFAULT_ADDRESS)
            .with_register(bh1792::MANUFACTURER_ID, bh1792::MANUFACTURER_ID_VALUE)
            .with_register(bh1792::PART_ID, bh1792::PART_ID_VALUE)
    }

    #[test]
    fn test_setup_resets_then_identifies() {
        let bus = genuine();
        let recorder = bus.recorder();
        let mut sensor = PulseWaveSensor::new(Box::new(bus));
        sensor.setup().unwrap();
        let events = recorder.events();
        assert_eq!(events[0], Event::RegWrite(0x40, 0x80));
        assert_eq!(events[1], Event::RegRead(0x0F));
        assert_eq!(events[2], Event::RegRead(0x10));
    }

    #[test]
    fn test_wrong_part_fails_setup() {
        let bus = MockBus::new(bh1792::DEFAULT_ADDRESS)
            .with_register(bh1792::MANUFACTURER_ID, bh1792::MANUFACTURER_ID_VALUE)
            .with_register(bh1792::PART_ID, 0x99);
        let mut sensor = PulseWaveSensor::new(Box::new(bus));
        assert!(matches!(
            sensor.setup(),
            Err(SetupError::Identity { register: 0x10, found: 0x99, .. })
        ));
    }

    #[test]
    fn test_sample_little_endian_count() {
        let bus = genuine().with_block(bh1792::DATAOUT_LEDON, &[0x34, 0x12]);
        let mut sensor = PulseWaveSensor::new(Box::new(bus));
        let raw = sensor.sample().unwrap();
        assert_eq!(
            sensor.convert(raw).unwrap(),
            Measurement::PulseWave { heart_bpm: 4660.0 }
        );
    }
}
