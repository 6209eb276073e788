// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! I2C devices through Linux i2c-dev

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use tracing::debug;

use super::I2cBus;
use crate::sensors::TransportError;

/// One slave address on a Linux I2C adapter such as `/dev/i2c-1`
pub struct LinuxI2cBus {
    path: String,
    address: u16,
    device: Option<LinuxI2CDevice>,
}

impl LinuxI2cBus {
    pub fn open(path: &str, address: u16) -> Result<Self, TransportError> {
        let device = LinuxI2CDevice::new(path, address)?;
        debug!("Opened {} at address {:#04x}", path, address);
        Ok(Self {
            path: path.to_string(),
            address,
            device: Some(device),
        })
    }

    fn device(&mut self) -> Result<&mut LinuxI2CDevice, TransportError> {
        self.device.as_mut().ok_or(TransportError::Closed)
    }
}

impl I2cBus for LinuxI2cBus {
    fn address(&self) -> u16 {
        self.address
    }

    fn write_byte_data(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        self.device()?.smbus_write_byte_data(register, value)?;
        Ok(())
    }

    fn read_byte_data(&mut self, register: u8) -> Result<u8, TransportError> {
        Ok(self.device()?.smbus_read_byte_data(register)?)
    }

    fn read_block_data(&mut self, register: u8, len: u8) -> Result<Vec<u8>, TransportError> {
        Ok(self.device()?.smbus_read_i2c_block_data(register, len)?)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match self.device.take() {
            Some(device) => {
                drop(device);
                debug!("Closed {} address {:#04x}", self.path, self.address);
                Ok(())
            }
            None => Err(TransportError::Closed),
        }
    }
}
