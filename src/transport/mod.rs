// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Transports - the I2C bus and serial lines the sensors talk over

mod shared;

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "hardware")]
mod i2c;

#[cfg(test)]
pub(crate) mod mock;

pub use shared::{LineSelector, SharedLine};

#[cfg(feature = "serial")]
pub use serial::SerialPortLine;

#[cfg(feature = "hardware")]
pub use i2c::LinuxI2cBus;

use crate::sensors::TransportError;

/// A device at a fixed address on an I2C bus
pub trait I2cBus: Send {
    /// 7-bit slave address this handle talks to
    fn address(&self) -> u16;

    /// SMBus write byte data: `register <- value`
    fn write_byte_data(&mut self, register: u8, value: u8) -> Result<(), TransportError>;

    /// SMBus read byte data
    fn read_byte_data(&mut self, register: u8) -> Result<u8, TransportError>;

    /// SMBus I2C block read of `len` bytes starting at `register`
    fn read_block_data(&mut self, register: u8, len: u8) -> Result<Vec<u8>, TransportError>;

    /// Release the underlying file descriptor
    fn close(&mut self) -> Result<(), TransportError>;
}

/// A serial line speaking newline-terminated ASCII
pub trait SerialLine: Send {
    /// Port path or logical name
    fn name(&self) -> &str;

    /// Discard anything pending in both directions
    fn reset_buffers(&mut self) -> Result<(), TransportError>;

    /// Discard unread input, such as a reply that arrived after its read timed out
    fn clear_input(&mut self) -> Result<(), TransportError>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read up to and including `\n`; the terminator and any `\r` are stripped
    fn read_line(&mut self) -> Result<String, TransportError>;

    fn close(&mut self) -> Result<(), TransportError>;
}

/// Longest line accepted from a serial device
pub const MAX_LINE_LEN: usize = 256;
