// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Error taxonomy for transports and sensor workers

use std::time::Duration;
use thiserror::Error;

use super::SensorKind;

/// Failure of a single bus or serial transaction
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction timed out")]
    Timeout,

    #[error("timed out after {waited:?} waiting for shared line '{line}'")]
    LockTimeout { line: String, waited: Duration },

    #[error("transport already closed")]
    Closed,

    #[error("malformed frame: {0}")]
    Frame(String),

    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[cfg(feature = "hardware")]
    #[error("I2C error: {0}")]
    I2c(#[from] i2cdev::linux::LinuxI2CError),
}

/// One-time device handshake failed; fatal to that sensor only
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("setup transaction failed: {0}")]
    Transport(#[from] TransportError),

    #[error("unexpected identity at register {register:#04x}: expected {expected:#04x}, found {found:#04x}")]
    Identity { register: u8, expected: u8, found: u8 },
}

/// Transient per-cycle sampling failure
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("read transaction failed: {0}")]
    Transport(#[from] TransportError),

    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
}

/// Raw reading could not be turned into engineering units
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("cannot parse '{input}' as a number")]
    Parse { input: String },

    #[error("expected {expected} values in '{input}'")]
    FieldCount { input: String, expected: usize },

    #[error("checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    Checksum { computed: u8, received: u8 },

    #[error("measurement for {found:?} published into a {expected:?} record")]
    Schema { expected: SensorKind, found: SensorKind },
}

/// Anything that can end one cycle of a worker loop
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl From<TransportError> for WorkerError {
    fn from(e: TransportError) -> Self {
        WorkerError::Read(ReadError::Transport(e))
    }
}
