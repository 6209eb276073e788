// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Serial line backed by a real port

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use super::{SerialLine, MAX_LINE_LEN};
use crate::sensors::TransportError;

/// A serial port opened with a per-read timeout
pub struct SerialPortLine {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortLine {
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
        debug!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self {
            path: path.to_string(),
            port: Some(port),
        })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::Closed)
    }
}

impl SerialLine for SerialPortLine {
    fn name(&self) -> &str {
        &self.path
    }

    fn reset_buffers(&mut self) -> Result<(), TransportError> {
        self.port()?.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        let port = self.port()?;
        let mut line = Vec::with_capacity(32);
        let mut byte = [0u8; 1];
        loop {
            match port.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if line.len() > MAX_LINE_LEN {
                        return Err(TransportError::Frame(format!(
                            "no terminator within {} bytes",
                            MAX_LINE_LEN
                        )));
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => return Err(TransportError::Timeout),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        let text = String::from_utf8(line)
            .map_err(|e| TransportError::Frame(format!("non UTF-8 line: {}", e)))?;
        Ok(text.trim_end_matches('\r').to_string())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match self.port.take() {
            Some(port) => {
                drop(port);
                debug!("Closed serial port {}", self.path);
                Ok(())
            }
            None => Err(TransportError::Closed),
        }
    }
}
