// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Scripted transports for tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::{I2cBus, SerialLine};
use crate::sensors::TransportError;

/// Something that happened on a mock transport
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Reset,
    Write(String),
    Read(String),
    RegWrite(u8, u8),
    RegRead(u8),
    BlockRead(u8, u8),
    Close,
}

/// Shared view into a mock transport that outlives the transport itself
#[derive(Debug, Clone, Default)]
pub(crate) struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    closes: Arc<AtomicUsize>,
}

impl Recorder {
    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

type Responder = Box<dyn FnMut(&str) -> Result<String, TransportError> + Send>;

/// Serial line answering each written signal through a responder
pub(crate) struct MockLine {
    name: String,
    recorder: Recorder,
    responder: Responder,
    pending: Option<String>,
    turnaround: Duration,
    closed: bool,
}

impl MockLine {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            recorder: Recorder::default(),
            responder: Box::new(|signal| Ok(format!("{}.0", signal))),
            pending: None,
            turnaround: Duration::ZERO,
            closed: false,
        }
    }

    /// Fixed reply per signal
    pub(crate) fn with_replies(mut self, replies: &[(&str, &str)]) -> Self {
        let table: HashMap<String, String> = replies
            .iter()
            .map(|(s, r)| (s.to_string(), r.to_string()))
            .collect();
        self.responder = Box::new(move |signal| {
            table
                .get(signal)
                .cloned()
                .ok_or(TransportError::Timeout)
        });
        self
    }

    pub(crate) fn with_responder(
        mut self,
        responder: impl FnMut(&str) -> Result<String, TransportError> + Send + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    /// Delay between a request and its response
    pub(crate) fn with_turnaround(mut self, turnaround: Duration) -> Self {
        self.turnaround = turnaround;
        self
    }

    pub(crate) fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }
}

impl SerialLine for MockLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset_buffers(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.pending = None;
        self.recorder.record(Event::Reset);
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.pending = None;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let signal = String::from_utf8_lossy(bytes).to_string();
        self.recorder.record(Event::Write(signal.clone()));
        self.pending = Some(signal);
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if !self.turnaround.is_zero() {
            thread::sleep(self.turnaround);
        }
        let signal = self.pending.take().ok_or(TransportError::Timeout)?;
        let reply = (self.responder)(&signal)?;
        self.recorder.record(Event::Read(signal));
        Ok(reply)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.closed = true;
        self.recorder.record(Event::Close);
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// How a device misbehaves when closed
#[derive(Debug, Clone, Copy)]
pub(crate) enum CloseFault {
    Error,
    Panic,
}

/// I2C device backed by a register map
pub(crate) struct MockBus {
    address: u16,
    recorder: Recorder,
    registers: HashMap<u8, u8>,
    blocks: HashMap<u8, VecDeque<Vec<u8>>>,
    failing_writes: usize,
    failing_reads: usize,
    close_fault: Option<CloseFault>,
    closed: bool,
}

impl MockBus {
    pub(crate) fn new(address: u16) -> Self {
        Self {
            address,
            recorder: Recorder::default(),
            registers: HashMap::new(),
            blocks: HashMap::new(),
            failing_writes: 0,
            failing_reads: 0,
            close_fault: None,
            closed: false,
        }
    }

    pub(crate) fn with_register(mut self, register: u8, value: u8) -> Self {
        self.registers.insert(register, value);
        self
    }

    pub(crate) fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        for (i, v) in values.iter().enumerate() {
            self.registers.insert(start + i as u8, *v);
        }
        self
    }

    /// Queue a block returned by the next block read at `register`.
    /// The last queued block repeats once the queue drains.
    pub(crate) fn with_block(mut self, register: u8, block: &[u8]) -> Self {
        self.blocks.entry(register).or_default().push_back(block.to_vec());
        self
    }

    /// Fail the next `n` register writes
    pub(crate) fn failing_writes(mut self, n: usize) -> Self {
        self.failing_writes = n;
        self
    }

    /// Fail the next `n` reads of any kind
    pub(crate) fn failing_reads(mut self, n: usize) -> Self {
        self.failing_reads = n;
        self
    }

    /// Report an I/O error from `close` instead of closing
    pub(crate) fn failing_close(mut self) -> Self {
        self.close_fault = Some(CloseFault::Error);
        self
    }

    /// Panic inside `close`
    pub(crate) fn panicking_close(mut self) -> Self {
        self.close_fault = Some(CloseFault::Panic);
        self
    }

    pub(crate) fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    fn check_read(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(TransportError::Timeout);
        }
        Ok(())
    }
}

impl I2cBus for MockBus {
    fn address(&self) -> u16 {
        self.address
    }

    fn write_byte_data(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "remote I/O error",
            )));
        }
        self.recorder.record(Event::RegWrite(register, value));
        Ok(())
    }

    fn read_byte_data(&mut self, register: u8) -> Result<u8, TransportError> {
        self.check_read()?;
        self.recorder.record(Event::RegRead(register));
        Ok(self.registers.get(&register).copied().unwrap_or(0))
    }

    fn read_block_data(&mut self, register: u8, len: u8) -> Result<Vec<u8>, TransportError> {
        self.check_read()?;
        self.recorder.record(Event::BlockRead(register, len));
        let block = match self.blocks.get_mut(&register) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(block.into_iter().take(len as usize).collect())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match self.close_fault {
            Some(CloseFault::Error) => {
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "bus locked up",
                )))
            }
            Some(CloseFault::Panic) => panic!("bus {:#04x} wedged on close", self.address),
            None => {}
        }
        self.closed = true;
        self.recorder.record(Event::Close);
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
