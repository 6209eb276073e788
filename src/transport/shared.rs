// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Serial line shared by several sensors
//!
//! Devices on one physical line are selected with a signal byte, so a
//! request and its response form one transaction that must not interleave
//! with another device's. Every clone of a [`SharedLine`] is one sensor's
//! handle; the line itself is closed when the last handle is released.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use super::SerialLine;
use crate::sensors::TransportError;

/// Mutual exclusion over one physical serial line
#[derive(Clone)]
pub struct SharedLine {
    name: Arc<str>,
    line: Arc<Mutex<Box<dyn SerialLine>>>,
    lock_timeout: Duration,
}

impl SharedLine {
    pub fn new(line: Box<dyn SerialLine>, lock_timeout: Duration) -> Self {
        Self {
            name: Arc::from(line.name()),
            line: Arc::new(Mutex::new(line)),
            lock_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live handles on this line
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.line)
    }

    /// Run one transaction with exclusive access to the line.
    ///
    /// Waits at most the configured lock timeout. The lock is released on
    /// every exit path and handed to the longest waiter, so sensors polling
    /// at different rates cannot starve each other.
    pub fn with_lock<R>(
        &self,
        body: impl FnOnce(&mut dyn SerialLine) -> R,
    ) -> Result<R, TransportError> {
        let mut guard = self
            .line
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| TransportError::LockTimeout {
                line: self.name.to_string(),
                waited: self.lock_timeout,
            })?;
        trace!("Acquired shared line {}", self.name);
        let result = body(&mut **guard);
        MutexGuard::unlock_fair(guard);
        Ok(result)
    }

    /// Give up this handle. The physical line is closed by the last one.
    pub fn release(self) -> Result<(), TransportError> {
        let name = self.name;
        match Arc::into_inner(self.line) {
            Some(line) => {
                debug!("Closing shared line {}", name);
                line.into_inner().close()
            }
            None => {
                debug!("Released handle on shared line {}", name);
                Ok(())
            }
        }
    }
}

/// One device's view of a shared line: a line handle plus its selection signal
#[derive(Debug)]
pub struct LineSelector {
    line: Option<SharedLine>,
    signal: String,
}

impl LineSelector {
    pub fn new(line: SharedLine, signal: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            signal: signal.into(),
        }
    }

    pub fn signal(&self) -> &str {
        &self.signal
    }

    pub fn location(&self) -> String {
        match &self.line {
            Some(line) => format!("{}#{}", line.name(), self.signal),
            None => format!("closed#{}", self.signal),
        }
    }

    fn line(&self) -> Result<&SharedLine, TransportError> {
        self.line.as_ref().ok_or(TransportError::Closed)
    }

    /// Flush both directions of the line
    pub fn reset(&self) -> Result<(), TransportError> {
        self.line()?.with_lock(|line| line.reset_buffers())?
    }

    /// Send the signal and read the response as one transaction.
    ///
    /// Input left over from an earlier transaction (a late reply, or the rest
    /// of an over-long line) is discarded first, so it is never taken as the
    /// answer to this signal.
    pub fn request(&self) -> Result<String, TransportError> {
        let signal = self.signal.as_bytes();
        self.line()?.with_lock(|line| {
            line.clear_input()?;
            line.write_all(signal)?;
            line.read_line()
        })?
    }

    /// Release this device's handle. Later calls report `Closed`.
    pub fn release(&mut self) -> Result<(), TransportError> {
        self.line.take().ok_or(TransportError::Closed)?.release()
    }
}

impl fmt::Debug for SharedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLine")
            .field("name", &self.name)
            .field("handles", &self.handles())
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}
