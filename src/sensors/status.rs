// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Shared status records and liveness flags
//!
//! A [`StatusCell`] holds the latest [`StatusRecord`] of one sensor behind an
//! `Arc` swap: the single [`StatusWriter`] builds a complete record and
//! replaces the pointer, readers clone the pointer. A reader therefore always
//! sees every field from exactly one completed cycle.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::ConversionError;
use super::{Measurement, SensorDescriptor};

/// A single published value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

/// Latest converted reading of one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub descriptor: SensorDescriptor,
    /// Completion time of the read; the Unix epoch until the first successful cycle
    pub measured_time: DateTime<Utc>,
    /// Number of completed cycles this record reflects
    pub sequence: u64,
    pub measurement: Measurement,
}

impl StatusRecord {
    /// Zero-valued record for a freshly constructed sensor
    pub fn initial(descriptor: SensorDescriptor) -> Self {
        let measurement = Measurement::zeroed(descriptor.kind());
        Self {
            descriptor,
            measured_time: DateTime::<Utc>::default(),
            sequence: 0,
            measurement,
        }
    }

    /// True while no cycle has completed
    pub fn is_initial(&self) -> bool {
        self.sequence == 0
    }

    /// `measured_time` as fractional seconds since the Unix epoch
    pub fn measured_epoch_secs(&self) -> f64 {
        self.measured_time.timestamp_micros() as f64 / 1_000_000.0
    }

    /// Flat field mapping as published: identity, timestamp and measurement keys
    pub fn to_fields(&self) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        fields.insert("type".to_string(), self.descriptor.kind().tag().into());
        fields.insert("model_number".to_string(), self.descriptor.model_number().into());
        fields.insert("measured_time".to_string(), self.measured_epoch_secs().into());
        for (key, value) in self.measurement.fields() {
            fields.insert(key.to_string(), value.into());
        }
        fields
    }
}

/// Concurrently readable holder of one sensor's latest record
#[derive(Debug)]
pub struct StatusCell {
    current: RwLock<Arc<StatusRecord>>,
}

impl StatusCell {
    /// Create a cell holding the initial record, plus the only writer for it
    pub fn new(descriptor: SensorDescriptor) -> (StatusWriter, Arc<StatusCell>) {
        let cell = Arc::new(Self {
            current: RwLock::new(Arc::new(StatusRecord::initial(descriptor))),
        });
        (StatusWriter { cell: Arc::clone(&cell) }, cell)
    }

    /// Current record; the read lock is held only for the pointer clone
    pub fn load(&self) -> Arc<StatusRecord> {
        Arc::clone(&self.current.read())
    }

    /// Owned copy of the current record
    pub fn snapshot(&self) -> StatusRecord {
        self.load().as_ref().clone()
    }
}

/// Exclusive write handle of a [`StatusCell`]. Not `Clone`: one writer per cell.
#[derive(Debug)]
pub struct StatusWriter {
    cell: Arc<StatusCell>,
}

impl StatusWriter {
    /// Replace the record with a new one built from `measurement`.
    ///
    /// `measured_time` never moves backwards; a wall clock step back is
    /// clamped to the previous value. A measurement of a different kind than
    /// the cell's descriptor is rejected and the record is left untouched.
    pub fn publish(
        &mut self,
        measurement: Measurement,
        measured_time: DateTime<Utc>,
    ) -> Result<Arc<StatusRecord>, ConversionError> {
        let previous = self.cell.load();
        let expected = previous.descriptor.kind();
        if measurement.kind() != expected {
            return Err(ConversionError::Schema {
                expected,
                found: measurement.kind(),
            });
        }

        let next = Arc::new(StatusRecord {
            descriptor: previous.descriptor.clone(),
            measured_time: measured_time.max(previous.measured_time),
            sequence: previous.sequence + 1,
            measurement,
        });
        *self.cell.current.write() = Arc::clone(&next);
        Ok(next)
    }

    pub fn cell(&self) -> &Arc<StatusCell> {
        &self.cell
    }
}

/// Whether a worker is still sampling.
///
/// Starts `true` and goes `false` exactly once; it never comes back.
#[derive(Debug)]
pub struct Liveness {
    alive: AtomicBool,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Mark the worker inactive. Returns true only for the call that made the transition.
    pub fn clear(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
