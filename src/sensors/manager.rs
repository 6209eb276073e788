// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Sensor manager - aggregates all workers

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::status::{FieldValue, StatusRecord};
use super::worker::SensorWorker;

/// 1-origin position of a sensor in construction order
pub type SensorIndex = usize;

/// Per-sensor field mappings keyed by the index as a string
pub type StatusPayload = BTreeMap<String, BTreeMap<String, FieldValue>>;

/// Owns every sensor worker for the life of the process.
///
/// Workers are already running when handed over. The manager answers
/// snapshot and liveness queries and, on [`shutdown`](Self::shutdown) or
/// drop, stops every worker.
pub struct SensorManager {
    sensors: Vec<(SensorIndex, SensorWorker)>,
    shut_down: AtomicBool,
}

impl SensorManager {
    pub fn new(workers: impl IntoIterator<Item = SensorWorker>) -> Self {
        let sensors: Vec<_> = workers
            .into_iter()
            .enumerate()
            .map(|(i, worker)| (i + 1, worker))
            .collect();

        for (index, worker) in &sensors {
            info!(
                "Sensor {}: {} ({}) at {}{}",
                index,
                worker.descriptor().kind(),
                worker.descriptor().model_number(),
                worker.location(),
                if worker.is_alive() { "" } else { " [inactive]" }
            );
        }

        Self {
            sensors,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn get(&self, index: SensorIndex) -> Option<&SensorWorker> {
        index
            .checked_sub(1)
            .and_then(|i| self.sensors.get(i))
            .map(|(_, worker)| worker)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorIndex, &SensorWorker)> {
        self.sensors.iter().map(|(index, worker)| (*index, worker))
    }

    /// Point-in-time copy of every sensor's record.
    ///
    /// Records are copied one sensor at a time, so different sensors may
    /// reflect different cycles; each record's `measured_time` says which.
    pub fn snapshot(&self) -> BTreeMap<SensorIndex, StatusRecord> {
        self.iter()
            .map(|(index, worker)| (index, worker.status().as_ref().clone()))
            .collect()
    }

    /// Liveness of each sensor, ordered by index
    pub fn liveness_snapshot(&self) -> Vec<bool> {
        self.iter().map(|(_, worker)| worker.is_alive()).collect()
    }

    /// Same as [`liveness_snapshot`](Self::liveness_snapshot)
    pub fn active_sensors(&self) -> Vec<bool> {
        self.liveness_snapshot()
    }

    /// True when no sensor has gone inactive
    pub fn all_alive(&self) -> bool {
        self.iter().all(|(_, worker)| worker.is_alive())
    }

    /// Indices of inactive sensors
    pub fn inactive(&self) -> Vec<SensorIndex> {
        self.iter()
            .filter(|(_, worker)| !worker.is_alive())
            .map(|(index, _)| index)
            .collect()
    }

    /// Publisher view of [`snapshot`](Self::snapshot)
    pub fn payload(&self) -> StatusPayload {
        self.snapshot()
            .into_iter()
            .map(|(index, record)| (index.to_string(), record.to_fields()))
            .collect()
    }

    /// Stop every worker and release its transport.
    ///
    /// Each worker is stopped independently; a problem with one is logged
    /// and the rest are still stopped. Calling this again is a no-op.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("Sensor manager already shut down");
            return;
        }
        info!("Shutting down {} sensors...", self.sensors.len());
        for (index, worker) in &self.sensors {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| worker.shutdown()));
            if outcome.is_err() {
                warn!("Error stopping sensor {} at {}", index, worker.location());
            }
        }
        info!("All sensors stopped");
    }
}

impl Drop for SensorManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
