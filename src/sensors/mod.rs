// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Sensor module - device drivers, sampling workers and the manager

pub mod convert;
mod error;
mod factory;
mod manager;
mod status;
mod traits;
mod worker;

pub mod environmental;
pub mod pulse;
pub mod seismic;
pub mod simulator;
pub mod thermal;

pub use error::{ConversionError, ReadError, SetupError, TransportError, WorkerError};
pub use factory::{
    build_manager, build_manager_with, HardwareTransports, SimulatedTransports, TransportProvider,
};
pub use manager::{SensorIndex, SensorManager, StatusPayload};
pub use status::{FieldValue, Liveness, StatusCell, StatusRecord, StatusWriter};
pub use traits::{Measurement, SensorDescriptor, SensorDevice, SensorKind};
pub use worker::{ReadFailurePolicy, SensorWorker, WorkerConfig};

pub use environmental::{PressureSensor, TemperatureHumiditySensor};
pub use pulse::PulseWaveSensor;
pub use seismic::Accelerometer;
pub use thermal::Thermistor;
