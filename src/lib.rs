// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! SensorHub - Multi-Sensor Polling Service
//!
//! Polls a set of heterogeneous sensors concurrently and keeps a consistent,
//! always-readable latest value for each:
//! - One sampling thread per sensor, each at its own interval
//! - Serial lines shared by several sensors, one transaction at a time
//! - Tear-free status snapshots and per-sensor liveness
//! - Periodic MQTT publication of the combined status
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Sensor Manager                       │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐  │
//! │  │  Worker  │  │  Worker  │  │  Worker  │  │  Worker  │  │
//! │  │ thermist.│  │ accel.   │  │ pressure │  │  SHT31   │  │
//! │  └──────────┘  └──────────┘  └──────────┘  └──────────┘  │
//! │       ↓             ↓             ↓             ↓        │
//! │  ┌──────────────────────────┐  ┌───────────────────────┐ │
//! │  │   Shared serial line     │  │        I2C bus        │ │
//! │  └──────────────────────────┘  └───────────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//!              ↓ snapshot / liveness
//!        ┌────────────┐
//!        │ Publisher  │ → MQTT
//!        └────────────┘
//! ```

pub mod config;
pub mod sensors;
pub mod streaming;
pub mod transport;

// Re-exports for convenience
pub use config::Config;
pub use sensors::{build_manager, SensorKind, SensorManager, StatusRecord};
pub use streaming::{run_publish_loop, MqttPublisher, Publisher};

/// SensorHub version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SensorHub name
pub const NAME: &str = "SensorHub";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    let mut features = vec![];

    #[cfg(feature = "serial")]
    features.push("serial".to_string());

    #[cfg(feature = "hardware")]
    features.push("hardware".to_string());

    features
}
