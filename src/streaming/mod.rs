// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Streaming module - periodic publication of sensor status

mod mqtt;

pub use mqtt::*;

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::sensors::{SensorIndex, SensorManager, StatusPayload};

/// Publisher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Publish over MQTT; otherwise status is only logged
    pub enabled: bool,
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub topic: String,

    /// Publication period
    pub interval_ms: u64,

    /// Stop publishing once any sensor goes inactive
    pub stop_on_inactive: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "sensorhub".to_string(),
            username: None,
            password: None,
            topic: "sensorhub/status".to_string(),
            interval_ms: 1000,
            stop_on_inactive: true,
        }
    }
}

impl PublisherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Destination for status payloads
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, payload: &StatusPayload) -> Result<()>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Writes each payload to the log at debug level
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, payload: &StatusPayload) -> Result<()> {
        debug!("Status: {}", serde_json::to_string(payload)?);
        Ok(())
    }
}

/// Why the publish loop returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    /// Publication is gated on liveness and these sensors went inactive
    SensorInactive(Vec<SensorIndex>),
}

/// Publish the manager's payload every `interval` until shutdown.
///
/// With `stop_on_inactive` the loop only publishes while every sensor is
/// alive and returns as soon as one is not. Without it, publication carries
/// on and each sensor going inactive is logged once. A failed publish is
/// logged and the next tick tries again.
pub async fn run_publish_loop(
    manager: &SensorManager,
    publisher: &dyn Publisher,
    interval: Duration,
    stop_on_inactive: bool,
    mut shutdown: broadcast::Receiver<()>,
) -> LoopExit {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reported: BTreeSet<SensorIndex> = BTreeSet::new();
    let mut published: u64 = 0;

    info!("Publishing status every {:?}", interval);
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Publish loop stopping after {} payloads", published);
                return LoopExit::Shutdown;
            }
            _ = ticker.tick() => {}
        }

        let inactive = manager.inactive();
        for index in &inactive {
            if reported.insert(*index) {
                if let Some(worker) = manager.get(*index) {
                    warn!(
                        "Sensor {} ({} at {}) is inactive",
                        index,
                        worker.descriptor().kind(),
                        worker.location()
                    );
                }
            }
        }
        if stop_on_inactive && !inactive.is_empty() {
            info!("Stopping publication, inactive sensors: {:?}", inactive);
            return LoopExit::SensorInactive(inactive);
        }

        let payload = manager.payload();
        match publisher.publish(&payload).await {
            Ok(()) => published += 1,
            Err(e) => warn!("Publish failed: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::convert::sensirion_crc;
    use crate::sensors::environmental::{lps25h, sht31};
    use crate::sensors::{PressureSensor, SensorWorker, TemperatureHumiditySensor, WorkerConfig};
    use crate::transport::mock::MockBus;
    use anyhow::anyhow;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        payloads: Mutex<Vec<StatusPayload>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, payload: &StatusPayload) -> Result<()> {
            self.payloads.lock().push(payload.clone());
            Ok(())
        }
    }

    struct FailingPublisher {
        attempts: Mutex<usize>,
    }

    #[async_trait]
    impl Publisher for FailingPublisher {
        async fn publish(&self, _payload: &StatusPayload) -> Result<()> {
            *self.attempts.lock() += 1;
            Err(anyhow!("broker unreachable"))
        }
    }

    fn every_ms(ms: u64) -> WorkerConfig {
        WorkerConfig::new(Duration::from_millis(ms))
    }

    fn sht31_worker() -> SensorWorker {
        let t = 0x6666u16.to_be_bytes();
        let h = 0x8000u16.to_be_bytes();
        let frame = [t[0], t[1], sensirion_crc(t), h[0], h[1], sensirion_crc(h)];
        let bus = MockBus::new(sht31::DEFAULT_ADDRESS).with_block(0x00, &frame);
        SensorWorker::start(TemperatureHumiditySensor::new(Box::new(bus)), every_ms(5))
    }

    fn dead_lps25h_worker() -> SensorWorker {
        let bus = MockBus::new(lps25h::DEFAULT_ADDRESS).with_register(lps25h::WHO_AM_I, 0x00);
        SensorWorker::start(PressureSensor::new(Box::new(bus)), every_ms(5))
    }

    fn stop_after(ms: u64) -> broadcast::Receiver<()> {
        let (tx, rx) = broadcast::channel(1);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            let _ = tx.send(());
        });
        rx
    }

    #[tokio::test]
    async fn test_publishes_until_shutdown() {
        let manager = SensorManager::new(vec![sht31_worker()]);
        let publisher = RecordingPublisher::default();

        let exit = run_publish_loop(&manager, &publisher, Duration::from_millis(10), true, stop_after(80)).await;

        assert_eq!(exit, LoopExit::Shutdown);
        let payloads = publisher.payloads.lock();
        assert!(payloads.len() >= 2);
        assert!(payloads.iter().all(|p| p.contains_key("1")));
    }

    #[tokio::test]
    async fn test_stops_when_sensor_inactive() {
        let manager = SensorManager::new(vec![sht31_worker(), dead_lps25h_worker()]);
        let publisher = RecordingPublisher::default();

        let exit = run_publish_loop(&manager, &publisher, Duration::from_millis(10), true, stop_after(5000)).await;

        assert_eq!(exit, LoopExit::SensorInactive(vec![2]));
        assert!(publisher.payloads.lock().is_empty());
    }

    #[tokio::test]
    async fn test_ungated_loop_keeps_publishing() {
        let manager = SensorManager::new(vec![sht31_worker(), dead_lps25h_worker()]);
        let publisher = RecordingPublisher::default();

        let exit = run_publish_loop(&manager, &publisher, Duration::from_millis(10), false, stop_after(80)).await;

        assert_eq!(exit, LoopExit::Shutdown);
        let payloads = publisher.payloads.lock();
        assert!(payloads.len() >= 2);
        assert_eq!(payloads[0].len(), 2);
    }

    #[tokio::test]
    async fn test_publish_errors_do_not_end_loop() {
        let manager = SensorManager::new(vec![sht31_worker()]);
        let publisher = FailingPublisher { attempts: Mutex::new(0) };

        let exit = run_publish_loop(&manager, &publisher, Duration::from_millis(10), true, stop_after(80)).await;

        assert_eq!(exit, LoopExit::Shutdown);
        assert!(*publisher.attempts.lock() >= 2);
    }

    #[test]
    fn test_publisher_config_defaults() {
        let config = PublisherConfig::default();
        assert!(!config.enabled);
        assert!(config.stop_on_inactive);
        assert_eq!(config.interval(), Duration::from_secs(1));
    }
}
