// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! MQTT publisher for sensor status

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Publisher, PublisherConfig};
use crate::sensors::StatusPayload;

/// Publishes the status payload as JSON to one topic
pub struct MqttPublisher {
    client: AsyncClient,
    topic: String,
    eventloop: JoinHandle<()>,
}

impl MqttPublisher {
    /// Create the client and start its event loop. Must be called inside a tokio runtime.
    pub fn new(config: &PublisherConfig) -> Result<Self> {
        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(30));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);

        // Spawn eventloop handler
        let eventloop = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                    }
                    Ok(Event::Incoming(Packet::PubAck(ack))) => {
                        debug!("MQTT ack for packet {}", ack.pkid);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT error: {:?}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        info!(
            "MQTT publisher for {}:{} on topic {}",
            config.broker, config.port, config.topic
        );
        Ok(Self {
            client,
            topic: config.topic.clone(),
            eventloop,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, payload: &StatusPayload) -> Result<()> {
        let json = serde_json::to_vec(payload)?;

        self.client
            .publish(&self.topic, QoS::AtLeastOnce, false, json)
            .await
            .map_err(|e| anyhow!("MQTT publish failed: {}", e))?;

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| anyhow!("MQTT disconnect failed: {}", e))?;
        Ok(())
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.eventloop.abort();
    }
}
