// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! SensorHub - Multi-Sensor Polling Service
//!
//! Reads thermistors, an accelerometer, pressure, temperature/humidity and
//! pulse wave sensors concurrently and publishes their latest status.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sensorhub::streaming::{LogPublisher, LoopExit};
use sensorhub::{build_info, build_manager, run_publish_loop, Config, MqttPublisher, Publisher, SensorManager, VERSION};

/// SensorHub - Multi-Sensor Polling Service
#[derive(Parser, Debug)]
#[command(name = "sensorhub")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Poll serial and I2C sensors concurrently and publish their status")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Demo mode with simulated transports
    #[arg(long)]
    demo: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// MQTT broker address (enables MQTT publishing)
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(mqtt) = args.mqtt_broker.clone() {
        config.publisher.enabled = true;
        config.publisher.broker = mqtt;
    }

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    // Initialize logging
    let filter = if args.trace {
        EnvFilter::new("trace")
    } else if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let info = build_info();
    info!("SensorHub v{} ({}-{})", info.version, info.os, info.target);
    if !info.features.is_empty() {
        info!("   Features: {}", info.features.join(", "));
    }
    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.demo_mode);

    let manager = Arc::new(build_manager(&config)?);
    if manager.is_empty() {
        warn!("No sensors configured");
    }

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(run(config, Arc::clone(&manager)));

    // Stops every worker; a no-op if run() already did
    manager.shutdown();
    info!("SensorHub shutdown complete");
    outcome
}

async fn run(config: Config, manager: Arc<SensorManager>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, cleaning up..."),
            Err(e) => error!("Cannot listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    let publisher: Box<dyn Publisher> = if config.publisher.enabled {
        Box::new(MqttPublisher::new(&config.publisher)?)
    } else {
        info!("MQTT disabled, status goes to the debug log");
        Box::new(LogPublisher)
    };

    info!("🚀 SensorHub running with {} sensors", manager.len());
    info!("   Press Ctrl+C to shutdown");

    let exit = run_publish_loop(
        &manager,
        publisher.as_ref(),
        config.publisher.interval(),
        config.publisher.stop_on_inactive,
        shutdown_rx,
    )
    .await;

    if let LoopExit::SensorInactive(inactive) = &exit {
        warn!("Sensors {:?} inactive, exiting", inactive);
    }

    if let Err(e) = publisher.close().await {
        warn!("Error closing publisher: {:#}", e);
    }

    // Joining worker threads blocks
    let stopping = Arc::clone(&manager);
    tokio::task::spawn_blocking(move || stopping.shutdown()).await?;
    Ok(())
}
