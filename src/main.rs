//! Doorman: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  MqttChannel        UsbRelayBus     MonotonicClock           │
//! │  (MessageChannel)   (SerialBus)     (Clock)                  │
//! │  LogEventSink       ThreadDelay                              │
//! │  (EventSink)        (DelayNs)                                │
//! │                                                              │
//! │  ─────────────────── Port Trait Boundary ──────────────────  │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │          DoorService (pure logic)                      │  │
//! │  │  Validator · Sequencer                                 │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Supervisor (connect · subscribe · announce · listen)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::info;

use doorman::adapters::log_sink::LogEventSink;
use doorman::adapters::mqtt::MqttChannel;
use doorman::adapters::serial::UsbRelayBus;
use doorman::adapters::time::{MonotonicClock, ThreadDelay};
use doorman::app::sequencer::Sequencer;
use doorman::app::service::DoorService;
use doorman::app::validator::Validator;
use doorman::config::DoormanConfig;
use doorman::supervisor::Supervisor;

fn main() -> Result<()> {
    doorman::logging::init().context("installing log subscriber")?;

    info!("=== Doorman v{} ===", env!("CARGO_PKG_VERSION"));

    let config = DoormanConfig::from_env().context("loading configuration")?;
    info!("Config: {}", serde_json::to_string(&config)?);

    // ── Door pipeline ─────────────────────────────────────────
    let sequencer = Sequencer::new(UsbRelayBus::new(), config.serial_device.as_str(), ThreadDelay);
    let service = DoorService::new(Validator::new(config.open_delay()), sequencer, MonotonicClock);

    // ── Supervisor ────────────────────────────────────────────
    let channel = MqttChannel::new(config.mqtt_settings());
    let mut supervisor = Supervisor::new(
        channel,
        service,
        config.topic.as_str(),
        ThreadDelay,
        LogEventSink::new(),
    );

    supervisor.run()
}
