//! Runtime configuration
//!
//! Every tunable is read once at startup from the process environment.
//! Empty values count as unset, so `FOO=` falls back to the default.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::mqtt::{self, MqttSettings, TlsFiles};
use crate::error::ConfigError;

pub const DEFAULT_SERIAL_DEVICE: &str = "/dev/ttyUSB0";
pub const DEFAULT_OPEN_DELAY_SECS: u64 = 5;
pub const DEFAULT_CA_CERT: &str = "/etc/ssl/certs/ca-certificates.crt";
pub const DEFAULT_CLIENT_CERT: &str = "/etc/greengrass-certs/cloud.pem.crt";
pub const DEFAULT_CLIENT_KEY: &str = "/etc/greengrass-certs/cloud.pem.key";

/// Effective daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoormanConfig {
    // --- Broker ---
    /// Topic carrying both commands and the liveness announcement
    pub topic: String,
    /// Broker host name
    pub endpoint: String,
    pub port: u16,
    /// MQTT client id
    pub device_name: String,
    /// `false` connects without TLS (local brokers only)
    pub tls: bool,
    pub ca_cert_path: PathBuf,
    pub client_cert_path: PathBuf,
    pub client_key_path: PathBuf,

    // --- Relay ---
    pub serial_device: String,
    /// Minimum spacing between two actuations (whole seconds)
    pub open_delay_secs: u64,
}

impl DoormanConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolve through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        Ok(Self {
            topic: required("IOT_TOPIC")?,
            endpoint: required("IOT_ENDPOINT")?,
            port: parse_or("IOT_PORT", get("IOT_PORT"), mqtt::DEFAULT_PORT)?,
            device_name: required("DEVICE_NAME")?,
            tls: parse_bool("MQTT_TLS", get("MQTT_TLS"), true)?,
            ca_cert_path: get("CA_CERT_PATH")
                .unwrap_or_else(|| DEFAULT_CA_CERT.to_owned())
                .into(),
            client_cert_path: get("CLIENT_CERT_PATH")
                .unwrap_or_else(|| DEFAULT_CLIENT_CERT.to_owned())
                .into(),
            client_key_path: get("CLIENT_KEY_PATH")
                .unwrap_or_else(|| DEFAULT_CLIENT_KEY.to_owned())
                .into(),
            serial_device: get("SERIAL_DEVICE").unwrap_or_else(|| DEFAULT_SERIAL_DEVICE.to_owned()),
            open_delay_secs: parse_or(
                "OPEN_DELAY_SECONDS",
                get("OPEN_DELAY_SECONDS"),
                DEFAULT_OPEN_DELAY_SECS,
            )?,
        })
    }

    pub fn open_delay(&self) -> Duration {
        Duration::from_secs(self.open_delay_secs)
    }

    /// Broker settings for the channel adapter.  Certificate files are
    /// only read when a session is opened.
    pub fn mqtt_settings(&self) -> MqttSettings {
        MqttSettings {
            client_id: self.device_name.clone(),
            host: self.endpoint.clone(),
            port: self.port,
            keep_alive: mqtt::KEEP_ALIVE,
            tls: self.tls.then(|| TlsFiles {
                ca: self.ca_cert_path.clone(),
                cert: self.client_cert_path.clone(),
                key: self.client_key_path.clone(),
            }),
        }
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: format!("'{}': {}", v, e),
        }),
    }
}

fn parse_bool(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var,
                reason: format!("'{}' is not a boolean", v),
            }),
        },
    }
}
