//! Configuration management
//!
//! Two layers:
//! - `BridgeConfig`: the resolved, strongly typed value a session runs with
//! - `Config`: the TOML settings file (`[bridge]`, `[logs]`, `[heartbeat]`)
//!
//! Only `Config::to_bridge_config` turns file settings into a `BridgeConfig`.

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_SERIAL_PORT, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    MAX_HEARTBEAT_INTERVAL_SECS,
};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Config file name, looked up next to the executable
pub const CONFIG_FILE_NAME: &str = "bridge.toml";

// =============================================================================
// Resolved session configuration
// =============================================================================

/// How relayed bytes are rendered into log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// Traffic is not logged
    #[default]
    Off,
    /// `{tag}:{bytes as text}`
    Text,
    /// `{tag}: {lowercase hex}`
    Hex,
}

impl LogMode {
    /// Derive the mode from the two user-facing switches
    ///
    /// Hex rendering only applies while traffic printing is enabled.
    pub fn from_flags(print: bool, hex: bool) -> Self {
        match (print, hex) {
            (false, _) => Self::Off,
            (true, false) => Self::Text,
            (true, true) => Self::Hex,
        }
    }
}

/// Heartbeat settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    /// Raw text, or a hex string when `payload_is_hex` is set
    pub payload: String,
    pub payload_is_hex: bool,
    /// 0 = send once after connecting
    pub interval_secs: u64,
}

impl HeartbeatConfig {
    /// Decode the payload into the bytes put on the wire
    ///
    /// Returns `Ok(None)` when the heartbeat is disabled or the payload is empty.
    pub fn decode_payload(&self) -> Result<Option<Vec<u8>>> {
        if !self.enabled || self.payload.is_empty() {
            return Ok(None);
        }
        if self.interval_secs > MAX_HEARTBEAT_INTERVAL_SECS {
            return Err(BridgeError::HeartbeatPayload {
                reason: format!(
                    "interval {}s exceeds {}s",
                    self.interval_secs, MAX_HEARTBEAT_INTERVAL_SECS
                ),
            });
        }
        if self.payload_is_hex {
            hex::decode(self.payload.trim())
                .map(Some)
                .map_err(|e| BridgeError::HeartbeatPayload {
                    reason: format!("'{}': {}", self.payload, e),
                })
        } else {
            Ok(Some(self.payload.as_bytes().to_vec()))
        }
    }
}

/// Everything one bridge session needs, already validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub server_host: String,
    pub server_port: u16,
    pub serial_port: String,
    pub baud_rate: u32,
    pub log_mode: LogMode,
    pub heartbeat: HeartbeatConfig,
    pub auto_reconnect: bool,
}

impl BridgeConfig {
    /// TCP address as `host:port`
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            log_mode: LogMode::Off,
            heartbeat: HeartbeatConfig::default(),
            auto_reconnect: true,
        }
    }
}

// =============================================================================
// Settings file
// =============================================================================

/// Settings file contents
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub bridge: BridgeSection,
    pub logs: LogsSection,
    pub heartbeat: HeartbeatSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSection {
    pub server_host: String,
    pub server_port: u16,
    pub serial_port: String,
    pub baud_rate: u32,
    pub auto_reconnect: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogsSection {
    /// Print relayed traffic
    pub print: bool,
    /// Print relayed traffic as hex (requires `print`)
    pub hex: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HeartbeatSection {
    pub enabled: bool,
    pub data: String,
    /// Seconds between sends, 0 = once after connecting
    pub interval: u64,
    /// `data` is a hex string
    pub hex: bool,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            auto_reconnect: true,
        }
    }
}

impl Config {
    /// Validate settings and produce the session configuration
    pub fn to_bridge_config(&self) -> Result<BridgeConfig> {
        let bridge = &self.bridge;

        if bridge.server_host.trim().is_empty() {
            return Err(BridgeError::ConfigValidation {
                field: "server_host",
                reason: "must not be empty".into(),
            });
        }
        if bridge.serial_port.trim().is_empty() {
            return Err(BridgeError::ConfigValidation {
                field: "serial_port",
                reason: "must not be empty".into(),
            });
        }
        if bridge.baud_rate == 0 {
            return Err(BridgeError::ConfigValidation {
                field: "baud_rate",
                reason: "must be greater than 0".into(),
            });
        }
        if self.heartbeat.interval > MAX_HEARTBEAT_INTERVAL_SECS {
            return Err(BridgeError::ConfigValidation {
                field: "heartbeat.interval",
                reason: format!("must be between 0 and {}", MAX_HEARTBEAT_INTERVAL_SECS),
            });
        }

        let heartbeat = HeartbeatConfig {
            enabled: self.heartbeat.enabled,
            payload: self.heartbeat.data.clone(),
            payload_is_hex: self.heartbeat.hex,
            interval_secs: self.heartbeat.interval,
        };
        // A bad payload only disables the heartbeat for the session
        if let Err(e) = heartbeat.decode_payload() {
            warn!("{}", e);
        }

        Ok(BridgeConfig {
            server_host: bridge.server_host.trim().to_string(),
            server_port: bridge.server_port,
            serial_port: bridge.serial_port.trim().to_string(),
            baud_rate: bridge.baud_rate,
            log_mode: LogMode::from_flags(self.logs.print, self.logs.hex),
            heartbeat,
            auto_reconnect: bridge.auto_reconnect,
        })
    }
}

/// Default config file path (next to the executable, else working directory)
pub fn default_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Load config from file, or create default if not exists
pub fn load(path: &Path) -> Config {
    if !path.exists() {
        let config = Config::default();
        if let Err(e) = save(path, &config) {
            warn!("Failed to create default config: {}", e);
        }
        return config;
    }

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config parse error in {:?}: {}, using defaults", path, e);
                Config::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config {:?}: {}, using defaults", path, e);
            Config::default()
        }
    }
}

/// Save config to file
pub fn save(path: &Path, config: &Config) -> Result<()> {
    let content =
        toml::to_string_pretty(config).map_err(|e| BridgeError::ConfigValidation {
            field: "config",
            reason: e.to_string(),
        })?;
    fs::write(path, content).map_err(|e| BridgeError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })
}

// ============================================================================
// Tests
// ============================================================================
