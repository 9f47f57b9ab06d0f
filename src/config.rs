//! # Configuration Management
//!
//! Centralized configuration for the endpoint.
//!
//! This module provides structured configuration for the UDP endpoint:
//! listen address, player capacity, world-initialization defaults, and
//! logging options.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//!
//! Validation collects human-readable errors; `validate_strict()` converts
//! them into a single `ConfigError`.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Level;

/// XOR key applied to the port bytes of a connection probe.
pub const PROBE_XOR_KEY: u16 = 0x1B39;

/// Magic constant echoed in `CONNECTION_REQUEST_ACCEPTED`.
pub const ACCEPT_MAGIC: u32 = 0xECAF_A15C;

/// Authentication token the server offers in its `AUTHKEY` packet.
pub const AUTH_KEY_OUT: &str = "622125FA64F6617F";

/// Authentication token the client must echo back.
pub const AUTH_KEY_IN: &str = "F6469B2803AEABE0A6A3C250C869C830274BFF6B";

/// Main configuration structure containing all configurable settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EndpointConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// World-initialization defaults sent on join
    #[serde(default)]
    pub world: WorldConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EndpointConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Validate the configuration for common misconfigurations.
    ///
    /// Returns a list of validation errors. Empty list means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.world.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the UDP socket to
    pub bind_address: String,

    /// UDP port; also the value probes must XOR-match
    pub port: u16,

    /// Fixed slot-table capacity
    pub max_players: usize,

    /// Hostname advertised in the world-init payload
    pub hostname: String,

    /// Gamemode string for the browser listing
    pub gamemode: String,

    /// Connection password, empty for open servers
    pub password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0"),
            port: 7777,
            max_players: 100,
            hostname: String::from("rakgate server"),
            gamemode: String::new(),
            password: String::new(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.bind_address.parse::<std::net::IpAddr>().is_err() {
            errors.push(format!(
                "Invalid bind address: '{}' (expected an IP address)",
                self.bind_address
            ));
        }

        if self.port == 0 {
            errors.push("Port must be non-zero".to_string());
        }

        if self.max_players == 0 {
            errors.push("max_players must be greater than 0".to_string());
        } else if self.max_players > 1000 {
            errors.push(format!(
                "max_players too large: {} (maximum: 1000)",
                self.max_players
            ));
        }

        // The hostname is wire-framed with a single length byte.
        if self.hostname.is_empty() {
            errors.push("Hostname cannot be empty".to_string());
        } else if self.hostname.len() > 255 {
            errors.push(format!(
                "Hostname too long: {} bytes (maximum: 255)",
                self.hostname.len()
            ));
        } else if !self.hostname.is_ascii() {
            errors.push("Hostname must be ASCII".to_string());
        }

        errors
    }
}

/// World-initialization defaults carried by the `INIT_GAME` RPC.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    pub zone_names: bool,
    pub cj_walk: bool,
    pub allow_weapons: bool,
    pub limit_global_chat: bool,
    pub chat_radius: f32,
    pub stunt_bonus: bool,
    pub nametag_distance: f32,
    pub disable_enter_exit: bool,
    pub nametag_los: bool,
    pub manual_vehicle_engine: bool,
    pub spawns_available: i32,
    pub show_player_tags: bool,
    pub show_player_markers: i32,
    pub world_time: u8,
    pub weather: u8,
    pub gravity: f32,
    pub lan_mode: bool,
    pub death_drop_money: i32,
    pub instagib: bool,
    pub onfoot_send_rate: i32,
    pub incar_send_rate: i32,
    pub firing_send_rate: i32,
    pub send_multiplier: i32,
    pub lag_compensation: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            zone_names: true,
            cj_walk: false,
            allow_weapons: true,
            limit_global_chat: false,
            chat_radius: 200.0,
            stunt_bonus: false,
            nametag_distance: 70.0,
            disable_enter_exit: true,
            nametag_los: true,
            manual_vehicle_engine: true,
            spawns_available: 1,
            show_player_tags: true,
            show_player_markers: 1,
            world_time: 12,
            weather: 10,
            gravity: 0.8,
            lan_mode: false,
            death_drop_money: 0,
            instagib: false,
            onfoot_send_rate: 40,
            incar_send_rate: 40,
            firing_send_rate: 40,
            send_multiplier: 10,
            lag_compensation: true,
        }
    }
}

impl WorldConfig {
    /// Validate world configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.world_time >= 24 {
            errors.push(format!(
                "world_time out of range: {} (valid: 0-23)",
                self.world_time
            ));
        }

        if !self.gravity.is_finite() {
            errors.push("gravity must be a finite number".to_string());
        }

        if self.chat_radius <= 0.0 || !self.chat_radius.is_finite() {
            errors.push("chat_radius must be a positive number".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            log_to_console: true,
            json_format: false,
        }
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
