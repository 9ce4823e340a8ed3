// src/config.rs

//! Manages server configuration: loading, defaults, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;

/// Represents the final, validated server configuration.
///
/// The configuration is immutable after server start; handlers only ever read
/// from it and no synchronization is required.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// The IP address of the interface the server listens on.
    #[serde(default = "default_host")]
    pub host: String,
    /// The port the server listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Maximum number of simultaneously connected clients.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Capacity of each connection's outbound frame queue. Forwarded verbatim
    /// to the channel-dispatch collaborator as its backpressure threshold.
    #[serde(default = "default_back_pressure_size")]
    pub back_pressure_size: usize,
    /// How many times the channel-dispatch collaborator may recreate a failed
    /// payload coder. Stored and forwarded verbatim, never interpreted here.
    #[serde(default = "default_recreate_coder_attempts_count")]
    pub recreate_coder_attempts_count: u32,
    /// Whether the channel-dispatch collaborator should record output data
    /// sizes. Stored and forwarded verbatim, never interpreted here.
    #[serde(default)]
    pub stats: bool,
    /// Whether an unhandled error in a user handler force-disconnects the
    /// offending session.
    #[serde(default = "default_disconnect_on_unhandled")]
    pub disconnect_on_unhandled: bool,
    /// The maximum size of a single inbound message, in megabytes.
    #[serde(default = "default_max_message_size_mb")]
    pub max_message_size_mb: f64,
    /// If true, command dispatch is spawned per event instead of running
    /// inline on the connection task.
    #[serde(default)]
    pub async_handlers: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5896
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    10000
}
fn default_back_pressure_size() -> usize {
    5
}
fn default_recreate_coder_attempts_count() -> u32 {
    5
}
fn default_disconnect_on_unhandled() -> bool {
    true
}
fn default_max_message_size_mb() -> f64 {
    5.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            back_pressure_size: default_back_pressure_size(),
            recreate_coder_attempts_count: default_recreate_coder_attempts_count(),
            stats: false,
            disconnect_on_unhandled: default_disconnect_on_unhandled(),
            max_message_size_mb: default_max_message_size_mb(),
            async_handlers: false,
        }
    }
}

impl Config {
    /// Loads and validates a configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients must be at least 1"));
        }
        if self.back_pressure_size == 0 {
            return Err(anyhow!("back_pressure_size must be at least 1"));
        }
        if self.max_message_size_mb <= 0.0 {
            return Err(anyhow!("max_message_size_mb must be positive"));
        }
        Ok(())
    }

    /// The maximum inbound frame size in bytes, derived from
    /// `max_message_size_mb`.
    pub fn max_frame_bytes(&self) -> usize {
        (self.max_message_size_mb * (1024.0 * 1024.0)) as usize
    }
}
