//! Configuration management for the replication relay.
//!
//! Loads settings from a TOML file with an environment-variable overlay
//! (highest priority), then validates the result. The recognized options
//! are the relay's five required keys (`listen.addr`, `listen.port`,
//! `slave.info`, `redis.addr`, `redis.port`) plus an optional log section.

mod endpoint;
pub use endpoint::*;

#[cfg(test)]
mod config_test;

//---
use std::path::PathBuf;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;

type ValidationResult = std::result::Result<(), ConfigError>;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Endpoint downstream replicas attach to
    pub listen: Endpoint,
    /// Checkpoint store location
    pub slave: SlaveInfoConfig,
    /// Upstream Redis node this relay pulls from
    pub redis: Endpoint,
    /// Log output settings
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlaveInfoConfig {
    /// Path of the on-disk replay position record (slave.info)
    pub info: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    /// Directory for the rolling log file; stdout only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Settings {
    /// Load configuration with priority:
    /// 1. Config file (`config/relay` by default)
    /// 2. Environment variables prefixed with `RELAY` (highest priority)
    ///
    /// The merged settings are validated before being returned.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        config = match config_path {
            Some(path) => config.add_source(File::with_name(path).required(true)),
            None => config.add_source(File::with_name("config/relay").required(false)),
        };

        // Environment overlay, e.g. RELAY__REDIS__PORT=6380
        config = config.add_source(
            Environment::with_prefix("RELAY")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = config.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the merged configuration before an instance is built from it.
    pub fn validate(&self) -> ValidationResult {
        self.listen.validate("listen")?;
        self.redis.validate("redis")?;

        if self.slave.info.as_os_str().is_empty() {
            return Err(ConfigError::Message("slave.info path must not be empty".to_string()));
        }

        Ok(())
    }
}
