//! Configuration management for padgate.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. The
//! required device addresses, the poll interval, and the acquisition command
//! all live here rather than in ambient constants, so one deployment can
//! re-point any of them without rebuilding.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scan::DeviceAddress;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "padgate";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PADGATE_`)
/// 2. TOML config file at `~/.config/padgate/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bus enumeration configuration.
    pub bus: BusConfig,
    /// Readiness monitor configuration.
    pub monitor: MonitorConfig,
    /// Acquisition handoff configuration.
    pub acquisition: AcquisitionConfig,
}

/// Bus enumeration configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// I2C bus index to probe. Bus 1 is the default on a Raspberry Pi.
    pub index: u8,
    /// Path to the `i2cdetect` utility. A bare name is resolved via `PATH`.
    pub i2cdetect: PathBuf,
}

/// Readiness monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between bus scans in milliseconds.
    pub poll_interval_ms: u64,
    /// Addresses that must all answer in the same scan before handoff.
    ///
    /// Defaults to the BNO055 IMU (0x28) and the BME280 environmental
    /// sensor (0x76).
    pub required: Vec<DeviceAddress>,
}

/// Acquisition handoff configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Program to run once the bus is ready.
    pub program: PathBuf,
    /// Arguments passed to the program. The run duration is the acquisition
    /// program's own business; nothing here controls it.
    pub args: Vec<String>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            index: 1,
            i2cdetect: PathBuf::from("i2cdetect"),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            required: vec![DeviceAddress::new(0x28), DeviceAddress::new(0x76)],
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python3"),
            args: vec!["/home/pi/avionics/main.py".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PADGATE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval_ms == 0 {
            return Err(Error::config_validation(
                "poll_interval_ms must be greater than 0",
            ));
        }

        if self.monitor.required.is_empty() {
            return Err(Error::config_validation(
                "at least one required device address must be set",
            ));
        }

        for addr in &self.monitor.required {
            if !addr.is_probeable() {
                return Err(Error::config_validation(format!(
                    "required address {addr} is outside the probeable range 0x03..=0x77"
                )));
            }
        }

        if self.acquisition.program.as_os_str().is_empty() {
            return Err(Error::config_validation(
                "acquisition program must not be empty",
            ));
        }

        Ok(())
    }

    /// Get the poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.poll_interval_ms)
    }
}
