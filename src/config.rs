//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PositionLoggerError, Result};

/// Main configuration structure
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telemetry source files written by the flight simulator
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_dir")]
    pub dir: String,

    #[serde(default = "default_lat_file")]
    pub lat_file: String,

    #[serde(default = "default_lon_file")]
    pub lon_file: String,

    #[serde(default = "default_altitude_file")]
    pub altitude_file: String,

    #[serde(default = "default_trim_values")]
    pub trim_values: bool,

    #[serde(default)]
    pub validate_numeric: bool,
}

/// CSV position log
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Retention cap; `None` keeps every row
    #[serde(default)]
    pub max_rows: Option<usize>,
}

/// Poll cadence
#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_interval_s")]
    pub interval_s: u64,
}

/// Diagnostics logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Directory for a daily-rolling diagnostics file; empty disables it
    #[serde(default)]
    pub dir: String,
}

// Default value functions
fn default_source_dir() -> String { "./streaming".to_string() }
fn default_lat_file() -> String { "lat.txt".to_string() }
fn default_lon_file() -> String { "lon.txt".to_string() }
fn default_altitude_file() -> String { "altitude.txt".to_string() }
fn default_trim_values() -> bool { false }

fn default_log_path() -> String { "./logs/data_log.csv".to_string() }

fn default_interval_s() -> u64 { 60 }

fn default_logging_level() -> String { "info".to_string() }

const MAX_INTERVAL_S: u64 = 86_400;
const LOGGING_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: default_source_dir(),
            lat_file: default_lat_file(),
            lon_file: default_lon_file(),
            altitude_file: default_altitude_file(),
            trim_values: default_trim_values(),
            validate_numeric: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            max_rows: None,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_s: default_interval_s() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            dir: String::new(),
        }
    }
}

impl SourceConfig {
    /// Full paths of the latitude, longitude and altitude files, in that order
    pub fn file_paths(&self) -> [PathBuf; 3] {
        let dir = Path::new(&self.dir);
        [
            dir.join(&self.lat_file),
            dir.join(&self.lon_file),
            dir.join(&self.altitude_file),
        ]
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_s)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use position_logger::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.source.dir.is_empty() {
            return Err(invalid("source dir cannot be empty"));
        }

        for (name, value) in [
            ("lat_file", &self.source.lat_file),
            ("lon_file", &self.source.lon_file),
            ("altitude_file", &self.source.altitude_file),
        ] {
            if value.is_empty() {
                return Err(invalid(format!("{} cannot be empty", name)));
            }
        }

        if self.log.path.is_empty() {
            return Err(invalid("log path cannot be empty"));
        }

        if self.log.max_rows == Some(0) {
            return Err(invalid("max_rows must be greater than 0"));
        }

        if self.poll.interval_s == 0 || self.poll.interval_s > MAX_INTERVAL_S {
            return Err(invalid(format!(
                "interval_s must be between 1 and {}",
                MAX_INTERVAL_S
            )));
        }

        if !LOGGING_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging level must be one of: {}",
                LOGGING_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> PositionLoggerError {
    PositionLoggerError::Config(toml::de::Error::custom(msg))
}
