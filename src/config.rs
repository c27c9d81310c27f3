//! Store configuration
//!
//! The host application supplies the storage root, the filename prefix,
//! the default reader limit, and the weekly roll schedule. Only the root
//! is mandatory; every other field has a default matching the original
//! deployment values.
//!
//! The crate itself never schedules anything. [`LogConfig::roll_schedule`]
//! validates and exposes the configured day/time pair so the host's
//! scheduler can decide when to invoke compaction.

use std::path::PathBuf;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for configuration validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid roll day {0:?}: expected a weekday name such as \"monday\"")]
    InvalidRollDay(String),

    #[error("invalid roll time {0:?}: expected HH:MM")]
    InvalidRollTime(String),
}

/// Activity log store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Root directory holding every partition and archive
    pub root: PathBuf,

    /// Filename prefix for partitions and archives (default: "activity")
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Reader limit applied when a query does not carry one (default: 50)
    #[serde(default = "default_reader_limit")]
    pub default_limit: usize,

    /// Day of week the host should run compaction (default: "monday")
    #[serde(default = "default_roll_day")]
    pub roll_day: String,

    /// Time of day the host should run compaction (default: "01:00")
    #[serde(default = "default_roll_time")]
    pub roll_time: String,
}

fn default_prefix() -> String {
    "activity".to_string()
}

fn default_reader_limit() -> usize {
    50
}

fn default_roll_day() -> String {
    "monday".to_string()
}

fn default_roll_time() -> String {
    "01:00".to_string()
}

impl LogConfig {
    /// Creates a configuration with the given root and default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: default_prefix(),
            default_limit: default_reader_limit(),
            roll_day: default_roll_day(),
            roll_time: default_roll_time(),
        }
    }

    /// Validates the roll schedule and returns the parsed day/time pair.
    pub fn roll_schedule(&self) -> ConfigResult<(Weekday, NaiveTime)> {
        let day = self
            .roll_day
            .parse::<Weekday>()
            .map_err(|_| ConfigError::InvalidRollDay(self.roll_day.clone()))?;

        let time = NaiveTime::parse_from_str(&self.roll_time, "%H:%M")
            .map_err(|_| ConfigError::InvalidRollTime(self.roll_time.clone()))?;

        Ok((day, time))
    }
}
