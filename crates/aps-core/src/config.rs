//! Configuration for apShift
//!
//! A single TOML file covers the conductor address, the fleet database
//! location, and the pacing knobs of the console and monitor. Every field
//! has a default, so a missing file is not an error for commands that can
//! take their inputs from flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ap-shift")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Top-level tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Conductor address used for discovery when none is given on the command line
    pub conductor: Option<String>,

    /// HTTPS port of the controllers' configuration API
    pub api_port: u16,

    /// Path of the fleet directory database
    pub database_path: PathBuf,

    /// API/console username used when none is given on the command line
    pub username: Option<String>,

    /// Console pacing
    pub console: ConsoleTiming,

    /// Conversion kickoff settings
    pub convert: ConvertSettings,

    /// Monitor settings
    pub monitor: MonitorSettings,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            conductor: None,
            api_port: 4343,
            database_path: PathBuf::from("ap-shift.db"),
            username: None,
            console: ConsoleTiming::default(),
            convert: ConvertSettings::default(),
            monitor: MonitorSettings::default(),
        }
    }
}

/// Pacing for console command exchanges
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleTiming {
    /// Pause between sending an ordinary command and the first read
    #[serde(with = "duration_secs")]
    pub settle: Duration,

    /// Pause used for `write memory` and other persistence commands
    #[serde(with = "duration_secs")]
    pub persist_settle: Duration,

    /// Pause used for conversion clear/cancel commands
    #[serde(with = "duration_secs")]
    pub convert_settle: Duration,

    /// Upper bound on draining one command's output
    #[serde(with = "duration_secs")]
    pub read_ceiling: Duration,
}

impl Default for ConsoleTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            persist_settle: Duration::from_secs(5),
            convert_settle: Duration::from_secs(2),
            read_ceiling: Duration::from_secs(5),
        }
    }
}

/// Conversion kickoff settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertSettings {
    /// Maximum simultaneous image downloads per controller
    pub max_downloads: u16,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self { max_downloads: 20 }
    }
}

/// Monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Pause between polling cycles
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

// Helper module for Duration serialization as whole seconds
mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
