//! Configuration for the shvid-sync player
//!
//! Bootstrap configuration is a single TOML file. Every field has a built-in
//! default, so an absent file and an empty file behave the same.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`SHVID_CONFIG`)
//! 3. Per-user config file (`<config_dir>/shvid/config.toml`)
//! 4. Built-in defaults (code constants)

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// MIME type probed on the renderer for native manifest playback
pub const DEFAULT_NATIVE_MIME: &str = "application/vnd.apple.mpegurl";

/// Top-level configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct SyncConfig {
    /// Adaptive engine construction options
    #[serde(default)]
    pub engine: EngineSettings,

    /// Reconciliation tuning
    #[serde(default)]
    pub sync: SyncSettings,

    /// Outbound telemetry
    #[serde(default)]
    pub telemetry: TelemetrySettings,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Options handed to the adaptive engine on construction
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EngineSettings {
    /// Low-latency buffering
    #[serde(default = "default_true")]
    pub low_latency: bool,

    /// Demux on a worker instead of the main thread
    #[serde(default = "default_true")]
    pub worker_demux: bool,

    /// MIME type used for the native-support capability query
    #[serde(default = "default_native_mime")]
    pub native_mime: String,
}

/// Reconciliation settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// Time updates landing within this many seconds of the renderer's
    /// current position are not re-applied. 0 disables suppression.
    #[serde(default = "default_seek_tolerance")]
    pub seek_tolerance_secs: f64,
}

/// Outbound telemetry settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TelemetrySettings {
    /// Minimum spacing between forwarded time updates
    #[serde(default = "default_time_update_interval")]
    pub time_update_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}

fn default_native_mime() -> String {
    DEFAULT_NATIVE_MIME.to_string()
}

fn default_seek_tolerance() -> f64 {
    0.25
}

fn default_time_update_interval() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            low_latency: true,
            worker_demux: true,
            native_mime: default_native_mime(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            seek_tolerance_secs: default_seek_tolerance(),
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            time_update_interval_ms: default_time_update_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TelemetrySettings {
    pub fn time_update_interval(&self) -> Duration {
        shvid_common::time::millis_to_duration(self.time_update_interval_ms)
    }
}

impl SyncConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let config: SyncConfig = shvid_common::config::load_toml(path)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the config path (CLI, env, user file) and load it, or fall
    /// back to defaults when no file is found
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        match shvid_common::config::resolve_config_path(
            cli_arg,
            shvid_common::config::CONFIG_ENV_VAR,
        ) {
            Some(path) => Self::load(&path),
            None => {
                info!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.sync.seek_tolerance_secs.is_finite() || self.sync.seek_tolerance_secs < 0.0 {
            return Err(crate::Error::Config(format!(
                "sync.seek_tolerance_secs must be a non-negative number, got {}",
                self.sync.seek_tolerance_secs
            )));
        }
        if self.engine.native_mime.trim().is_empty() {
            return Err(crate::Error::Config(
                "engine.native_mime must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
