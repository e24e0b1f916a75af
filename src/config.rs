//! Configuration management for the application.
//!
//! This module handles loading, validating, and saving application configuration
//! in TOML format with platform-specific directory resolution.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CLICK_SETTLE_MS, CONFIG_DIR_ENV, CONFIG_DIR_NAME, GLYPH_STEP_DELAY_MS, LENGTH_GLYPH_VISIBLE_MS,
    PRESSDOWN_NUM_TO_SEND, PROCESSOR_HOLDINGS_TIMER_RATE_MS, PROCESSOR_TIMER_RATE_MS,
    QUEUE_TIMER_RATE_MS,
};

/// Where transmissions go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Log every transmission; nothing leaves the process.
    #[default]
    Log,
    /// Append raw bytecode to a device node or file.
    Device,
}

/// Transport channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TransportConfig {
    /// Transport implementation.
    pub kind: TransportKind,
    /// Device node or file written by the `device` transport (e.g. "/dev/ttyUSB0").
    pub device_path: Option<PathBuf>,
}

/// Timer settings, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Interval of the flush task.
    pub flush_interval_ms: u64,
    /// Interval of the holdings-refresh task.
    pub holdings_interval_ms: u64,
    /// Delay between the repeated enqueues of one press.
    pub replication_delay_ms: u64,
    /// How many times a press enqueues its code.
    pub replication_count: u32,
    /// Delay after each glyph dot.
    pub glyph_step_ms: u64,
    /// How long a completed glyph stays marked.
    pub glyph_visible_ms: u64,
    /// Press length of a scripted click.
    pub click_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: PROCESSOR_TIMER_RATE_MS,
            holdings_interval_ms: PROCESSOR_HOLDINGS_TIMER_RATE_MS,
            replication_delay_ms: QUEUE_TIMER_RATE_MS,
            replication_count: PRESSDOWN_NUM_TO_SEND,
            glyph_step_ms: GLYPH_STEP_DELAY_MS,
            glyph_visible_ms: LENGTH_GLYPH_VISIBLE_MS,
            click_settle_ms: CLICK_SETTLE_MS,
        }
    }
}

impl TimingConfig {
    /// Flush task period.
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Holdings-refresh task period.
    #[must_use]
    pub const fn holdings_interval(&self) -> Duration {
        Duration::from_millis(self.holdings_interval_ms)
    }

    /// Delay between repeated enqueues.
    #[must_use]
    pub const fn replication_delay(&self) -> Duration {
        Duration::from_millis(self.replication_delay_ms)
    }

    /// Delay after each glyph dot.
    #[must_use]
    pub const fn glyph_step(&self) -> Duration {
        Duration::from_millis(self.glyph_step_ms)
    }

    /// Completion marker visibility.
    #[must_use]
    pub const fn glyph_visible(&self) -> Duration {
        Duration::from_millis(self.glyph_visible_ms)
    }
}

/// Path configuration for file system locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PathConfig {
    /// Directory holding `.bwt` scripts. Defaults to `<config dir>/scripts`.
    pub scripts_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Resolves the scripts directory.
    pub fn scripts_dir(&self) -> Result<PathBuf> {
        match &self.scripts_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Config::config_dir()?.join("scripts")),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

/// Application configuration.
///
/// # File Location
///
/// - Linux: `~/.config/BwtEmulator/config.toml`
/// - macOS: `~/Library/Application Support/BwtEmulator/config.toml`
/// - Windows: `%APPDATA%\BwtEmulator\config.toml`
///
/// # Validation
///
/// - every interval and the replication count must be non-zero
/// - the `device` transport needs a `device_path`
/// - button overrides must not map to an empty code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Transport channel
    pub transport: TransportConfig,
    /// Timer settings
    pub timing: TimingConfig,
    /// File system paths
    pub paths: PathConfig,
    /// HTTP server
    pub server: ServerConfig,
    /// Per-button code overrides, keyed by button id
    pub buttons: BTreeMap<String, String>,
}

impl Config {
    /// Creates a new Config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the platform-specific config directory path.
    ///
    /// - Linux: `~/.config/BwtEmulator/`
    /// - macOS: `~/Library/Application Support/BwtEmulator/`
    /// - Windows: `%APPDATA%\BwtEmulator\`
    ///
    /// The `BWTEMU_CONFIG_DIR` environment variable overrides the location.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(CONFIG_DIR_NAME);

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the default config file.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Loads configuration from `path`, returning defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .context(format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .context(format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Saves configuration to the default config file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Saves configuration to `path` using atomic write.
    ///
    /// Uses temp file + rename pattern for atomic writes.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(format!(
                "Failed to create config directory: {}",
                parent.display()
            ))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        let temp_path = path.with_extension("toml.tmp");

        fs::write(&temp_path, content).context(format!(
            "Failed to write temp config file: {}",
            temp_path.display()
        ))?;

        fs::rename(&temp_path, path).context(format!(
            "Failed to rename temp config file to: {}",
            path.display()
        ))?;

        Ok(())
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<()> {
        let timing = &self.timing;
        let intervals = [
            ("flush_interval_ms", timing.flush_interval_ms),
            ("holdings_interval_ms", timing.holdings_interval_ms),
            ("replication_delay_ms", timing.replication_delay_ms),
            ("glyph_step_ms", timing.glyph_step_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                anyhow::bail!("timing.{name} must be greater than zero");
            }
        }
        if timing.replication_count == 0 {
            anyhow::bail!("timing.replication_count must be at least 1");
        }

        if self.transport.kind == TransportKind::Device && self.transport.device_path.is_none() {
            anyhow::bail!("transport.kind = \"device\" requires transport.device_path");
        }

        if let Some((id, _)) = self.buttons.iter().find(|(_, code)| code.is_empty()) {
            anyhow::bail!("buttons.{id} maps to an empty code");
        }

        Ok(())
    }
}
