//! Shared CLI plumbing: error type, exit codes, and config resolution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::device::Emulator;
use crate::error::EmulatorError;
use crate::services::{ButtonRegistry, DirectoryScriptSource, GlyphBook};
use crate::transport::MemoryTransport;

/// Process exit codes used by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded.
    Success = 0,
    /// Input was rejected (bad script, unknown glyph, invalid config value).
    ValidationError = 1,
    /// A file or device could not be read or written.
    IoError = 2,
}

/// Error returned by command handlers.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CliError {
    /// Exit code the process ends with.
    pub code: ExitCode,
    /// Message printed to stderr.
    pub message: String,
}

impl CliError {
    /// Input was rejected.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: ExitCode::ValidationError,
            message: message.into(),
        }
    }

    /// IO failed.
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            code: ExitCode::IoError,
            message: message.into(),
        }
    }

    /// Exit code as the integer passed to `std::process::exit`.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.code as i32
    }
}

impl From<EmulatorError> for CliError {
    fn from(err: EmulatorError) -> Self {
        match &err {
            EmulatorError::Script(compile) if compile.line == 0 => Self::io(err.to_string()),
            EmulatorError::TransportFailure(_) => Self::io(err.to_string()),
            _ => Self::validation(err.to_string()),
        }
    }
}

/// Result type of command handlers.
pub type CliResult<T> = Result<T, CliError>;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    config_path: PathBuf,
}

impl CliContext {
    /// Uses `config_path` if given, otherwise the default config file.
    pub fn new(config_path: Option<PathBuf>) -> CliResult<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => Config::config_file_path()
                .map_err(|e| CliError::io(format!("Failed to locate config file: {e}")))?,
        };
        Ok(Self { config_path })
    }

    /// Path of the config file in use.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads the config file, falling back to defaults if it is missing.
    pub fn load_config(&self) -> CliResult<Config> {
        Config::load_from(&self.config_path)
            .map_err(|e| CliError::validation(format!("Failed to load configuration: {e:#}")))
    }

    /// Opens the configured scripts directory, creating it on first use.
    pub fn script_source(&self, config: &Config) -> CliResult<DirectoryScriptSource> {
        let dir = config
            .paths
            .scripts_dir()
            .map_err(|e| CliError::io(format!("Failed to resolve scripts directory: {e}")))?;
        DirectoryScriptSource::open(&dir)
            .map_err(|e| CliError::io(format!("Failed to open scripts directory: {e:#}")))
    }

    /// Builds the emulator. A dry run collects transmissions in memory
    /// instead of using the configured transport.
    pub fn emulator(
        &self,
        config: &Config,
        dry_run: bool,
    ) -> CliResult<(Emulator, Option<MemoryTransport>)> {
        if !dry_run {
            let emulator = Emulator::from_config(config)
                .map_err(|e| CliError::io(format!("Failed to start emulator: {e:#}")))?;
            return Ok((emulator, None));
        }

        let memory = MemoryTransport::new();
        let glyphs = GlyphBook::load()
            .map_err(|e| CliError::io(format!("Failed to load glyph book: {e}")))?;
        let emulator = Emulator::new(
            ButtonRegistry::with_overrides(&config.buttons),
            glyphs,
            Arc::new(memory.clone()),
            config.timing.clone(),
        );
        Ok((emulator, Some(memory)))
    }
}

/// Prints what a dry run would have sent.
pub fn print_transmissions(memory: &MemoryTransport) {
    let sent = memory.sent();
    println!("Transmissions ({}):", sent.len());
    for (index, bytecode) in sent.iter().enumerate() {
        println!("  {index:>3}  {bytecode}");
    }
}

/// Serializes a value as pretty JSON to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("Failed to serialize JSON: {e}")))?;
    println!("{json}");
    Ok(())
}
