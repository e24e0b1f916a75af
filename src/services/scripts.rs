//! Script sources and the script compiler.
//!
//! Scripts are coarse action lists (`click`, `hold`, `release`). Compiling one
//! lowers it to the same entries a captured recording holds, so playback does
//! not care where the entries came from.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::SCRIPT_EXTENSION;
use crate::error::CompileError;
use crate::models::script::{parse_script, render_script};
use crate::models::{ActionType, EventType, Recording, RecordingEntry, ScriptAction};
use crate::services::ButtonRegistry;

/// Script shipped with the emulator and written into a fresh scripts directory.
pub const SAMPLE_SCRIPT: &str = include_str!("sample_script.bwt");

/// Name of the seeded sample script.
pub const SAMPLE_SCRIPT_NAME: &str = "sample_script";

/// Provider of named action lists.
pub trait ScriptSource: Send + Sync {
    /// Names of every available script, sorted.
    fn list_scripts(&self) -> Result<Vec<String>>;

    /// Loads and parses one script.
    fn fetch_script(&self, name: &str) -> Result<Vec<ScriptAction>, CompileError>;

    /// Stores script text under `name`, replacing an existing script.
    fn store_script(&self, name: &str, _text: &str) -> Result<()> {
        anyhow::bail!("Script source is read-only; cannot store {name:?}")
    }
}

/// Reads `*.bwt` files from one directory.
#[derive(Debug, Clone)]
pub struct DirectoryScriptSource {
    dir: PathBuf,
}

impl DirectoryScriptSource {
    /// Creates a source over `dir` without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a source over `dir`, creating the directory and seeding the
    /// sample script if the directory does not exist yet.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bwtemu::services::{DirectoryScriptSource, ScriptSource};
    ///
    /// let source = DirectoryScriptSource::open("./BWT_SCRIPTS")?;
    /// for name in source.list_scripts()? {
    ///     println!("{name}");
    /// }
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let source = Self::new(dir);
        if !source.dir.exists() {
            std::fs::create_dir_all(&source.dir).with_context(|| {
                format!("Failed to create scripts directory {}", source.dir.display())
            })?;
            source.store_script(SAMPLE_SCRIPT_NAME, SAMPLE_SCRIPT)?;
            info!("Created scripts directory {}", source.dir.display());
        }
        Ok(source)
    }

    /// Directory the scripts live in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `name`.
    #[must_use]
    pub fn script_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{SCRIPT_EXTENSION}", script_stem(name)))
    }
}

impl ScriptSource for DirectoryScriptSource {
    fn list_scripts(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read scripts directory {}", self.dir.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SCRIPT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn fetch_script(&self, name: &str) -> Result<Vec<ScriptAction>, CompileError> {
        let path = self.script_path(name);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            CompileError::whole(name, format!("cannot read {}: {e}", path.display()))
        })?;
        debug!("Loaded script {name:?} from {}", path.display());
        parse_script(script_stem(name), &text)
    }

    fn store_script(&self, name: &str, text: &str) -> Result<()> {
        let path = self.script_path(name);
        let temp_path = path.with_extension(format!("{SCRIPT_EXTENSION}.tmp"));

        std::fs::write(&temp_path, text)
            .with_context(|| format!("Failed to write script to {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to move script into {}", path.display()))?;

        Ok(())
    }
}

fn script_stem(name: &str) -> &str {
    name.strip_suffix(&format!(".{SCRIPT_EXTENSION}"))
        .unwrap_or(name)
}

/// Lowers script actions to playback entries.
///
/// `click` becomes a DOWN after the action's time and an UP after
/// `click_settle_ms`; `hold` becomes a DOWN and `release` an UP. Actions
/// naming a button the registry does not know are skipped with a warning.
pub fn compile_script(
    actions: &[ScriptAction],
    registry: &ButtonRegistry,
    click_settle_ms: u64,
) -> Vec<RecordingEntry> {
    let mut entries = Vec::with_capacity(actions.len() * 2);

    for action in actions {
        let button_id = action.button_id();
        if !registry.contains(&button_id) {
            warn!("Skipping {} on unknown button {:?}", action.action, action.button);
            continue;
        }

        match action.action {
            ActionType::Click => {
                entries.push(RecordingEntry::new(&button_id, EventType::Down, action.time_ms));
                entries.push(RecordingEntry::new(button_id, EventType::Up, click_settle_ms));
            }
            ActionType::Hold => {
                entries.push(RecordingEntry::new(button_id, EventType::Down, action.time_ms));
            }
            ActionType::Release => {
                entries.push(RecordingEntry::new(button_id, EventType::Up, action.time_ms));
            }
        }
    }

    entries
}

/// Converts a recording to script actions: DOWN becomes `hold` and UP
/// becomes `release`, each keeping its delta.
#[must_use]
pub fn export_recording(recording: &Recording) -> Vec<ScriptAction> {
    recording
        .entries
        .iter()
        .map(|entry| {
            let action = match entry.event_type {
                EventType::Down => ActionType::Hold,
                EventType::Up => ActionType::Release,
            };
            ScriptAction::new(entry.button_id.clone(), action, entry.delta_ms)
        })
        .collect()
}

/// Renders a recording as `.bwt` text.
#[must_use]
pub fn export_recording_text(recording: &Recording) -> String {
    render_script(&recording.name, &export_recording(recording))
}
