//! Shared test fixtures for integration and CLI tests.
#![allow(dead_code)] // Not every test binary uses every fixture

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bwtemu::config::{Config, PathConfig, TimingConfig};
use bwtemu::device::Emulator;
use bwtemu::models::{EventType, RecordingEntry};
use bwtemu::services::{ButtonRegistry, GlyphBook};
use bwtemu::transport::MemoryTransport;
use tempfile::TempDir;

/// Script used by tests that need more than the seeded sample.
pub const WRITE_B_SCRIPT: &str = "\
# dots 4 and 5 of the jumbo cell, then a held main button
click jumbo4 0
click jumbo5 250
hold button_main 100
release button_main 300
";

/// Creates a config whose scripts directory lives in a fresh temp dir.
///
/// The directory itself is not created, so opening a script source on it
/// seeds the sample script.
pub fn temp_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config {
        paths: PathConfig {
            scripts_dir: Some(temp_dir.path().join("scripts")),
        },
        ..Config::default()
    };
    (config, temp_dir)
}

/// An emulator on the default layout that records transmissions in memory.
pub fn test_emulator() -> (Emulator, MemoryTransport) {
    test_emulator_with_timing(TimingConfig::default())
}

/// Same as [`test_emulator`] with custom timing.
pub fn test_emulator_with_timing(timing: TimingConfig) -> (Emulator, MemoryTransport) {
    let transport = MemoryTransport::new();
    let emulator = Emulator::new(
        ButtonRegistry::with_default_layout(),
        GlyphBook::load().expect("embedded glyph book"),
        Arc::new(transport.clone()),
        timing,
    );
    (emulator, transport)
}

/// Two clicks on the jumbo cell: down/up of dot 1, then down/up of dot 2.
pub fn two_clicks() -> Vec<RecordingEntry> {
    vec![
        RecordingEntry::new("_jumbo1", EventType::Down, 0),
        RecordingEntry::new("_jumbo1", EventType::Up, 50),
        RecordingEntry::new("_jumbo2", EventType::Down, 70),
        RecordingEntry::new("_jumbo2", EventType::Up, 10),
    ]
}

/// Writes `<name>.bwt` into `dir`, creating the directory.
pub fn write_script(dir: &Path, name: &str, text: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("Failed to create scripts dir");
    let path = dir.join(format!("{name}.bwt"));
    fs::write(&path, text).expect("Failed to write script");
    path
}
