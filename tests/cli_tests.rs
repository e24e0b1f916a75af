//! End-to-end tests for the `bwtemu` command line.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

mod fixtures;
use fixtures::{write_script, WRITE_B_SCRIPT};

/// Creates a Command with an isolated config directory.
fn isolated_command(args: &[&str], config_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_bwtemu"));
    cmd.env("BWTEMU_CONFIG_DIR", config_dir);
    cmd.env_remove("RUST_LOG");
    cmd.args(args);
    cmd
}

fn run(args: &[&str], config_dir: &Path) -> Output {
    isolated_command(args, config_dir)
        .output()
        .expect("Failed to execute command")
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Should parse JSON output")
}

fn assert_success(output: &Output) {
    assert_eq!(
        output.status.code(),
        Some(0),
        "Command should succeed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

// ============================================================================
// Listing commands
// ============================================================================

#[test]
fn test_glyphs_json() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["glyphs", "--json"], temp_dir.path());

    assert_success(&output);
    let json = stdout_json(&output);
    assert_eq!(json["language"], "english");
    assert_eq!(json["count"], 26);
    assert_eq!(json["glyphs"][0]["id"], "a");
}

#[test]
fn test_buttons_filter() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["buttons", "--filter", "^_jumbo", "--json"], temp_dir.path());

    assert_success(&output);
    let json = stdout_json(&output);
    assert_eq!(json["count"], 6);
    assert_eq!(json["buttons"][0]["id"], "_jumbo1");
    assert_eq!(json["buttons"][0]["code"], "j1n");
}

#[test]
fn test_buttons_invalid_filter() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["buttons", "--filter", "("], temp_dir.path());

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_scripts_seeds_sample() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["scripts", "--json"], temp_dir.path());

    assert_success(&output);
    let json = stdout_json(&output);
    assert_eq!(json["scripts"], serde_json::json!(["sample_script"]));
    assert!(temp_dir.path().join("scripts/sample_script.bwt").exists());
}

// ============================================================================
// Compile
// ============================================================================

#[test]
fn test_compile_json() {
    let temp_dir = TempDir::new().unwrap();
    write_script(&temp_dir.path().join("scripts"), "write_b", WRITE_B_SCRIPT);

    let output = run(&["compile", "write_b", "--json"], temp_dir.path());

    assert_success(&output);
    let json = stdout_json(&output);
    assert_eq!(json["actions"], 4);
    assert_eq!(json["entries"].as_array().unwrap().len(), 6);
    // 35 + 250 + 35 + 100 + 300
    assert_eq!(json["duration_ms"], 720);
}

#[test]
fn test_compile_table() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["compile", "sample_script"], temp_dir.path());

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("_jumbo4"));
    assert!(stdout.contains("_button_main"));
}

#[test]
fn test_compile_missing_script_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["compile", "missing"], temp_dir.path());

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_compile_bad_line_is_validation_error() {
    let temp_dir = TempDir::new().unwrap();
    write_script(
        &temp_dir.path().join("scripts"),
        "bad",
        "click jumbo1 0\nclick jumbo2 soon\n",
    );

    let output = run(&["compile", "bad"], temp_dir.path());

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad:2"), "stderr: {stderr}");
}

// ============================================================================
// Run and type
// ============================================================================

#[test]
fn test_run_dry_run_prints_transmissions() {
    let temp_dir = TempDir::new().unwrap();
    write_script(&temp_dir.path().join("scripts"), "write_b", WRITE_B_SCRIPT);

    let output = run(&["run", "write_b", "--dry-run"], temp_dir.path());

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Transmissions"));
    assert!(stdout.contains("j4n"));
    assert!(stdout.contains("j5n"));
    assert!(stdout.contains("Script 'write_b' completed."));
}

#[test]
fn test_run_missing_script() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["run", "missing", "--dry-run"], temp_dir.path());

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_type_dry_run() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["type", "a", "--cell", "slate2", "--dry-run"], temp_dir.path());

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    // Dot 4 of slate cell 2.
    assert!(stdout.contains("014n"));
    assert!(stdout.contains("Typed 1 glyph(s) into slate2."));
}

#[test]
fn test_type_rejects_unknown_character() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["type", "a~", "--dry-run"], temp_dir.path());

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_type_rejects_bad_cell() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["type", "a", "--cell", "slate99", "--dry-run"], temp_dir.path());

    assert_eq!(output.status.code(), Some(1));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_path() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["config", "path"], temp_dir.path());

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        temp_dir.path().join("config.toml").display().to_string()
    );
}

#[test]
fn test_config_path_override() {
    let temp_dir = TempDir::new().unwrap();
    let custom = temp_dir.path().join("custom.toml");
    let custom_arg = custom.to_string_lossy().to_string();

    let output = run(&["--config", &custom_arg, "config", "path"], temp_dir.path());

    assert_success(&output);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), custom_arg);
}

#[test]
fn test_config_show_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["config", "show", "--json"], temp_dir.path());

    assert_success(&output);
    let json = stdout_json(&output);
    assert_eq!(json["transport"]["kind"], "log");
    assert_eq!(json["timing"]["flush_interval_ms"], 50);
    assert_eq!(json["server"]["port"], 3001);
}

#[test]
fn test_config_set_then_show() {
    let temp_dir = TempDir::new().unwrap();

    let output = run(&["config", "set", "--port", "8080"], temp_dir.path());
    assert_success(&output);
    assert!(temp_dir.path().join("config.toml").exists());

    let output = run(&["config", "show", "--json"], temp_dir.path());
    assert_success(&output);
    assert_eq!(stdout_json(&output)["server"]["port"], 8080);
}

#[test]
fn test_config_set_requires_option() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["config", "set"], temp_dir.path());

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_config_set_device_without_path() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["config", "set", "--transport", "device"], temp_dir.path());

    assert_eq!(output.status.code(), Some(1));
    assert!(!temp_dir.path().join("config.toml").exists());
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[timing]\nflush_interval_ms = 0\n",
    )
    .unwrap();

    let output = run(&["scripts"], temp_dir.path());

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("flush_interval_ms"), "stderr: {stderr}");
}
