//! Application-wide constants.
//!
//! This module defines the application name and the default protocol timings.
//! Every timing here can be overridden in the `[timing]` section of the config.

/// The display name of the application (human-readable, with proper capitalization).
pub const APP_NAME: &str = "BWT Emulator";

/// The binary name of the application (used in command examples, lowercase).
pub const APP_BINARY_NAME: &str = "bwtemu";

/// Name of the per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = "BwtEmulator";

/// Environment variable that overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "BWTEMU_CONFIG_DIR";

/// Interval between flushes of the pending bytecode queue, in milliseconds.
pub const PROCESSOR_TIMER_RATE_MS: u64 = 50;

/// Interval between holdings refreshes, in milliseconds.
pub const PROCESSOR_HOLDINGS_TIMER_RATE_MS: u64 = 100;

/// Delay between repeated enqueues of the same code, in milliseconds.
pub const QUEUE_TIMER_RATE_MS: u64 = 100;

/// The device only registers a press after seeing its code this many times.
pub const PRESSDOWN_NUM_TO_SEND: u32 = 3;

/// How long a completed glyph stays marked on its cell, in milliseconds.
pub const LENGTH_GLYPH_VISIBLE_MS: u64 = 1000;

/// Pause between sub-button pulses of one glyph, in milliseconds.
pub const GLYPH_STEP_DELAY_MS: u64 = 250;

/// Duration of a scripted click between its down and up events, in milliseconds.
pub const CLICK_SETTLE_MS: u64 = 35;

/// Extension of script files.
pub const SCRIPT_EXTENSION: &str = "bwt";

/// Number of slate cells on the device.
pub const NUM_SLATE_CELLS: u8 = 32;

/// Number of dots in a braille cell.
pub const NUM_CELL_DOTS: u8 = 6;
