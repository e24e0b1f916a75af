//! Data models for buttons, glyphs, recordings, and scripts.
//!
//! Models are plain data with their own validation; they hold no timers and
//! perform no IO.

pub mod button;
pub mod glyph;
pub mod recording;
pub mod script;

// Re-export all model types
pub use button::{Button, CellTarget, PressOutcome, ReleaseOutcome};
pub use glyph::Glyph;
pub use recording::{EventType, RawRecordingEntry, Recording, RecordingEntry};
pub use script::{ActionType, ScriptAction};
