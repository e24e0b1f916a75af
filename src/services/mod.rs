//! Service layer owning the emulator's state.
//!
//! Each service is a plain owned object; the device module composes them and
//! drives them from its timers.

pub mod glyphs;
pub mod processor;
pub mod recorder;
pub mod registry;
pub mod scripts;

// Re-export commonly used types and functions
pub use glyphs::GlyphBook;
pub use processor::Processor;
pub use recorder::{Recorder, RecordingSummary, SaveOutcome};
pub use registry::{ButtonInfo, ButtonRegistry, INITIALIZE_CODE};
pub use scripts::{
    compile_script, export_recording, export_recording_text, DirectoryScriptSource, ScriptSource,
};
