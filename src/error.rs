//! Error types for the emulator engine.
//!
//! Construction-time failures (glyphs, buttons) are fatal to the entity being
//! built. Runtime failures are returned to the caller, logged, and never stop
//! the scheduler loops.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Errors produced by the emulator engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmulatorError {
    /// A glyph's sub-button list could not be parsed.
    #[error("invalid glyph {id:?} with code {spec:?}: {reason}")]
    InvalidGlyphSpec {
        /// Glyph identifier.
        id: String,
        /// The raw comma-separated dot list.
        spec: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No code is registered for the requested control id.
    #[error("no button registered for {0:?}")]
    UnknownButtonMapping(String),

    /// A recording is empty, malformed, or references unknown buttons.
    #[error("invalid recording {name:?}: {reason}")]
    InvalidRecording {
        /// Recording name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Playback was requested while a recording session is active.
    #[error("cannot play back while a recording is in progress")]
    PlaybackConflict,

    /// Playback was requested but nothing has been saved yet.
    #[error("no recordings have been saved")]
    NoRecordings,

    /// The requested recording index does not exist.
    #[error("no recording at index {index} (catalog holds {len})")]
    NoSuchRecording {
        /// Requested index.
        index: usize,
        /// Number of recordings in the catalog.
        len: usize,
    },

    /// The requested glyph is not in the glyph book.
    #[error("unknown glyph {0:?}")]
    UnknownGlyph(String),

    /// A target cell string could not be understood.
    #[error("invalid target cell {0:?} (expected \"jumbo\" or \"slateN\" with N in 1..=32)")]
    InvalidTarget(String),

    /// The transport channel reported a failure.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// A script could not be compiled.
    #[error(transparent)]
    Script(#[from] CompileError),
}

/// A script failed to load or compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{script}:{line}: {reason}")]
pub struct CompileError {
    /// Script name.
    pub script: String,
    /// 1-based line number (0 when the error is not tied to a line).
    pub line: usize,
    /// Description of the problem.
    pub reason: String,
}

impl CompileError {
    /// Creates a compile error tied to a specific line.
    pub fn at_line(script: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Creates a compile error for the script as a whole.
    pub fn whole(script: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::at_line(script, 0, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::at_line("demo.bwt", 3, "unknown action \"tap\"");
        assert_eq!(err.to_string(), "demo.bwt:3: unknown action \"tap\"");
    }

    #[test]
    fn test_compile_error_converts() {
        let err: EmulatorError = CompileError::whole("demo.bwt", "not found").into();
        assert!(matches!(err, EmulatorError::Script(_)));
        assert_eq!(err.to_string(), "demo.bwt:0: not found");
    }

    #[test]
    fn test_no_such_recording_display() {
        let err = EmulatorError::NoSuchRecording { index: 4, len: 2 };
        assert_eq!(err.to_string(), "no recording at index 4 (catalog holds 2)");
    }
}
