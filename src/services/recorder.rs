//! Recording engine state and the in-memory recording catalog.
//!
//! Capture stores the time between consecutive events, not absolute
//! timestamps, so replay reproduces the spacing regardless of when it runs.
//! The catalog lives as long as the process and keeps insertion order.

use crate::error::EmulatorError;
use crate::models::recording::validate_entries;
use crate::models::{EventType, Recording, RecordingEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of ending a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The capture was stored at `index` under `name`.
    Saved {
        /// Catalog index.
        index: usize,
        /// Name assigned to the recording.
        name: String,
    },
    /// Nothing was captured; the session was dropped.
    Discarded,
}

/// Catalog listing entry for selection UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingSummary {
    /// Catalog index used to select the recording.
    pub index: usize,
    /// Stable identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Number of entries.
    pub entries: usize,
    /// Time from first to last entry, in milliseconds.
    pub duration_ms: u64,
    /// When the recording was saved.
    pub created_at: DateTime<Utc>,
}

/// Capture session state plus the saved recordings.
#[derive(Debug, Default)]
pub struct Recorder {
    recording: bool,
    current_log: Vec<RecordingEntry>,
    last_event: Option<Instant>,
    catalog: Vec<Recording>,
}

impl Recorder {
    /// Creates an idle recorder with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a capture session is active.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// Entries captured so far in the active session.
    #[must_use]
    pub fn current_log(&self) -> &[RecordingEntry] {
        &self.current_log
    }

    /// Starts a capture session. Returns false if one is already running.
    pub fn start(&mut self) -> bool {
        if self.recording {
            return false;
        }
        self.recording = true;
        self.current_log.clear();
        self.last_event = None;
        info!("Recording started");
        true
    }

    /// Ends the capture session and saves it. Returns `None` if no session
    /// was active.
    pub fn stop(&mut self, name: Option<&str>) -> Option<SaveOutcome> {
        if !self.recording {
            return None;
        }
        self.recording = false;
        Some(self.save(name))
    }

    /// Starts a session if none is active, otherwise stops and saves it.
    pub fn toggle(&mut self, name: Option<&str>) -> Option<SaveOutcome> {
        if self.recording {
            self.stop(name)
        } else {
            self.start();
            None
        }
    }

    /// Appends an event to the active session. Does nothing when no session
    /// is active; warns and does nothing when the button id is missing.
    pub fn capture(&mut self, button_id: &str, event_type: EventType, now: Instant) -> bool {
        if !self.recording {
            return false;
        }
        if button_id.is_empty() {
            warn!("Invalid key press; can't add it to the recording");
            return false;
        }

        let delta_ms = self
            .last_event
            .map_or(0, |last| now.saturating_duration_since(last).as_millis() as u64);
        self.last_event = Some(now);

        debug!("Captured {event_type} on {button_id} after {delta_ms}ms");
        self.current_log
            .push(RecordingEntry::new(button_id, event_type, delta_ms));
        true
    }

    /// Saves the current log to the catalog and resets the session state.
    ///
    /// A blank name becomes `"Recording N"`. An empty log is discarded.
    pub fn save(&mut self, name: Option<&str>) -> SaveOutcome {
        let entries = std::mem::take(&mut self.current_log);
        self.last_event = None;

        if entries.is_empty() {
            warn!("Nothing was recorded; discarding the empty recording");
            return SaveOutcome::Discarded;
        }

        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Recording {}", self.catalog.len() + 1),
        };

        let index = self.catalog.len();
        info!("Saved recording {name:?} with {} events", entries.len());
        self.catalog.push(Recording::new(name.clone(), entries));
        SaveOutcome::Saved { index, name }
    }

    /// Adds externally supplied entries to the catalog.
    pub fn import(
        &mut self,
        name: &str,
        entries: Vec<RecordingEntry>,
    ) -> Result<usize, EmulatorError> {
        validate_entries(name, &entries, |_| true)?;
        let index = self.catalog.len();
        self.catalog.push(Recording::new(name.trim(), entries));
        Ok(index)
    }

    /// All saved recordings in insertion order.
    #[must_use]
    pub fn recordings(&self) -> &[Recording] {
        &self.catalog
    }

    /// Looks up a saved recording.
    pub fn get(&self, index: usize) -> Result<&Recording, EmulatorError> {
        if self.catalog.is_empty() {
            return Err(EmulatorError::NoRecordings);
        }
        self.catalog.get(index).ok_or(EmulatorError::NoSuchRecording {
            index,
            len: self.catalog.len(),
        })
    }

    /// Selects a recording for playback, applying every refusal rule:
    /// no playback while recording, the index must exist, and the recording
    /// must validate against the known buttons.
    pub fn playable(
        &self,
        index: usize,
        is_known_button: impl Fn(&str) -> bool,
    ) -> Result<&Recording, EmulatorError> {
        if self.recording {
            return Err(EmulatorError::PlaybackConflict);
        }
        let recording = self.get(index)?;
        recording.validate(is_known_button)?;
        Ok(recording)
    }

    /// Catalog listing.
    #[must_use]
    pub fn summaries(&self) -> Vec<RecordingSummary> {
        self.catalog
            .iter()
            .enumerate()
            .map(|(index, r)| RecordingSummary {
                index,
                id: r.id,
                name: r.name.clone(),
                entries: r.entries.len(),
                duration_ms: r.duration_ms(),
                created_at: r.created_at,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_capture_deltas() {
        let base = Instant::now();
        let mut recorder = Recorder::new();
        recorder.start();

        recorder.capture("_a", EventType::Down, at(base, 0));
        recorder.capture("_a", EventType::Up, at(base, 50));
        recorder.capture("_b", EventType::Down, at(base, 120));
        recorder.capture("_b", EventType::Up, at(base, 130));

        let outcome = recorder.stop(None).unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                index: 0,
                name: "Recording 1".to_string()
            }
        );

        let saved = &recorder.recordings()[0];
        let deltas: Vec<u64> = saved.entries.iter().map(|e| e.delta_ms).collect();
        let types: Vec<EventType> = saved.entries.iter().map(|e| e.event_type).collect();
        assert_eq!(deltas, vec![0, 50, 70, 10]);
        assert_eq!(
            types,
            vec![EventType::Down, EventType::Up, EventType::Down, EventType::Up]
        );
    }

    #[test]
    fn test_capture_ignored_when_not_recording() {
        let mut recorder = Recorder::new();
        assert!(!recorder.capture("_a", EventType::Down, Instant::now()));
        assert!(recorder.current_log().is_empty());
    }

    #[test]
    fn test_capture_rejects_missing_button() {
        let mut recorder = Recorder::new();
        recorder.start();
        assert!(!recorder.capture("", EventType::Down, Instant::now()));
        assert!(recorder.current_log().is_empty());
    }

    #[test]
    fn test_empty_session_is_discarded() {
        let mut recorder = Recorder::new();
        recorder.start();
        assert_eq!(recorder.stop(Some("nothing")), Some(SaveOutcome::Discarded));
        assert!(recorder.recordings().is_empty());
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_save_trims_name_and_defaults() {
        let base = Instant::now();
        let mut recorder = Recorder::new();

        recorder.start();
        recorder.capture("_a", EventType::Down, base);
        recorder.stop(Some("  warmup  "));

        recorder.start();
        recorder.capture("_a", EventType::Down, base);
        recorder.stop(Some("   "));

        let names: Vec<&str> = recorder.recordings().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["warmup", "Recording 2"]);
    }

    #[test]
    fn test_new_session_resets_delta_clock() {
        let base = Instant::now();
        let mut recorder = Recorder::new();

        recorder.start();
        recorder.capture("_a", EventType::Down, at(base, 0));
        recorder.stop(None);

        recorder.start();
        recorder.capture("_a", EventType::Down, at(base, 500));
        assert_eq!(recorder.current_log()[0].delta_ms, 0);
    }

    #[test]
    fn test_toggle() {
        let mut recorder = Recorder::new();
        assert_eq!(recorder.toggle(None), None);
        assert!(recorder.is_recording());
        recorder.capture("_a", EventType::Down, Instant::now());
        assert!(matches!(recorder.toggle(None), Some(SaveOutcome::Saved { .. })));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_playable_refusals() {
        let mut recorder = Recorder::new();
        assert_eq!(recorder.playable(0, |_| true).unwrap_err(), EmulatorError::NoRecordings);

        recorder.start();
        recorder.capture("_a", EventType::Down, Instant::now());
        recorder.stop(None);

        assert_eq!(
            recorder.playable(3, |_| true).unwrap_err(),
            EmulatorError::NoSuchRecording { index: 3, len: 1 }
        );
        assert!(matches!(
            recorder.playable(0, |_| false),
            Err(EmulatorError::InvalidRecording { .. })
        ));
        assert!(recorder.playable(0, |_| true).is_ok());

        recorder.start();
        assert_eq!(
            recorder.playable(0, |_| true).unwrap_err(),
            EmulatorError::PlaybackConflict
        );
    }

    #[test]
    fn test_import_rejects_empty() {
        let mut recorder = Recorder::new();
        assert!(recorder.import("empty", Vec::new()).is_err());
        let index = recorder
            .import("one", vec![RecordingEntry::new("_a", EventType::Down, 0)])
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(recorder.summaries()[0].name, "one");
    }
}
