//! Captured button events and saved recordings.

use crate::error::EmulatorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of button transition stored in a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// The button was pressed down.
    Down,
    /// The button was released.
    Up,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "down"),
            Self::Up => write!(f, "up"),
        }
    }
}

/// One captured transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingEntry {
    /// Button the transition applies to.
    pub button_id: String,
    /// Down or up.
    pub event_type: EventType,
    /// Milliseconds since the previous entry (0 for the first).
    pub delta_ms: u64,
}

impl RecordingEntry {
    /// Creates an entry.
    pub fn new(button_id: impl Into<String>, event_type: EventType, delta_ms: u64) -> Self {
        Self {
            button_id: button_id.into(),
            event_type,
            delta_ms,
        }
    }
}

/// A named, immutable sequence of captured transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    /// Stable identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// When the recording was saved.
    pub created_at: DateTime<Utc>,
    /// Captured transitions in order.
    pub entries: Vec<RecordingEntry>,
}

impl Recording {
    /// Creates a recording stamped with the current time.
    pub fn new(name: impl Into<String>, entries: Vec<RecordingEntry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            entries,
        }
    }

    /// Time from the first to the last entry, in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.entries.iter().skip(1).map(|e| e.delta_ms).sum()
    }

    /// Checks that the recording can be played.
    pub fn validate(&self, is_known_button: impl Fn(&str) -> bool) -> Result<(), EmulatorError> {
        validate_entries(&self.name, &self.entries, is_known_button)
    }
}

/// Checks that a sequence of entries is playable: non-empty and every
/// button resolvable.
pub fn validate_entries(
    name: &str,
    entries: &[RecordingEntry],
    is_known_button: impl Fn(&str) -> bool,
) -> Result<(), EmulatorError> {
    if entries.is_empty() {
        return Err(EmulatorError::InvalidRecording {
            name: name.to_string(),
            reason: "recording is empty".to_string(),
        });
    }

    if let Some((index, entry)) = entries
        .iter()
        .enumerate()
        .find(|(_, entry)| !is_known_button(&entry.button_id))
    {
        return Err(EmulatorError::InvalidRecording {
            name: name.to_string(),
            reason: format!("entry {index} references unknown button {:?}", entry.button_id),
        });
    }

    Ok(())
}

/// Entry as received from outside (imported JSON), before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecordingEntry {
    /// Button id.
    pub button_id: String,
    /// Event type as text ("down" or "up").
    pub event_type: String,
    /// Delay since the previous entry; may be negative in malformed input.
    pub delta_ms: i64,
}

impl TryFrom<RawRecordingEntry> for RecordingEntry {
    type Error = String;

    fn try_from(raw: RawRecordingEntry) -> Result<Self, Self::Error> {
        let event_type = match raw.event_type.to_ascii_lowercase().as_str() {
            "down" => EventType::Down,
            "up" => EventType::Up,
            other => return Err(format!("unknown event type {other:?}")),
        };
        let delta_ms = u64::try_from(raw.delta_ms)
            .map_err(|_| format!("negative delta {}", raw.delta_ms))?;

        Ok(Self {
            button_id: raw.button_id,
            event_type,
            delta_ms,
        })
    }
}

/// Converts imported entries, rejecting the whole recording on the first bad entry.
pub fn entries_from_raw(
    name: &str,
    raw: Vec<RawRecordingEntry>,
) -> Result<Vec<RecordingEntry>, EmulatorError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, entry)| {
            RecordingEntry::try_from(entry).map_err(|reason| EmulatorError::InvalidRecording {
                name: name.to_string(),
                reason: format!("entry {index}: {reason}"),
            })
        })
        .collect()
}
