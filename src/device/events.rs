//! Transition events published by the emulator.
//!
//! Presentation layers subscribe to these instead of being called from the
//! state machine. Events are informational; dropping them never affects the
//! device.

use std::collections::VecDeque;

use serde::Serialize;

use crate::models::CellTarget;

/// Something observable happened on the emulated device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A button started an activation.
    ButtonActive {
        /// Button id.
        id: String,
    },
    /// A button left the held set.
    ButtonInactive {
        /// Button id.
        id: String,
    },
    /// A glyph pulsed one of its dots.
    GlyphDotMarked {
        /// Cell the glyph is written into.
        target: CellTarget,
        /// Button that was pulsed.
        button_id: String,
    },
    /// Every dot of a glyph was pulsed.
    GlyphCompleted {
        /// Cell the glyph was written into.
        target: CellTarget,
        /// Glyph id shown as the completion marker.
        glyph: String,
    },
    /// Dot and completion markers of a cell were cleared.
    GlyphCleared {
        /// Cell whose markers were cleared.
        target: CellTarget,
    },
    /// A capture session started.
    RecordingStarted,
    /// A capture session was saved to the catalog.
    RecordingSaved {
        /// Catalog index.
        index: usize,
        /// Assigned name.
        name: String,
    },
    /// A capture session ended with nothing captured.
    RecordingDiscarded,
    /// Playback began.
    PlaybackStarted {
        /// Recording or script name.
        name: String,
        /// Number of entries to replay.
        entries: usize,
    },
    /// Playback replayed every entry.
    PlaybackFinished {
        /// Recording or script name.
        name: String,
    },
    /// Playback stopped early.
    PlaybackCancelled {
        /// Recording or script name.
        name: String,
    },
    /// The transport accepted a flush.
    Transmitted {
        /// Bytecode that was sent.
        bytecode: String,
    },
    /// The transport rejected a flush.
    TransmitFailed {
        /// Bytecode that was lost.
        bytecode: String,
        /// Transport error message.
        error: String,
    },
}

/// An event with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedEvent {
    /// Sequence number, counting from 0 since the emulator was created.
    pub seq: u64,
    /// When the event was emitted (RFC 3339).
    pub timestamp: String,
    /// The event itself.
    #[serde(flatten)]
    pub event: DeviceEvent,
}

/// A slice of the event log.
#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    /// Events in emission order.
    pub events: Vec<LoggedEvent>,
    /// Offset to pass to fetch the events after these.
    pub next_offset: u64,
    /// Whether more events are already available after `next_offset`.
    pub has_more: bool,
}

/// The most recent events, kept for clients that poll instead of subscribing.
#[derive(Debug)]
pub(crate) struct EventLog {
    entries: VecDeque<LoggedEvent>,
    next_seq: u64,
    capacity: usize,
}

impl EventLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            next_seq: 0,
            capacity,
        }
    }

    /// Appends an event, dropping the oldest one when full.
    pub(crate) fn push(&mut self, event: DeviceEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LoggedEvent {
            seq: self.next_seq,
            timestamp: chrono::Utc::now().to_rfc3339(),
            event,
        });
        self.next_seq += 1;
    }

    /// Up to `limit` events with a sequence number of at least `offset`.
    /// Events already dropped from the log are skipped.
    pub(crate) fn page(&self, offset: u64, limit: usize) -> EventPage {
        let events: Vec<LoggedEvent> = self
            .entries
            .iter()
            .filter(|e| e.seq >= offset)
            .take(limit)
            .cloned()
            .collect();
        let next_offset = events
            .last()
            .map_or_else(|| offset.min(self.next_seq), |e| e.seq + 1);

        EventPage {
            events,
            next_offset,
            has_more: next_offset < self.next_seq,
        }
    }
}
