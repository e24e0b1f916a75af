//! Pending bytecode queue and the set of held buttons.
//!
//! This is the data half of the bytecode scheduler. The periodic flush and
//! holdings-refresh tasks live in [`crate::device`] and call into it one
//! step at a time.

/// A button whose code is re-asserted on every holdings refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldButton {
    /// Control identifier.
    pub id: String,
    /// Code enqueued on each refresh.
    pub code: String,
}

/// Pending queue and held set.
#[derive(Debug, Clone, Default)]
pub struct Processor {
    pending: Vec<String>,
    held: Vec<HeldButton>,
}

impl Processor {
    /// Creates an empty processor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a code to the pending queue.
    pub fn enqueue(&mut self, code: impl Into<String>) {
        self.pending.push(code.into());
    }

    /// Codes waiting for the next flush, oldest first.
    #[must_use]
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Takes every pending code as one concatenated transmission and clears
    /// the queue. Returns `None` when nothing is pending.
    pub fn drain(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.pending).concat())
    }

    /// Adds a button to the held set. Returns false if it was already there.
    pub fn add_hold(&mut self, id: &str, code: &str) -> bool {
        if self.is_held(id) {
            return false;
        }
        self.held.push(HeldButton {
            id: id.to_string(),
            code: code.to_string(),
        });
        true
    }

    /// Removes a button from the held set. Returns false if it was not there.
    pub fn remove_hold(&mut self, id: &str) -> bool {
        let before = self.held.len();
        self.held.retain(|held| held.id != id);
        self.held.len() != before
    }

    /// Whether a button is in the held set.
    #[must_use]
    pub fn is_held(&self, id: &str) -> bool {
        self.held.iter().any(|held| held.id == id)
    }

    /// Ids of every held button, in the order they were added.
    #[must_use]
    pub fn held_ids(&self) -> Vec<&str> {
        self.held.iter().map(|held| held.id.as_str()).collect()
    }

    /// One holdings refresh: enqueues every held button's code once.
    /// Returns how many codes were enqueued.
    pub fn enqueue_holdings(&mut self) -> usize {
        let codes: Vec<String> = self.held.iter().map(|held| held.code.clone()).collect();
        let count = codes.len();
        self.pending.extend(codes);
        count
    }
}
