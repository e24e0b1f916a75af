//! Button state machine and cell addressing.

use crate::constants::NUM_SLATE_CELLS;
use crate::error::EmulatorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single physical control on the device.
///
/// A button cycles `IDLE -> PRESSED -> IDLE` for a plain press and
/// `IDLE -> HELD -> IDLE` for a hold. The methods here only update the
/// button's own flags; the returned outcome tells the caller which side
/// effects (enqueue, refresh start/stop, recording events) to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    id: String,
    code: String,
    holding: bool,
    received_up: bool,
}

/// Effects of a [`Button::press_down`] or [`Button::hold_down`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressOutcome {
    /// Hold status before the call.
    pub was_holding: bool,
    /// True when the press starts a new activation: the caller must enqueue
    /// the replication burst, begin refreshing, and emit a DOWN event.
    pub began: bool,
    /// True when a hold toggle turned the hold off: the caller must stop the
    /// refresh and emit an UP event.
    pub ended: bool,
}

/// Effects of a [`Button::press_up`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// True when the button left the held set: the caller must stop the
    /// refresh and emit an UP event. False for a latched hold.
    pub released: bool,
}

impl Button {
    /// Creates an idle button.
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            holding: false,
            received_up: true,
        }
    }

    /// Control identifier (e.g. `_slate3_4`).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Protocol bytecode sent for this button.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Whether the button is latched in the HELD state.
    #[must_use]
    pub const fn is_holding(&self) -> bool {
        self.holding
    }

    /// Whether the release of the last press has been observed.
    #[must_use]
    pub const fn received_up(&self) -> bool {
        self.received_up
    }

    /// Presses the button down.
    ///
    /// If the release of the previous press never arrived (the pointer was
    /// dragged off the control), the button is promoted to HELD so the
    /// dangling activation keeps being refreshed instead of vanishing.
    pub fn press_down(&mut self) -> PressOutcome {
        let was_holding = self.holding;
        let dangling = !self.received_up;

        self.holding = dangling && !was_holding;
        self.received_up = false;

        PressOutcome {
            was_holding,
            began: !was_holding,
            ended: false,
        }
    }

    /// Releases the button. A HELD button ignores the release.
    pub fn press_up(&mut self) -> ReleaseOutcome {
        self.received_up = true;
        ReleaseOutcome {
            released: !self.holding,
        }
    }

    /// Toggles a hold: presses down, then latches HELD unless it already was.
    pub fn hold_down(&mut self) -> PressOutcome {
        let mut outcome = self.press_down();
        self.holding = !outcome.was_holding;
        outcome.ended = outcome.was_holding;
        outcome
    }

    /// Returns the button to IDLE whatever state it is in, including a latched
    /// or drag-off hold. Returns true if it was active.
    pub fn force_release(&mut self) -> bool {
        let active = self.holding || !self.received_up;
        self.holding = false;
        self.received_up = true;
        active
    }
}

/// A cell that glyphs can be typed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CellTarget {
    /// The large six-dot cell used for practice.
    Jumbo,
    /// One of the slate cells, numbered from 1.
    Slate(u8),
}

impl CellTarget {
    /// Prefix shared by every dot button of this cell.
    #[must_use]
    pub fn prefix(self) -> String {
        match self {
            Self::Jumbo => "_jumbo".to_string(),
            Self::Slate(n) => format!("_slate{n}_"),
        }
    }

    /// Button id of the given dot (1-6) in this cell.
    #[must_use]
    pub fn button_id(self, dot: u8) -> String {
        format!("{}{dot}", self.prefix())
    }
}

impl fmt::Display for CellTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jumbo => write!(f, "jumbo"),
            Self::Slate(n) => write!(f, "slate{n}"),
        }
    }
}

impl FromStr for CellTarget {
    type Err = EmulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        if trimmed == "jumbo" {
            return Ok(Self::Jumbo);
        }

        trimmed
            .strip_prefix("slate")
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=NUM_SLATE_CELLS).contains(n))
            .map(Self::Slate)
            .ok_or_else(|| EmulatorError::InvalidTarget(s.to_string()))
    }
}

impl TryFrom<String> for CellTarget {
    type Error = EmulatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellTarget> for String {
    fn from(value: CellTarget) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_press_and_release() {
        let mut button = Button::new("_jumbo1", "j1n");

        let down = button.press_down();
        assert!(down.began);
        assert!(!down.was_holding);
        assert!(!button.is_holding());
        assert!(!button.received_up());

        let up = button.press_up();
        assert!(up.released);
        assert!(button.received_up());
    }

    #[test]
    fn test_missed_release_promotes_to_held() {
        let mut button = Button::new("_jumbo1", "j1n");
        button.press_down();

        // Second press without a release in between
        let down = button.press_down();
        assert!(down.began);
        assert!(button.is_holding());

        // The late release is now ignored
        assert!(!button.press_up().released);
    }

    #[test]
    fn test_hold_toggles_on_and_off() {
        let mut button = Button::new("_slate1_1", "001n");

        let first = button.hold_down();
        assert!(!first.was_holding);
        assert!(first.began);
        assert!(button.is_holding());
        assert!(!button.press_up().released);

        let second = button.hold_down();
        assert!(second.was_holding);
        assert!(!second.began);
        assert!(second.ended);
        assert!(!button.is_holding());
        assert!(button.press_up().released);
    }

    #[test]
    fn test_force_release_clears_drag_off_hold() {
        let mut button = Button::new("_jumbo1", "j1n");
        button.press_down();
        button.press_down();
        assert!(button.is_holding());

        assert!(button.force_release());
        assert!(!button.is_holding());
        assert!(button.received_up());
        assert!(!button.force_release());
    }

    #[test]
    fn test_plain_press_on_held_button_unlatches() {
        let mut button = Button::new("_slate1_1", "001n");
        button.hold_down();
        button.press_up();

        let down = button.press_down();
        assert!(down.was_holding);
        assert!(!down.began);
        assert!(!down.ended);
        assert!(button.press_up().released);
    }

    #[test]
    fn test_cell_target_parse() {
        assert_eq!("jumbo".parse::<CellTarget>().unwrap(), CellTarget::Jumbo);
        assert_eq!("Slate12".parse::<CellTarget>().unwrap(), CellTarget::Slate(12));
        assert!("slate0".parse::<CellTarget>().is_err());
        assert!("slate33".parse::<CellTarget>().is_err());
        assert!("cell".parse::<CellTarget>().is_err());
    }

    #[test]
    fn test_cell_target_button_ids() {
        assert_eq!(CellTarget::Jumbo.button_id(4), "_jumbo4");
        assert_eq!(CellTarget::Slate(3).button_id(5), "_slate3_5");
        assert_eq!(CellTarget::Slate(3).to_string(), "slate3");
    }
}
