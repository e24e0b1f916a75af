//! Button registry and the default device layout.
//!
//! The device exposes 32 slate cells of six dots, one jumbo cell, and four
//! control buttons. Each control has a fixed bytecode; config may override
//! individual codes or add controls.

use crate::constants::{NUM_CELL_DOTS, NUM_SLATE_CELLS};
use crate::error::EmulatorError;
use crate::models::{Button, CellTarget};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Bytecode that puts the device into its initial state. Sent directly,
/// never through the pending queue.
pub const INITIALIZE_CODE: &str = "bt";

/// Control buttons and their codes.
const CONTROL_BUTTONS: &[(&str, &str)] = &[
    ("_button_main", "an"),
    ("_button_alt", "cn"),
    ("_button_left", "dn"),
    ("_button_right", "fn"),
];

/// Summary of a registered button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonInfo {
    /// Control identifier.
    pub id: String,
    /// Bytecode for the control.
    pub code: String,
    /// Whether the button is latched HELD.
    pub holding: bool,
}

/// Owns every [`Button`] for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct ButtonRegistry {
    buttons: HashMap<String, Button>,
}

impl ButtonRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry populated with the default device layout.
    pub fn with_default_layout() -> Self {
        let mut registry = Self::new();
        for (id, code) in default_layout() {
            registry.register(id, code);
        }
        registry
    }

    /// Creates the default layout and applies code overrides on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut registry = Self::with_default_layout();
        for (id, code) in overrides {
            debug!("Overriding code for {id} with {code:?}");
            registry.buttons.insert(id.clone(), Button::new(id.clone(), code.clone()));
        }
        registry
    }

    /// Registers a button, replacing any existing one with the same id.
    pub fn register(&mut self, id: impl Into<String>, code: impl Into<String>) {
        let id = id.into();
        if self.buttons.contains_key(&id) {
            warn!("Adding button {id:?} twice; replacing the previous one");
        }
        let button = Button::new(id.clone(), code);
        self.buttons.insert(id, button);
    }

    /// Looks up a button.
    pub fn get(&self, id: &str) -> Result<&Button, EmulatorError> {
        self.buttons
            .get(id)
            .ok_or_else(|| EmulatorError::UnknownButtonMapping(id.to_string()))
    }

    /// Looks up a button for a state transition.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Button, EmulatorError> {
        self.buttons
            .get_mut(id)
            .ok_or_else(|| EmulatorError::UnknownButtonMapping(id.to_string()))
    }

    /// Whether a button with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.buttons.contains_key(id)
    }

    /// Number of registered buttons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    /// All buttons, sorted by id.
    #[must_use]
    pub fn list(&self) -> Vec<ButtonInfo> {
        let mut list: Vec<ButtonInfo> = self
            .buttons
            .values()
            .map(|b| ButtonInfo {
                id: b.id().to_string(),
                code: b.code().to_string(),
                holding: b.is_holding(),
            })
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }
}

/// The default `(id, code)` pairs of the device.
///
/// Slate cell `n` dot `d` sends `"{n-1:02}{d}n"`, jumbo dot `d` sends `"j{d}n"`.
#[must_use]
pub fn default_layout() -> Vec<(String, String)> {
    let mut layout = Vec::new();

    for cell in 1..=NUM_SLATE_CELLS {
        for dot in 1..=NUM_CELL_DOTS {
            layout.push((
                CellTarget::Slate(cell).button_id(dot),
                format!("{:02}{dot}n", cell - 1),
            ));
        }
    }

    for dot in 1..=NUM_CELL_DOTS {
        layout.push((CellTarget::Jumbo.button_id(dot), format!("j{dot}n")));
    }

    for (id, code) in CONTROL_BUTTONS {
        layout.push(((*id).to_string(), (*code).to_string()));
    }

    layout
}
