//! Script actions and the `.bwt` text format.
//!
//! A script is a list of lines of the form `<action> <button> <time_ms>`:
//!
//! ```text
//! # write "b" on the jumbo cell, then hold the main button
//! click jumbo4 0
//! click jumbo5 300
//! hold button_main 500
//! release button_main 1200
//! ```
//!
//! Blank lines and `#` comments are ignored. Button names may omit the
//! leading underscore of the registry id.

use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse-grained action in a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Brief press and release.
    Click,
    /// Press without release; a later `release` ends it.
    Hold,
    /// Release a previously held button.
    Release,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => write!(f, "click"),
            Self::Hold => write!(f, "hold"),
            Self::Release => write!(f, "release"),
        }
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "click" => Ok(Self::Click),
            "hold" => Ok(Self::Hold),
            "release" => Ok(Self::Release),
            other => Err(format!("unknown action {other:?} (expected click, hold or release)")),
        }
    }
}

/// One line of a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptAction {
    /// Button name as written in the script.
    pub button: String,
    /// What to do with the button.
    pub action: ActionType,
    /// Delay before the action, in milliseconds.
    pub time_ms: u64,
}

impl ScriptAction {
    /// Creates an action.
    pub fn new(button: impl Into<String>, action: ActionType, time_ms: u64) -> Self {
        Self {
            button: button.into(),
            action,
            time_ms,
        }
    }

    /// Registry id of the button (always underscore-prefixed).
    #[must_use]
    pub fn button_id(&self) -> String {
        if self.button.starts_with('_') {
            self.button.clone()
        } else {
            format!("_{}", self.button)
        }
    }
}

/// Parses script text into actions.
pub fn parse_script(name: &str, text: &str) -> Result<Vec<ScriptAction>, CompileError> {
    let mut actions = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [action, button, time] = fields.as_slice() else {
            return Err(CompileError::at_line(
                name,
                line_no,
                format!(
                    "expected `<action> <button> <time_ms>`, found {} field(s)",
                    fields.len()
                ),
            ));
        };

        let action = action
            .parse::<ActionType>()
            .map_err(|reason| CompileError::at_line(name, line_no, reason))?;
        let time_ms = time.parse::<u64>().map_err(|_| {
            CompileError::at_line(name, line_no, format!("invalid time {time:?}"))
        })?;

        actions.push(ScriptAction::new(*button, action, time_ms));
    }

    Ok(actions)
}

/// Renders actions back to script text.
#[must_use]
pub fn render_script(title: &str, actions: &[ScriptAction]) -> String {
    let mut output = format!("# {title}\n");
    for action in actions {
        let button = action.button.strip_prefix('_').unwrap_or(&action.button);
        output.push_str(&format!("{} {} {}\n", action.action, button, action.time_ms));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_script() {
        let text = "# comment\nclick jumbo4 0\n\nhold _slate2_1 300  # inline\nrelease slate2_1 50\n";
        let actions = parse_script("demo", text).unwrap();

        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0], ScriptAction::new("jumbo4", ActionType::Click, 0));
        assert_eq!(actions[1].button_id(), "_slate2_1");
        assert_eq!(actions[1].action, ActionType::Hold);
        assert_eq!(actions[2].time_ms, 50);
    }

    #[test]
    fn test_parse_unknown_action() {
        let err = parse_script("demo", "click jumbo1 0\ntap jumbo1 10\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.reason.contains("tap"));
    }

    #[test]
    fn test_parse_bad_time() {
        let err = parse_script("demo", "click jumbo1 soon").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.reason.contains("soon"));

        assert!(parse_script("demo", "click jumbo1 -4").is_err());
    }

    #[test]
    fn test_parse_wrong_field_count() {
        let err = parse_script("demo", "click jumbo1").unwrap_err();
        assert!(err.reason.contains("2 field(s)"));
    }

    #[test]
    fn test_render_then_parse() {
        let actions = vec![
            ScriptAction::new("_jumbo1", ActionType::Hold, 0),
            ScriptAction::new("_jumbo1", ActionType::Release, 120),
        ];
        let text = render_script("export", &actions);
        assert!(text.starts_with("# export\n"));
        assert!(text.contains("hold jumbo1 0"));

        let parsed = parse_script("export", &text).unwrap();
        assert_eq!(parsed[1].button_id(), "_jumbo1");
        assert_eq!(parsed[1].time_ms, 120);
    }
}
