//! Glyph definitions: a symbol and the dots that produce it.

use crate::constants::NUM_CELL_DOTS;
use crate::error::EmulatorError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A symbol (e.g. the letter "b") mapped to the cell dots pressed to write it.
///
/// # Validation
///
/// - Every token of the comma-separated code must parse as an integer in 1..=6
/// - Dots are stored ascending with duplicates removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Glyph {
    /// Identifier shown once the glyph has been written.
    pub id: String,
    /// Dot numbers pressed in order, ascending and unique.
    pub dots: Vec<u8>,
}

impl Glyph {
    /// Parses a glyph from a comma-separated dot list such as `"1,2,4"`.
    pub fn parse(id: impl Into<String>, spec: &str) -> Result<Self, EmulatorError> {
        let id = id.into();
        let invalid = |reason: String| EmulatorError::InvalidGlyphSpec {
            id: id.clone(),
            spec: spec.to_string(),
            reason,
        };

        let mut dots = BTreeSet::new();
        for token in spec.split(',') {
            let token = token.trim();
            let dot: i64 = token
                .parse()
                .map_err(|_| invalid(format!("{token:?} is not a number")))?;
            if !(1..=i64::from(NUM_CELL_DOTS)).contains(&dot) {
                return Err(invalid(format!("dot {dot} is outside 1..={NUM_CELL_DOTS}")));
            }
            dots.insert(dot as u8);
        }

        Ok(Self {
            id,
            dots: dots.into_iter().collect(),
        })
    }

    /// The dot list in its comma-separated form.
    #[must_use]
    pub fn code(&self) -> String {
        self.dots
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Glyph {{id: {:?}, code: {:?}}}", self.id, self.code())
    }
}
