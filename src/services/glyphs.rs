//! Glyph book: the embedded symbol-to-dots mapping.
//!
//! The mapping is embedded in the binary at compile time. Each entry is
//! parsed with [`Glyph::parse`]; entries that fail are logged and left out so
//! one bad symbol never disables the rest of the book.

use crate::models::Glyph;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::error;

/// One raw entry of glyphs.json.
#[derive(Debug, Clone, Deserialize)]
struct GlyphSpec {
    id: String,
    code: String,
}

/// Database schema from glyphs.json.
#[derive(Debug, Clone, Deserialize)]
struct GlyphDatabase {
    #[allow(dead_code)]
    version: String,
    language: String,
    glyphs: Vec<GlyphSpec>,
}

/// All glyphs known to the emulator, in definition order.
#[derive(Debug, Clone, Default)]
pub struct GlyphBook {
    language: String,
    glyphs: Vec<Glyph>,
    lookup: HashMap<String, usize>,
}

impl GlyphBook {
    /// Loads the glyph book from the embedded JSON file.
    pub fn load() -> Result<Self> {
        let json_data = include_str!("glyphs.json");
        let db: GlyphDatabase =
            serde_json::from_str(json_data).context("Failed to parse embedded glyphs.json")?;

        Ok(Self::from_specs(
            db.language,
            db.glyphs.into_iter().map(|spec| (spec.id, spec.code)),
        ))
    }

    /// Builds a book from `(id, code)` pairs, skipping invalid ones.
    pub fn from_specs(
        language: impl Into<String>,
        specs: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut book = Self {
            language: language.into(),
            ..Self::default()
        };

        for (id, code) in specs {
            match Glyph::parse(id, &code) {
                Ok(glyph) => {
                    book.lookup.insert(glyph.id.clone(), book.glyphs.len());
                    book.glyphs.push(glyph);
                }
                Err(e) => error!("Skipping glyph: {e}"),
            }
        }

        book
    }

    /// Language of the book (e.g. "english").
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Looks up a glyph by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Glyph> {
        self.lookup.get(id).and_then(|idx| self.glyphs.get(*idx))
    }

    /// All glyphs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter()
    }

    /// Number of glyphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_embedded_book() {
        let book = GlyphBook::load().unwrap();
        assert_eq!(book.language(), "english");
        assert_eq!(book.len(), 26);
        assert_eq!(book.get("b").unwrap().dots, vec![4, 5]);
        assert_eq!(book.get("y").unwrap().dots, vec![1, 2, 3, 4, 6]);
        assert!(book.get("?").is_none());
    }

    #[test]
    fn test_invalid_specs_are_skipped() {
        let book = GlyphBook::from_specs(
            "test",
            vec![
                ("a".to_string(), "4".to_string()),
                ("bad".to_string(), "4,9".to_string()),
                ("c".to_string(), "1,4".to_string()),
            ],
        );

        assert_eq!(book.len(), 2);
        assert!(book.get("bad").is_none());
        let ids: Vec<&str> = book.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
