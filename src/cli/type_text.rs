//! Typing text as a sequence of glyphs.

use clap::Args;

use crate::cli::common::{print_transmissions, CliContext, CliError, CliResult};
use crate::cli::run::settle_and_stop;
use crate::device::RunOutcome;
use crate::models::CellTarget;
use crate::services::GlyphBook;

/// Type text into a cell, one glyph after another
#[derive(Args, Debug)]
pub struct TypeArgs {
    /// Text to type; spaces leave a gap of one glyph step
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Cell to write into (jumbo or slate1..slate32)
    #[arg(long, default_value = "jumbo")]
    pub cell: String,

    /// Collect transmissions in memory and print them instead of sending
    #[arg(long)]
    pub dry_run: bool,
}

impl TypeArgs {
    /// Execute the type command
    pub async fn execute(&self, ctx: &CliContext) -> CliResult<()> {
        let target: CellTarget = self
            .cell
            .parse()
            .map_err(|e: crate::error::EmulatorError| CliError::validation(e.to_string()))?;

        let config = ctx.load_config()?;
        let (emulator, memory) = ctx.emulator(&config, self.dry_run)?;
        let glyph_ids = glyph_ids(emulator.glyphs(), &self.text)?;

        emulator.run();
        emulator.set_target(target);

        let mut typed = 0;
        for id in glyph_ids {
            let Some(id) = id else {
                tokio::time::sleep(emulator.timing().glyph_step()).await;
                continue;
            };
            let Some(handle) = emulator.send_glyph(&id)? else {
                break;
            };
            if handle.wait().await == RunOutcome::Completed {
                typed += 1;
            }
        }
        settle_and_stop(&emulator).await;

        if let Some(memory) = memory {
            print_transmissions(&memory);
        }
        println!("Typed {typed} glyph(s) into {target}.");
        Ok(())
    }
}

/// Maps text to glyph ids; `None` stands for a space. Rejects the whole text
/// if any character has no glyph.
fn glyph_ids(book: &GlyphBook, text: &str) -> CliResult<Vec<Option<String>>> {
    let mut ids = Vec::with_capacity(text.len());
    for c in text.chars() {
        if c.is_whitespace() {
            ids.push(None);
            continue;
        }
        let id = c.to_lowercase().to_string();
        if book.get(&id).is_none() {
            return Err(CliError::validation(format!(
                "No glyph for {c:?} in the {} glyph book",
                book.language()
            )));
        }
        ids.push(Some(id));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_ids() {
        let book = GlyphBook::load().unwrap();
        assert_eq!(
            glyph_ids(&book, "Ab c").unwrap(),
            vec![
                Some("a".to_string()),
                Some("b".to_string()),
                None,
                Some("c".to_string())
            ]
        );
    }

    #[test]
    fn test_unknown_character_rejected() {
        let book = GlyphBook::load().unwrap();
        let err = glyph_ids(&book, "a~").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.message.contains('~'));
    }
}
