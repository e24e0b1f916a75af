//! Listing commands for scripts, glyphs, and buttons.

use clap::Args;
use regex::Regex;
use serde::Serialize;

use crate::cli::common::{print_json, CliContext, CliError, CliResult};
use crate::services::{ButtonInfo, ButtonRegistry, GlyphBook, ScriptSource};

/// List the scripts in the scripts directory
#[derive(Debug, Clone, Args)]
pub struct ScriptsArgs {
    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ScriptsResponse {
    dir: String,
    scripts: Vec<String>,
    count: usize,
}

impl ScriptsArgs {
    /// Execute the scripts command
    pub fn execute(&self, ctx: &CliContext) -> CliResult<()> {
        let config = ctx.load_config()?;
        let source = ctx.script_source(&config)?;
        let scripts = source
            .list_scripts()
            .map_err(|e| CliError::io(format!("Failed to list scripts: {e:#}")))?;

        if self.json {
            return print_json(&ScriptsResponse {
                dir: source.dir().display().to_string(),
                count: scripts.len(),
                scripts,
            });
        }

        println!("Scripts in {}:", source.dir().display());
        if scripts.is_empty() {
            println!("  (none)");
        }
        for name in &scripts {
            println!("  {name}");
        }
        Ok(())
    }
}

/// List the glyphs that can be typed
#[derive(Debug, Clone, Args)]
pub struct GlyphsArgs {
    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct GlyphsResponse<'a> {
    language: &'a str,
    glyphs: Vec<GlyphRow<'a>>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct GlyphRow<'a> {
    id: &'a str,
    dots: &'a [u8],
    code: String,
}

impl GlyphsArgs {
    /// Execute the glyphs command
    pub fn execute(&self) -> CliResult<()> {
        let book = GlyphBook::load()
            .map_err(|e| CliError::io(format!("Failed to load glyph book: {e:#}")))?;
        let glyphs: Vec<GlyphRow<'_>> = book
            .iter()
            .map(|g| GlyphRow {
                id: &g.id,
                dots: &g.dots,
                code: g.code(),
            })
            .collect();

        if self.json {
            return print_json(&GlyphsResponse {
                language: book.language(),
                count: glyphs.len(),
                glyphs,
            });
        }

        println!("Glyphs ({}, {}):", book.language(), glyphs.len());
        for row in &glyphs {
            println!("  {:<4} {}", row.id, row.code);
        }
        Ok(())
    }
}

/// List the buttons of the device layout
#[derive(Debug, Clone, Args)]
pub struct ButtonsArgs {
    /// Optional regex filter for button ids
    #[arg(long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ButtonsResponse {
    buttons: Vec<ButtonInfo>,
    count: usize,
}

impl ButtonsArgs {
    /// Execute the buttons command
    pub fn execute(&self, ctx: &CliContext) -> CliResult<()> {
        let config = ctx.load_config()?;
        let buttons = filter_buttons(
            ButtonRegistry::with_overrides(&config.buttons).list(),
            self.filter.as_deref(),
        )?;

        if self.json {
            return print_json(&ButtonsResponse {
                count: buttons.len(),
                buttons,
            });
        }

        println!("{:<14} CODE", "BUTTON");
        for button in &buttons {
            println!("{:<14} {}", button.id, button.code);
        }
        println!();
        println!("{} button(s)", buttons.len());
        Ok(())
    }
}

fn filter_buttons(buttons: Vec<ButtonInfo>, filter: Option<&str>) -> CliResult<Vec<ButtonInfo>> {
    let Some(pattern) = filter else {
        return Ok(buttons);
    };
    let regex = Regex::new(pattern)
        .map_err(|e| CliError::validation(format!("Invalid filter regex: {e}")))?;
    Ok(buttons.into_iter().filter(|b| regex.is_match(&b.id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_buttons() {
        let all = ButtonRegistry::with_default_layout().list();
        let jumbo = filter_buttons(all.clone(), Some("^_jumbo")).unwrap();
        assert_eq!(jumbo.len(), 6);
        assert!(jumbo.iter().all(|b| b.id.starts_with("_jumbo")));

        assert_eq!(filter_buttons(all.clone(), None).unwrap().len(), all.len());
        assert_eq!(filter_buttons(all, Some("(")).unwrap_err().exit_code(), 1);
    }
}
