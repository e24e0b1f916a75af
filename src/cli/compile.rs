//! Script compilation preview.

use clap::Args;
use serde::Serialize;

use crate::cli::common::{print_json, CliContext, CliError, CliResult};
use crate::models::RecordingEntry;
use crate::services::{compile_script, ButtonRegistry, ScriptSource};

/// Compile a script and show the resulting entries without playing them
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Script name (file stem in the scripts directory)
    #[arg(value_name = "SCRIPT")]
    pub script: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Debug)]
struct CompileOutput<'a> {
    script: &'a str,
    actions: usize,
    duration_ms: u64,
    entries: &'a [RecordingEntry],
}

impl CompileArgs {
    /// Execute the compile command
    pub fn execute(&self, ctx: &CliContext) -> CliResult<()> {
        let config = ctx.load_config()?;
        let source = ctx.script_source(&config)?;

        let actions = source.fetch_script(&self.script).map_err(|e| {
            if e.line == 0 {
                CliError::io(e.to_string())
            } else {
                CliError::validation(e.to_string())
            }
        })?;
        let registry = ButtonRegistry::with_overrides(&config.buttons);
        let entries = compile_script(&actions, &registry, config.timing.click_settle_ms);

        let output = CompileOutput {
            script: &self.script,
            actions: actions.len(),
            duration_ms: entries.iter().map(|e| e.delta_ms).sum(),
            entries: &entries,
        };

        if self.json {
            print_json(&output)?;
        } else {
            print_table(&output);
        }
        Ok(())
    }
}

fn print_table(output: &CompileOutput<'_>) {
    println!(
        "Script '{}': {} action(s) -> {} entries, {} ms",
        output.script,
        output.actions,
        output.entries.len(),
        output.duration_ms
    );
    println!();
    println!("{:>4}  {:<14} {:<5} {:>8}", "#", "BUTTON", "EVENT", "DELTA");
    for (index, entry) in output.entries.iter().enumerate() {
        println!(
            "{index:>4}  {:<14} {:<5} {:>6}ms",
            entry.button_id, entry.event_type, entry.delta_ms
        );
    }
}
