//! Headless script playback.

use clap::Args;
use tracing::info;

use crate::cli::common::{print_transmissions, CliContext, CliResult};
use crate::config::TimingConfig;
use crate::device::{Emulator, RunOutcome};

/// Run a script against the device and exit once it finished
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Script name (file stem in the scripts directory)
    #[arg(value_name = "SCRIPT")]
    pub script: String,

    /// Collect transmissions in memory and print them instead of sending
    #[arg(long)]
    pub dry_run: bool,

    /// Send the initialise code before the script starts
    #[arg(long)]
    pub initialize: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, ctx: &CliContext) -> CliResult<()> {
        let config = ctx.load_config()?;
        let source = ctx.script_source(&config)?;
        let (emulator, memory) = ctx.emulator(&config, self.dry_run)?;

        emulator.run();
        if self.initialize {
            emulator.initialize();
        }

        let handle = emulator.run_script(&source, &self.script)?;
        let outcome = handle.wait().await;
        settle_and_stop(&emulator).await;

        if let Some(memory) = memory {
            print_transmissions(&memory);
        }

        match outcome {
            RunOutcome::Completed => println!("Script '{}' completed.", self.script),
            RunOutcome::Cancelled => println!("Script '{}' was cancelled.", self.script),
        }
        Ok(())
    }
}

/// How long the last press keeps producing codes after a run ends.
pub(crate) fn settle_time(timing: &TimingConfig) -> std::time::Duration {
    timing.replication_delay() * timing.replication_count + timing.flush_interval()
}

/// Waits for replication bursts to drain, then stops the scheduler.
pub(crate) async fn settle_and_stop(emulator: &Emulator) {
    let settle = settle_time(emulator.timing());
    info!("Waiting {settle:?} for pending codes");
    tokio::time::sleep(settle).await;
    emulator.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_settle_time_covers_burst() {
        let timing = TimingConfig::default();
        assert_eq!(settle_time(&timing), Duration::from_millis(350));
    }
}
