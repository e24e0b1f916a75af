//! BWT Emulator - drive an emulated Braille Writing Tutor from the shell
//!
//! Runs scripts and types text against the emulated device, lists the
//! available scripts, glyphs, and buttons, and serves the HTTP API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bwtemu::cli::{
    ButtonsArgs, CliContext, CliResult, CompileArgs, ConfigArgs, GlyphsArgs, RunArgs, ScriptsArgs,
    TypeArgs,
};
#[cfg(feature = "web")]
use bwtemu::cli::ServeArgs;
use bwtemu::constants::APP_BINARY_NAME;

/// BWT Emulator - Braille Writing Tutor input emulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    #[cfg(feature = "web")]
    Serve(ServeArgs),
    /// Run a script against the device
    Run(RunArgs),
    /// Type text into a cell
    Type(TypeArgs),
    /// Show the entries a script compiles to
    Compile(CompileArgs),
    /// List scripts
    Scripts(ScriptsArgs),
    /// List glyphs
    Glyphs(GlyphsArgs),
    /// List buttons
    Buttons(ButtonsArgs),
    /// Manage configuration
    Config(ConfigArgs),
}

async fn dispatch(command: Command, ctx: &CliContext) -> CliResult<()> {
    match command {
        #[cfg(feature = "web")]
        Command::Serve(args) => args.execute(ctx).await,
        Command::Run(args) => args.execute(ctx).await,
        Command::Type(args) => args.execute(ctx).await,
        Command::Compile(args) => args.execute(ctx),
        Command::Scripts(args) => args.execute(ctx),
        Command::Glyphs(args) => args.execute(),
        Command::Buttons(args) => args.execute(ctx),
        Command::Config(args) => args.execute(ctx),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match CliContext::new(cli.config) {
        Ok(ctx) => dispatch(cli.command, &ctx).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{APP_BINARY_NAME}: {e}");
        std::process::exit(e.exit_code());
    }
}
