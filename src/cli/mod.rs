//! CLI command handlers for the BWT emulator.
//!
//! Every command runs headless so the emulator can be scripted from shells
//! and CI jobs.

pub mod catalog;
pub mod common;
pub mod compile;
pub mod config;
pub mod run;
#[cfg(feature = "web")]
pub mod serve;
pub mod type_text;

// Re-export types used by main.rs and tests
pub use catalog::{ButtonsArgs, GlyphsArgs, ScriptsArgs};
pub use common::{CliContext, CliError, CliResult, ExitCode};
pub use compile::CompileArgs;
pub use config::ConfigArgs;
pub use run::RunArgs;
#[cfg(feature = "web")]
pub use serve::ServeArgs;
pub use type_text::TypeArgs;
