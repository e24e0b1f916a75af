//! Configuration management CLI commands.

use crate::cli::common::{print_json, CliContext, CliError, CliResult};
use crate::config::{Config, TransportKind};
use crate::constants::APP_NAME;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// Configuration management commands
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Display current configuration
    Show(ConfigShowArgs),
    /// Print the path of the config file
    Path,
    /// Set configuration values
    Set(ConfigSetArgs),
}

/// Display current configuration
#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Set configuration values
#[derive(Args, Debug, Default)]
pub struct ConfigSetArgs {
    /// Transport kind (log or device)
    #[arg(long, value_name = "KIND")]
    transport: Option<String>,

    /// Device node or file written by the device transport
    #[arg(long, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Directory holding .bwt scripts
    #[arg(long, value_name = "DIR")]
    scripts_dir: Option<PathBuf>,

    /// Host the web server binds to
    #[arg(long)]
    host: Option<String>,

    /// Port the web server listens on
    #[arg(long)]
    port: Option<u16>,
}

/// JSON-serializable configuration for output
#[derive(Serialize, Debug)]
struct ConfigOutput<'a> {
    config_file: String,
    scripts_dir: String,
    #[serde(flatten)]
    config: &'a Config,
}

impl ConfigArgs {
    /// Execute config subcommand
    pub fn execute(&self, ctx: &CliContext) -> CliResult<()> {
        match &self.command {
            ConfigCommand::Show(args) => args.execute(ctx),
            ConfigCommand::Path => {
                println!("{}", ctx.config_path().display());
                Ok(())
            }
            ConfigCommand::Set(args) => args.execute(ctx),
        }
    }
}

impl ConfigShowArgs {
    /// Execute show command
    pub fn execute(&self, ctx: &CliContext) -> CliResult<()> {
        let config = ctx.load_config()?;
        let scripts_dir = config
            .paths
            .scripts_dir()
            .map_err(|e| CliError::io(format!("Failed to resolve scripts directory: {e}")))?;

        if self.json {
            return print_json(&ConfigOutput {
                config_file: ctx.config_path().display().to_string(),
                scripts_dir: scripts_dir.display().to_string(),
                config: &config,
            });
        }

        let title = format!("{APP_NAME} Configuration");
        println!("{title}");
        println!("{}", "=".repeat(title.len()));
        println!();
        println!("File: {}", ctx.config_path().display());
        println!();

        println!("Transport:");
        println!("  Kind: {}", transport_name(config.transport.kind));
        if let Some(path) = &config.transport.device_path {
            println!("  Device: {}", path.display());
        }
        println!();

        let timing = &config.timing;
        println!("Timing:");
        println!("  Flush interval:       {} ms", timing.flush_interval_ms);
        println!("  Holdings interval:    {} ms", timing.holdings_interval_ms);
        println!(
            "  Replication:          {} x every {} ms",
            timing.replication_count, timing.replication_delay_ms
        );
        println!("  Glyph step:           {} ms", timing.glyph_step_ms);
        println!("  Glyph visible:        {} ms", timing.glyph_visible_ms);
        println!("  Click settle:         {} ms", timing.click_settle_ms);
        println!();

        println!("Paths:");
        println!("  Scripts: {}", scripts_dir.display());
        println!();

        println!("Server:");
        println!("  Address: {}:{}", config.server.host, config.server.port);

        if !config.buttons.is_empty() {
            println!();
            println!("Button overrides:");
            for (id, code) in &config.buttons {
                println!("  {id} = {code}");
            }
        }
        Ok(())
    }
}

impl ConfigSetArgs {
    /// Execute set command
    pub fn execute(&self, ctx: &CliContext) -> CliResult<()> {
        if self.transport.is_none()
            && self.device.is_none()
            && self.scripts_dir.is_none()
            && self.host.is_none()
            && self.port.is_none()
        {
            return Err(CliError::validation(
                "At least one configuration option must be specified: --transport, --device, --scripts-dir, --host, or --port",
            ));
        }

        let mut config = ctx.load_config()?;
        self.apply(&mut config)?;

        config
            .validate()
            .map_err(|e| CliError::validation(format!("Invalid configuration: {e}")))?;

        if let Some(dir) = &config.paths.scripts_dir {
            std::fs::create_dir_all(dir).map_err(|e| {
                CliError::io(format!(
                    "Failed to create scripts directory {}: {e}",
                    dir.display()
                ))
            })?;
        }

        config
            .save_to(ctx.config_path())
            .map_err(|e| CliError::io(format!("Failed to save configuration: {e:#}")))?;

        println!("Configuration updated successfully.");
        Ok(())
    }

    fn apply(&self, config: &mut Config) -> CliResult<()> {
        if let Some(kind) = &self.transport {
            config.transport.kind = parse_transport(kind)?;
        }
        if let Some(path) = &self.device {
            config.transport.device_path = Some(path.clone());
        }
        if let Some(dir) = &self.scripts_dir {
            config.paths.scripts_dir = Some(dir.clone());
        }
        if let Some(host) = &self.host {
            if host.trim().is_empty() {
                return Err(CliError::validation("Host must not be empty"));
            }
            config.server.host = host.trim().to_string();
        }
        if let Some(port) = self.port {
            if port == 0 {
                return Err(CliError::validation("Port must be greater than zero"));
            }
            config.server.port = port;
        }
        Ok(())
    }
}

fn parse_transport(value: &str) -> CliResult<TransportKind> {
    match value.to_ascii_lowercase().as_str() {
        "log" => Ok(TransportKind::Log),
        "device" => Ok(TransportKind::Device),
        _ => Err(CliError::validation(
            "Invalid transport. Must be 'log' or 'device'",
        )),
    }
}

const fn transport_name(kind: TransportKind) -> &'static str {
    match kind {
        TransportKind::Log => "log",
        TransportKind::Device => "device",
    }
}
