//! Web server command.

use std::net::SocketAddr;

use clap::Args;

use crate::cli::common::{CliContext, CliError, CliResult};
use crate::web;

/// Serve the HTTP API
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (defaults to the configured port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (defaults to the configured host)
    #[arg(long)]
    pub host: Option<String>,
}

impl ServeArgs {
    /// Execute the serve command
    pub async fn execute(&self, ctx: &CliContext) -> CliResult<()> {
        let config = ctx.load_config()?;
        let host = self.host.as_deref().unwrap_or(&config.server.host);
        let port = self.port.unwrap_or(config.server.port);

        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| CliError::validation(format!("Invalid address {host}:{port}: {e}")))?;

        web::run_server(config, addr)
            .await
            .map_err(|e| CliError::io(format!("Server failed: {e:#}")))
    }
}
