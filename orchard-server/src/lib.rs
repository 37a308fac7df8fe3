//! Library entrypoint for orchard-server so tests and other binaries can
//! build the router without going through the CLI.

pub mod auth;
pub mod cli;
pub mod config;
pub mod server;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Cli, Command, TokenArgs},
    config::ServerConfig,
};

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Run orchard using CLI args (parsed by the caller).
pub async fn run_with_cli(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose)?;

    match cli.command {
        Command::Serve(args) => {
            let cfg = ServerConfig::from_args(&args)?;
            server::serve(cfg).await
        }
        Command::Token(args) => print_token(&args),
    }
}

fn print_token(args: &TokenArgs) -> Result<()> {
    let token = auth::create_token(
        args.auth_secret.as_bytes(),
        &args.sub,
        args.expires_in,
        args.audience.as_deref(),
    )
    .context("failed to mint token")?;
    println!("{token}");
    Ok(())
}
