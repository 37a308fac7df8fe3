//! orchard: owner-checked item service.
//!
//! Serves a small item collection over HTTP. Anyone may list items; only the
//! subject who created an item may update or delete it.

use anyhow::Result;
use clap::Parser;

use orchard_server::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    orchard_server::run_with_cli(cli).await
}
