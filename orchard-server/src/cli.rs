use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI for the orchard item service.
#[derive(Debug, Clone, Parser)]
#[command(name = "orchard", version, about = "Owner-checked item service")]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Mint a bearer token for a subject (for local testing)
    Token(TokenArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Listen address for HTTP endpoints
    #[arg(long, env = "ORCHARD_ADDR", default_value = "127.0.0.1:3000")]
    pub listen_addr: String,

    /// JSON file to persist items in. Items are kept in memory when unset.
    #[arg(long, env = "ORCHARD_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    #[command(flatten)]
    pub auth: AuthArgs,
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth options
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Args)]
pub struct AuthArgs {
    /// Secret for verifying bearer tokens (HS256).
    /// If not set, every mutation is rejected as unauthenticated.
    #[arg(long, env = "ORCHARD_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,

    /// Expected JWT audience claim (optional).
    #[arg(long, env = "ORCHARD_AUTH_AUDIENCE")]
    pub auth_audience: Option<String>,

    /// Clock skew tolerance for token expiry, in seconds.
    #[arg(long, env = "ORCHARD_AUTH_LEEWAY", default_value = "60")]
    pub auth_leeway: u64,
}

#[derive(Debug, Clone, Args)]
pub struct TokenArgs {
    /// Subject id to embed in the token
    #[arg(long)]
    pub sub: String,

    /// Token lifetime in seconds
    #[arg(long, default_value = "3600")]
    pub expires_in: u64,

    /// Audience claim to embed (optional)
    #[arg(long)]
    pub audience: Option<String>,

    /// Signing secret, same as the server's
    #[arg(long, env = "ORCHARD_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["orchard", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.listen_addr, "127.0.0.1:3000");
        assert_eq!(args.auth.auth_leeway, 60);
    }

    #[test]
    fn test_token_args() {
        let cli = Cli::try_parse_from([
            "orchard",
            "-v",
            "token",
            "--sub",
            "u1",
            "--auth-secret",
            "s3cret",
            "--expires-in",
            "60",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Token(args) = cli.command else {
            panic!("expected token");
        };
        assert_eq!(args.sub, "u1");
        assert_eq!(args.expires_in, 60);
        assert_eq!(args.auth_secret, "s3cret");
    }
}
