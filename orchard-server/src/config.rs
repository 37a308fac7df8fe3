use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::auth::AuthConfig;
use crate::cli::ServeArgs;

/// Runtime configuration derived from CLI/env.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Absolute path of the JSON item file, if items are persisted
    pub data_file: Option<PathBuf>,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_args(args: &ServeArgs) -> Result<Self> {
        let data_file = match &args.data_file {
            Some(path) if path.is_relative() => Some(
                std::env::current_dir()
                    .context("failed to read current directory")?
                    .join(path),
            ),
            other => other.clone(),
        };

        let auth = AuthConfig {
            secret: args.auth.auth_secret.clone(),
            expected_aud: args.auth.auth_audience.clone(),
            leeway_secs: args.auth.auth_leeway,
        };

        Ok(Self {
            listen_addr: args.listen_addr.clone(),
            data_file,
            auth,
        })
    }
}
