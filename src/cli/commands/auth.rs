//! `auth`: issue and check gateway API tokens.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, Permission};
use crate::infrastructure::keystore::{write_token, FileKeystore};
use crate::infrastructure::lotus_repo::expand_tilde;
use crate::services::AuthGate;

/// Arguments of `lotus-adapter auth`.
#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Action to run.
    #[command(subcommand)]
    pub command: AuthCommand,
}

/// Token management actions.
#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign a token carrying the given permission and every weaker one
    CreateToken {
        /// Highest permission to grant (read, write, sign, admin)
        #[arg(long)]
        perm: Permission,

        /// Token lifetime in seconds (no expiry when omitted)
        #[arg(long)]
        expires_in: Option<u64>,
    },
    /// Verify a token and list its permissions
    Verify {
        /// Token to check
        token: String,
    },
}

/// Permissions up to and including `perm`, in the order nodes issue them.
pub fn permissions_up_to(perm: Permission) -> Vec<Permission> {
    Permission::ALL.into_iter().filter(|p| *p <= perm).collect()
}

#[derive(Debug, Serialize)]
struct TokenOutput {
    token: String,
    permissions: Vec<Permission>,
}

impl CommandOutput for TokenOutput {
    fn to_human(&self) -> String {
        self.token.clone()
    }
}

#[derive(Debug, Serialize)]
struct VerifyOutput {
    permissions: Vec<Permission>,
}

impl CommandOutput for VerifyOutput {
    fn to_human(&self) -> String {
        let perms: Vec<&str> = self.permissions.iter().map(|p| p.as_str()).collect();
        format!("Token valid; permissions: {}", perms.join(", "))
    }
}

/// Run an `auth` subcommand against the gateway keystore.
pub async fn execute(args: AuthArgs, config: &Config, json_mode: bool) -> Result<()> {
    let repo = expand_tilde(&config.gateway.repo);
    std::fs::create_dir_all(&repo)?;
    let keystore = FileKeystore::open(&repo)?;
    let (gate, admin_token) = AuthGate::load_or_generate(&keystore)?;
    if let Some(token) = admin_token {
        write_token(&repo, &token)?;
    }

    match args.command {
        AuthCommand::CreateToken { perm, expires_in } => {
            let permissions = permissions_up_to(perm);
            let token = match expires_in {
                Some(0) => bail!("--expires-in must be greater than zero"),
                Some(secs) => gate.sign_with_expiry(&permissions, Duration::from_secs(secs))?,
                None => gate.sign(&permissions)?,
            };
            output(&TokenOutput { token, permissions }, json_mode);
        }
        AuthCommand::Verify { token } => {
            let permissions = gate.verify(token.trim())?;
            output(&VerifyOutput { permissions }, json_mode);
        }
    }
    Ok(())
}
