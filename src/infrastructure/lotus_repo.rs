//! Endpoint discovery from Lotus repo directories.
//!
//! A running node writes its API multiaddr to `<repo>/api` and an admin
//! token to `<repo>/token`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::domain::models::UpstreamConfig;

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

/// Convert an API multiaddr such as `/ip4/127.0.0.1/tcp/1234/http` into the
/// node's JSON-RPC URL.
pub fn multiaddr_to_url(maddr: &str) -> Result<String> {
    let parts: Vec<&str> = maddr.trim().split('/').skip(1).collect();
    let [proto, host, "tcp", port, rest @ ..] = parts.as_slice() else {
        bail!("unsupported API multiaddr {maddr:?}");
    };

    let host = match *proto {
        "ip4" | "dns" | "dns4" | "dns6" => (*host).to_string(),
        "ip6" => format!("[{host}]"),
        other => bail!("unsupported address protocol {other:?} in {maddr:?}"),
    };
    let port: u16 = port
        .parse()
        .with_context(|| format!("invalid tcp port in {maddr:?}"))?;
    let scheme = match rest {
        [] | ["http"] | ["ws"] => "http",
        ["https"] | ["wss"] => "https",
        _ => bail!("unsupported transport in {maddr:?}"),
    };

    Ok(format!("{scheme}://{host}:{port}/rpc/v0"))
}

/// Resolve the RPC URL and token of an upstream.
///
/// An explicit `url` wins. Otherwise both come from the repo directory; a
/// configured `token` still overrides the repo's token file.
pub fn resolve_endpoint(config: &UpstreamConfig) -> Result<(String, Option<String>)> {
    if !config.url.trim().is_empty() {
        return Ok((config.url.clone(), config.token.clone()));
    }

    let repo = config
        .repo
        .as_deref()
        .map(expand_tilde)
        .ok_or_else(|| anyhow!("upstream has neither url nor repo configured"))?;

    let api_path = repo.join("api");
    let maddr = fs::read_to_string(&api_path).with_context(|| {
        format!(
            "Failed to read {} (is the node running?)",
            api_path.display()
        )
    })?;
    let url = multiaddr_to_url(&maddr)?;

    let token = match &config.token {
        Some(token) => Some(token.clone()),
        None => read_token(&repo.join("token"))?,
    };

    tracing::debug!(repo = %repo.display(), %url, "resolved upstream from repo");
    Ok((url, token))
}

fn read_token(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(token) => Ok(Some(token.trim().to_string())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
    }
}
