//! File-backed keystore under the gateway repo.
//!
//! Each record is a JSON [`KeyInfo`] at `<repo>/keystore/<name>`, readable by
//! the owner only.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::KeyInfo;
use crate::domain::ports::Keystore;

/// File the generated admin token is written to.
pub const TOKEN_FILE: &str = "token";

const KEYSTORE_DIR: &str = "keystore";

/// [`Keystore`] storing one JSON file per key.
pub struct FileKeystore {
    dir: PathBuf,
}

impl FileKeystore {
    /// Open (creating if needed) the keystore of the repo at `repo`.
    pub fn open(repo: &Path) -> Result<Self> {
        let dir = repo.join(KEYSTORE_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create keystore directory {}", dir.display()))?;
        restrict_permissions(&dir, 0o700)?;
        Ok(Self { dir })
    }

    /// Directory holding the key files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, name: &str) -> DomainResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(DomainError::Keystore(format!("invalid key name {name:?}")));
        }
        Ok(self.dir.join(name))
    }
}

impl Keystore for FileKeystore {
    fn get(&self, name: &str) -> DomainResult<Option<KeyInfo>> {
        let path = self.path_of(name)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let info = serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::Keystore(format!("decoding key {name}: {e}")))?;
        Ok(Some(info))
    }

    fn put(&self, name: &str, info: &KeyInfo) -> DomainResult<()> {
        let path = self.path_of(name)?;
        let bytes = serde_json::to_vec(info)?;
        write_private(&path, &bytes).map_err(|e| DomainError::Keystore(format!("{e:#}")))
    }
}

/// Write the admin token to `<repo>/token` so local tools can pick it up.
pub fn write_token(repo: &Path, token: &str) -> Result<PathBuf> {
    let path = repo.join(TOKEN_FILE);
    write_private(&path, token.as_bytes())?;
    Ok(path)
}

/// Replace `path` with `bytes`, never letting the file be readable by others.
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file =
        create_private(path).with_context(|| format!("Failed to open {}", path.display()))?;
    // A file that already existed keeps its old mode until narrowed here.
    restrict_permissions(path, 0o600)?;
    file.write_all(bytes)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms)
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
