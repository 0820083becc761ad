//! Plaintext password lookup from an authorization directory.
//!
//! A password for `user` on `database` at `server` lives in
//! `<auth_dir>/<server>-<database>-<user>`. The `sqsh` client can instead be
//! pointed at a runtime-config file named `<auth_dir>/sqsh-<server>-<database>-<user>`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::error::{DbiError, Result};

/// The identifiers a credential is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialKey<'a> {
    pub server: &'a str,
    pub database: &'a str,
    pub user: &'a str,
}

impl<'a> CredentialKey<'a> {
    pub fn new(server: &'a str, database: &'a str, user: &'a str) -> Self {
        Self {
            server,
            database,
            user,
        }
    }

    pub fn password_file(&self, auth_dir: &Path) -> PathBuf {
        auth_dir.join(format!("{}-{}-{}", self.server, self.database, self.user))
    }

    pub fn sqshrc_file(&self, auth_dir: &Path) -> PathBuf {
        auth_dir.join(format!("sqsh-{}-{}-{}", self.server, self.database, self.user))
    }
}

/// A password read from disk, with the file it came from.
#[derive(Debug)]
pub struct ResolvedPassword {
    pub secret: SecretString,
    pub path: PathBuf,
}

/// Look up the password file for `key`.
///
/// Returns `Ok(None)` when the file does not exist and an error when it exists
/// but cannot be read.
pub fn resolve(auth_dir: &Path, key: &CredentialKey<'_>) -> Result<Option<ResolvedPassword>> {
    let path = key.password_file(auth_dir);
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(ResolvedPassword {
            secret: SecretString::from(contents.trim().to_string()),
            path,
        })),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(DbiError::CredentialUnreadable { path, source }),
    }
}

/// Like [`resolve`], but a missing or unreadable file is a [`DbiError::NoPassword`].
pub fn resolve_required(auth_dir: &Path, key: &CredentialKey<'_>) -> Result<ResolvedPassword> {
    match resolve(auth_dir, key) {
        Ok(Some(found)) => Ok(found),
        Ok(None) => Err(DbiError::NoPassword(format!(
            "password file {} does not exist",
            key.password_file(auth_dir).display()
        ))),
        Err(e) => Err(DbiError::NoPassword(e.to_string())),
    }
}

/// Like [`resolve`], but any failure means "no password". Unreadable files are
/// logged so they are not mistaken for missing ones.
pub fn resolve_opportunistic(auth_dir: &Path, key: &CredentialKey<'_>) -> Option<ResolvedPassword> {
    match resolve(auth_dir, key) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable password file");
            None
        }
    }
}
