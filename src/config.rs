//! Locations of persisted credential state
//!
//! All credential state lives under a single per-user directory:
//! the OAuth2 client secret, the cached token, and the scope marker.
//! The directory is created on demand; nothing else is stored there.

use std::path::{Path, PathBuf};

use crate::error::{GmailError, Result};

/// Directory name under the user's home directory
const CREDENTIALS_DIR: &str = ".gmail_credentials";

/// OAuth2 client secret file (downloaded from Google Cloud Console)
const CLIENT_SECRET_FILE: &str = "credentials.json";

/// Cached token bundle
const TOKEN_FILE: &str = "token.json";

/// Persisted scope marker
const SCOPE_FILE: &str = "scope.txt";

/// Resolved paths for persisted credential state
#[derive(Debug, Clone)]
pub struct CredentialPaths {
    dir: PathBuf,
}

impl CredentialPaths {
    /// Resolve the default per-user credentials directory
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| GmailError::Config("could not determine home directory".to_string()))?;
        Ok(Self {
            dir: home.join(CREDENTIALS_DIR),
        })
    }

    /// Use an explicit base directory instead of the per-user default
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn client_secret_file(&self) -> PathBuf {
        self.dir.join(CLIENT_SECRET_FILE)
    }

    pub fn token_file(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    pub fn scope_file(&self) -> PathBuf {
        self.dir.join(SCOPE_FILE)
    }

    /// Create the credentials directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }
}
