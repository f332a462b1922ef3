//! Attachment download helpers

use std::path::{Path, PathBuf};

use base64::engine::Engine;

use crate::error::{GmailError, Result};
use crate::mime::URL_SAFE_LENIENT;

/// Resolve a collision-free path for `filename` inside `dir`.
///
/// Existing files are skipped by appending `_1`, `_2`, ... before the
/// extension, re-checking after each attempt until a free path is found.
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let mut path = dir.join(filename);
    let mut counter: u64 = 1;

    while path.exists() {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let candidate = match Path::new(filename).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        path = dir.join(candidate);
        counter += 1;
    }

    path
}

/// Decode an attachment payload and write it into `dir`, returning the path
/// actually used
pub async fn save_attachment(data: &str, dir: &Path, filename: &str) -> Result<PathBuf> {
    let bytes = URL_SAFE_LENIENT
        .decode(data)
        .map_err(|e| GmailError::InvalidFormat(format!("attachment payload: {e}")))?;

    let path = unique_path(dir, filename);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Default directory for downloaded attachments
pub fn default_download_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| GmailError::Config("could not determine home directory".to_string()))?;
    Ok(home.join("Downloads").join("gmail_attachments"))
}
