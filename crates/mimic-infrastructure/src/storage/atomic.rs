//! Atomic file replacement: write to a sibling temp file, fsync, rename.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Temporary sibling path used while `path` is being written.
pub fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent directory"))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no file name"))?;

    Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
}

/// Replaces `path` with `bytes`; readers see either the old or the new file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_path(path)?;
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(bytes)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)
}

/// Async counterpart of [`write_atomic`].
pub async fn write_atomic_async(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = temp_path(path)?;
    let mut tmp_file = tokio::fs::File::create(&tmp_path).await?;
    tmp_file.write_all(bytes).await?;
    tmp_file.sync_all().await?;
    drop(tmp_file);

    tokio::fs::rename(&tmp_path, path).await
}
