//! Physical storage under the drive root.
//!
//! `FilesystemMirror` owns byte content and physical existence. It operates
//! on physical paths that have already passed the containment check in
//! [`PathResolver`](super::PathResolver); it never builds paths from user
//! input itself.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{DriveError, Result};

/// One entry of a physical directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorEntry {
    pub name: String,
    pub is_directory: bool,
}

/// Physical file metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Length in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

/// Map an I/O error, turning `NotFound` into a domain `NotFound`.
fn not_found_or_io(e: io::Error, what: &str) -> DriveError {
    if e.kind() == io::ErrorKind::NotFound {
        DriveError::NotFound(what.to_string())
    } else {
        DriveError::Io(e)
    }
}

/// Async filesystem operations on the physical drive.
#[derive(Debug, Clone, Default)]
pub struct FilesystemMirror {
    #[cfg(test)]
    fail_removals: bool,
}

impl FilesystemMirror {
    /// Create a new FilesystemMirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mirror whose removals always fail with `PermissionDenied`.
    #[cfg(test)]
    pub(crate) fn failing_removals() -> Self {
        Self {
            fail_removals: true,
        }
    }

    /// List the entries of a directory, sorted by name.
    pub async fn list_entries(&self, dir: &Path) -> Result<Vec<MirrorEntry>> {
        let mut read_dir = fs::read_dir(dir)
            .await
            .map_err(|e| not_found_or_io(e, "directory"))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let is_directory = entry.file_type().await?.is_dir();
            entries.push(MirrorEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Create a directory and any missing parents.
    ///
    /// Fails with an I/O error if a non-directory entry is in the way.
    pub async fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await?;
        debug!(path = %path.display(), "Created directory");
        Ok(())
    }

    /// Whether anything exists at the path (symlinks are not followed).
    pub async fn exists(&self, path: &Path) -> Result<bool> {
        match fs::symlink_metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write uploaded bytes to `dest` and return the stored length.
    ///
    /// The content goes to a hidden temporary file in the destination
    /// directory first and is renamed into place, so `dest` never holds a
    /// partial file. The temporary file is removed on failure.
    pub async fn store_uploaded_bytes(&self, content: &[u8], dest: &Path) -> Result<u64> {
        let parent = dest
            .parent()
            .ok_or_else(|| DriveError::NotFound("destination directory".to_string()))?;
        let temp = parent.join(format!(".upload-{}.tmp", Uuid::new_v4()));

        if let Err(e) = write_all(&temp, content).await {
            discard_temp(&temp).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp, dest).await {
            discard_temp(&temp).await;
            return Err(e.into());
        }

        debug!(path = %dest.display(), bytes = content.len(), "Stored uploaded file");
        Ok(content.len() as u64)
    }

    /// Stat a regular file.
    pub async fn stat_file(&self, path: &Path) -> Result<FileStat> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| not_found_or_io(e, "file"))?;

        if !meta.is_file() {
            return Err(DriveError::NotFound("file".to_string()));
        }

        let modified = meta.modified().map(DateTime::<Utc>::from)?;
        Ok(FileStat {
            size: meta.len(),
            modified,
        })
    }

    /// Read a file as UTF-8 text. Invalid sequences are replaced.
    pub async fn read_text_content(&self, path: &Path) -> Result<String> {
        let bytes = self.read_bytes(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a file's bytes.
    pub async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).await.map_err(|e| not_found_or_io(e, "file"))
    }

    /// Remove a file.
    pub async fn remove_file(&self, path: &Path) -> Result<()> {
        #[cfg(test)]
        if self.fail_removals {
            return Err(DriveError::Io(io::Error::from(io::ErrorKind::PermissionDenied)));
        }

        fs::remove_file(path)
            .await
            .map_err(|e| not_found_or_io(e, "file"))
    }
}

async fn write_all(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    Ok(())
}

async fn discard_temp(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %temp.display(), error = %e, "Failed to remove temporary upload");
        }
    }
}
