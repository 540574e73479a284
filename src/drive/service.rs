//! Drive service for HDrive.
//!
//! `DriveService` is the only component that writes to both the index and
//! the physical tree. Each mutating operation applies its two effects in a
//! fixed order and compensates when the second one fails:
//! - createFolder: index row first, then the directory; a failed directory
//!   creation deletes the row again.
//! - uploadFile: bytes first, then the index row; a failed insert deletes
//!   the bytes again.
//!
//! When the compensation itself fails the index and the filesystem disagree
//! and the operation fails with `MirrorDivergence`, logged at error level.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::file::{DriveFile, FileRepository, NewFile};
use super::folder::{Folder, FolderRepository, NewFolder};
use super::mirror::FilesystemMirror;
use super::path::{self, PathResolver};
use super::share::{ShareLinkIssuer, SharedLinkRepository};
use super::{is_text_extension, SEARCH_LIMIT};
use crate::activity::ActivityLogger;
use crate::config::DriveConfig;
use crate::datetime::to_rfc3339;
use crate::db::Database;
use crate::{DriveError, Result};

/// An uploaded file payload as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied file name; only its basename is used.
    pub file_name: String,
    /// File content.
    pub content: Vec<u8>,
}

impl Upload {
    /// Create a new upload payload.
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DriveItem {
    Folder {
        id: i64,
        name: String,
        path: String,
    },
    File {
        id: i64,
        name: String,
        extension: String,
        size: i64,
        path: String,
        url: String,
    },
}

impl DriveItem {
    /// Item name.
    pub fn name(&self) -> &str {
        match self {
            DriveItem::Folder { name, .. } | DriveItem::File { name, .. } => name,
        }
    }

    /// Item logical path.
    pub fn path(&self) -> &str {
        match self {
            DriveItem::Folder { path, .. } | DriveItem::File { path, .. } => path,
        }
    }
}

/// Result of listFolder.
#[derive(Debug, Clone, Serialize)]
pub struct FolderListing {
    /// Logical path of the listed folder.
    pub folder: String,
    /// Child folders followed by files.
    pub items: Vec<DriveItem>,
}

/// Result of fileInfo.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub id: i64,
    pub name: String,
    pub extension: String,
    pub size: i64,
    pub path: String,
    pub created_at: String,
    /// Physical modification time.
    pub last_modified_at: String,
    pub url: String,
    /// Inline text content, only for text extensions.
    pub content: Option<String>,
}

/// Result of createFolder.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedFolder {
    pub success: bool,
    pub path: String,
}

/// Result of uploadFile.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub success: bool,
    pub filename: String,
}

/// Result of generateSharedLink.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLinkResult {
    pub url: String,
    /// RFC3339 expiry, None when the link never expires.
    pub expires_at: Option<String>,
}

/// Result of a name search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub items: Vec<DriveItem>,
}

/// Comparison of one folder's index entries with its physical directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorReport {
    pub folder: String,
    /// Whether the folder's physical directory exists.
    pub directory_present: bool,
    /// Indexed children with no matching physical entry.
    pub missing_on_disk: Vec<String>,
    /// Physical entries with no index record.
    pub untracked: Vec<String>,
}

impl MirrorReport {
    /// Whether index and disk agree for this folder.
    pub fn is_consistent(&self) -> bool {
        self.directory_present && self.missing_on_disk.is_empty() && self.untracked.is_empty()
    }
}

/// File bytes ready to be served.
#[derive(Debug, Clone)]
pub struct Download {
    pub file: DriveFile,
    pub content: Vec<u8>,
}

/// Drive operations over the index and the physical tree.
#[derive(Debug, Clone)]
pub struct DriveService {
    db: Database,
    resolver: PathResolver,
    mirror: FilesystemMirror,
    issuer: ShareLinkIssuer,
    activity: ActivityLogger,
    base_url: String,
    download_prefix: String,
}

impl DriveService {
    /// Create a new DriveService.
    pub fn new(
        db: Database,
        resolver: PathResolver,
        base_url: impl Into<String>,
        download_prefix: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let download_prefix = download_prefix.into().trim_matches('/').to_string();
        let activity = ActivityLogger::new(db.pool().clone());

        Self {
            issuer: ShareLinkIssuer::new(base_url.clone()),
            mirror: FilesystemMirror::new(),
            db,
            resolver,
            activity,
            base_url,
            download_prefix,
        }
    }

    /// Create a service from configuration, creating the drive root if missing.
    pub async fn from_config(db: Database, config: &DriveConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.root).await?;
        let resolver = PathResolver::new(&config.root)?;
        info!(root = %resolver.root().display(), "Drive root ready");

        Ok(Self::new(
            db,
            resolver,
            config.base_url.clone(),
            config.download_prefix.clone(),
        ))
    }

    /// The database backing the index.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The path resolver.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// URL segment under which files are downloaded, without slashes.
    pub fn download_prefix(&self) -> &str {
        &self.download_prefix
    }

    /// Download URL for a logical file path.
    pub fn download_url(&self, logical: &str) -> String {
        let encoded: Vec<String> = logical
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();

        format!(
            "{}/{}/{}",
            self.base_url,
            self.download_prefix,
            encoded.join("/")
        )
    }

    /// List a folder's child folders and files.
    pub async fn list_folder(&self, raw_path: &str) -> Result<FolderListing> {
        let logical = path::normalize(raw_path);
        let folder = self.folder_at(&logical).await?;
        self.resolver.resolve_physical(&folder.path)?;

        let folders = FolderRepository::new(self.db.pool())
            .list_by_parent(folder.id)
            .await?;
        let files = FileRepository::new(self.db.pool())
            .list_by_folder(folder.id)
            .await?;

        let items = folders
            .into_iter()
            .map(Self::folder_item)
            .chain(files.into_iter().map(|f| self.file_item(f)))
            .collect();

        debug!(folder = %folder.path, "Listed folder");
        self.activity.log("list_folder", &folder.path).await;

        Ok(FolderListing {
            folder: folder.path,
            items,
        })
    }

    /// Describe one file, with inline content for text extensions.
    pub async fn file_info(&self, raw_path: &str) -> Result<FileInfo> {
        let logical = path::normalize(raw_path);
        let file = self.file_at(&logical).await?;
        let physical = self.resolver.resolve_physical(&file.path)?;

        let stat = self
            .mirror
            .stat_file(&physical)
            .await
            .map_err(|e| self.missing_file(e, &file.path))?;

        let content = if is_text_extension(&file.extension) {
            Some(
                self.mirror
                    .read_text_content(&physical)
                    .await
                    .map_err(|e| self.missing_file(e, &file.path))?,
            )
        } else {
            None
        };

        self.activity.log("file_info", &file.path).await;

        Ok(FileInfo {
            url: self.download_url(&file.path),
            created_at: to_rfc3339(&file.created_at),
            last_modified_at: stat
                .modified
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            id: file.id,
            name: file.name,
            extension: file.extension,
            size: file.size,
            path: file.path,
            content,
        })
    }

    /// Create a folder under `parent` (index first, then the directory).
    pub async fn create_folder(&self, name: &str, parent: &str) -> Result<CreatedFolder> {
        let name = path::validate_name(name)?;
        let parent_path = path::normalize(parent);

        let folders = FolderRepository::new(self.db.pool());
        let parent = folders
            .get_by_path(&parent_path)
            .await?
            .ok_or_else(|| DriveError::ParentNotFound(parent_path.clone()))?;

        let logical = path::child_path(&parent.path, &name);
        let physical = self.resolver.resolve_physical(&logical)?;

        let folder = folders
            .create(&NewFolder::new(parent.id, &name, &logical))
            .await?;

        if let Err(e) = self.mirror.create_directory(&physical).await {
            warn!(path = %logical, error = %e, "Physical folder creation failed, rolling back");

            return match folders.delete(folder.id).await {
                Ok(true) => Err(DriveError::PhysicalCreateFailed(logical)),
                Ok(false) | Err(_) => Err(self.divergence(
                    &logical,
                    "folder is indexed but has no physical directory",
                )),
            };
        }

        info!(path = %logical, "Folder created");
        self.activity.log("create_folder", &logical).await;

        Ok(CreatedFolder {
            success: true,
            path: logical,
        })
    }

    /// Store an uploaded file in a folder (bytes first, then the index row).
    ///
    /// Existing files are never overwritten: an index record or physical
    /// entry at the destination fails with `DuplicatePath` before any write.
    pub async fn upload_file(&self, raw_path: &str, upload: Option<Upload>) -> Result<UploadedFile> {
        let upload = upload.ok_or(DriveError::NoFileProvided)?;

        let folder_path = path::normalize(raw_path);
        let folder = self.folder_at(&folder_path).await?;

        let filename = path::sanitize_file_name(&upload.file_name)?;
        let extension = path::extension_of(&filename).to_string();
        let logical = path::child_path(&folder.path, &filename);
        let physical = self.resolver.resolve_physical(&logical)?;

        self.ensure_vacant(&logical, &physical).await?;

        let size = self
            .mirror
            .store_uploaded_bytes(&upload.content, &physical)
            .await?;

        let new_file = NewFile::new(folder.id, &filename, &logical)
            .with_extension(extension)
            .with_size(i64::try_from(size).unwrap_or(i64::MAX));

        if let Err(e) = FileRepository::new(self.db.pool()).create(&new_file).await {
            warn!(path = %logical, error = %e, "Index insert failed, removing stored bytes");

            if self.mirror.remove_file(&physical).await.is_err() {
                return Err(self.divergence(&logical, "file is on disk but not indexed"));
            }
            return Err(e);
        }

        info!(path = %logical, size = size, "File uploaded");
        self.activity.log("upload_file", &logical).await;

        Ok(UploadedFile {
            success: true,
            filename,
        })
    }

    /// Issue a shared link for a file.
    ///
    /// `expires_in_minutes` of None or 0 yields a link that never expires.
    pub async fn generate_shared_link(
        &self,
        raw_path: &str,
        expires_in_minutes: Option<u32>,
    ) -> Result<SharedLinkResult> {
        let logical = path::normalize(raw_path);
        let file = self.file_at(&logical).await?;

        let link = self
            .issuer
            .issue(self.db.pool(), file.id, expires_in_minutes)
            .await?;

        self.activity.log("share_file", &file.path).await;

        Ok(SharedLinkResult {
            url: self.issuer.share_url(&link.token),
            expires_at: link.expires_at.as_deref().map(to_rfc3339),
        })
    }

    /// Resolve a shared link token to the file it grants access to.
    ///
    /// Unknown and expired tokens are both reported as not found.
    pub async fn resolve_shared_link(&self, token: &str) -> Result<Download> {
        let link = SharedLinkRepository::new(self.db.pool())
            .get_valid_by_token(token)
            .await?
            .ok_or_else(|| DriveError::NotFound("shared link".to_string()))?;

        let file = FileRepository::new(self.db.pool())
            .get_by_id(link.file_id)
            .await?
            .ok_or_else(|| DriveError::NotFound("shared link".to_string()))?;

        self.read_file(file).await
    }

    /// Read a file's bytes for download.
    pub async fn open_download(&self, raw_path: &str) -> Result<Download> {
        let logical = path::normalize(raw_path);
        let file = self.file_at(&logical).await?;
        self.read_file(file).await
    }

    /// Find folders and files whose name contains `term`.
    pub async fn search(&self, term: &str) -> Result<SearchResults> {
        let term = term.trim();
        if term.is_empty() {
            return Err(DriveError::MissingParameter("q".to_string()));
        }

        let folders = FolderRepository::new(self.db.pool())
            .search(term, SEARCH_LIMIT)
            .await?;
        let files = FileRepository::new(self.db.pool())
            .search(term, SEARCH_LIMIT)
            .await?;

        let items = folders
            .into_iter()
            .map(Self::folder_item)
            .chain(files.into_iter().map(|f| self.file_item(f)))
            .collect();

        Ok(SearchResults {
            query: term.to_string(),
            items,
        })
    }

    /// Compare a folder's index entries with its physical directory.
    ///
    /// Detection only; nothing is repaired.
    pub async fn verify_folder(&self, raw_path: &str) -> Result<MirrorReport> {
        let logical = path::normalize(raw_path);
        let folder = self.folder_at(&logical).await?;
        let physical = self.resolver.resolve_physical(&folder.path)?;

        let (directory_present, entries) = match self.mirror.list_entries(&physical).await {
            Ok(entries) => (true, entries),
            Err(DriveError::NotFound(_)) => (false, Vec::new()),
            Err(e) => return Err(e),
        };

        let child_folders = FolderRepository::new(self.db.pool())
            .list_by_parent(folder.id)
            .await?;
        let child_files = FileRepository::new(self.db.pool())
            .list_by_folder(folder.id)
            .await?;

        let on_disk: HashSet<(&str, bool)> = entries
            .iter()
            .map(|e| (e.name.as_str(), e.is_directory))
            .collect();
        let indexed: HashSet<(&str, bool)> = child_folders
            .iter()
            .map(|f| (f.name.as_str(), true))
            .chain(child_files.iter().map(|f| (f.name.as_str(), false)))
            .collect();

        let mut missing_on_disk: Vec<String> = indexed
            .difference(&on_disk)
            .map(|(name, _)| path::child_path(&folder.path, name))
            .collect();
        let mut untracked: Vec<String> = on_disk
            .difference(&indexed)
            .map(|(name, _)| path::child_path(&folder.path, name))
            .collect();
        missing_on_disk.sort();
        untracked.sort();

        let report = MirrorReport {
            folder: folder.path,
            directory_present,
            missing_on_disk,
            untracked,
        };

        if !report.is_consistent() {
            warn!(
                folder = %report.folder,
                missing = report.missing_on_disk.len(),
                untracked = report.untracked.len(),
                "Folder index and disk disagree"
            );
        }

        Ok(report)
    }

    async fn folder_at(&self, logical: &str) -> Result<Folder> {
        FolderRepository::new(self.db.pool())
            .get_by_path(logical)
            .await?
            .ok_or_else(|| DriveError::FolderNotFound(logical.to_string()))
    }

    async fn file_at(&self, logical: &str) -> Result<DriveFile> {
        FileRepository::new(self.db.pool())
            .get_by_path(logical)
            .await?
            .ok_or_else(|| DriveError::FileNotFound(logical.to_string()))
    }

    async fn read_file(&self, file: DriveFile) -> Result<Download> {
        let physical = self.resolver.resolve_physical(&file.path)?;
        let content = self
            .mirror
            .read_bytes(&physical)
            .await
            .map_err(|e| self.missing_file(e, &file.path))?;

        Ok(Download { file, content })
    }

    /// Fail with `DuplicatePath` if anything occupies the destination.
    async fn ensure_vacant(&self, logical: &str, physical: &Path) -> Result<()> {
        let taken = FileRepository::new(self.db.pool())
            .get_by_path(logical)
            .await?
            .is_some()
            || FolderRepository::new(self.db.pool())
                .get_by_path(logical)
                .await?
                .is_some()
            || self.mirror.exists(physical).await?;

        if taken {
            return Err(DriveError::DuplicatePath(logical.to_string()));
        }
        Ok(())
    }

    /// An indexed file whose bytes are gone is reported as FileNotFound.
    fn missing_file(&self, e: DriveError, logical: &str) -> DriveError {
        match e {
            DriveError::NotFound(_) => {
                warn!(path = logical, "Indexed file is missing on disk");
                DriveError::FileNotFound(logical.to_string())
            }
            other => other,
        }
    }

    fn divergence(&self, logical: &str, detail: &str) -> DriveError {
        error!(path = logical, detail = detail, "Index and filesystem diverged");
        DriveError::MirrorDivergence(format!("{logical}: {detail}"))
    }

    fn folder_item(folder: Folder) -> DriveItem {
        DriveItem::Folder {
            id: folder.id,
            name: folder.name,
            path: folder.path,
        }
    }

    fn file_item(&self, file: DriveFile) -> DriveItem {
        DriveItem::File {
            url: self.download_url(&file.path),
            id: file.id,
            name: file.name,
            extension: file.extension,
            size: file.size,
            path: file.path,
        }
    }
}
