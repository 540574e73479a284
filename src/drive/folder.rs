//! Folder records and repository for the drive index.

use serde::Serialize;
use sqlx::SqlitePool;

use super::like_pattern;
use crate::error::is_unique_violation;
use crate::{DriveError, Result};

/// A folder in the drive index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Parent folder ID (None only for the root).
    pub parent_id: Option<i64>,
    /// Folder name (empty for the root).
    pub name: String,
    /// Normalized logical path.
    pub path: String,
    /// When the folder was indexed.
    pub created_at: String,
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Parent folder ID.
    pub parent_id: i64,
    /// Folder name.
    pub name: String,
    /// Logical path (parent path + name).
    pub path: String,
}

impl NewFolder {
    /// Create a new NewFolder.
    pub fn new(parent_id: i64, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            parent_id,
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a folder row.
    ///
    /// Fails with `MissingParameter` when the name or path is empty and with
    /// `DuplicatePath` when another folder already has the path.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        if folder.name.is_empty() {
            return Err(DriveError::MissingParameter("name".to_string()));
        }
        if folder.path.is_empty() {
            return Err(DriveError::MissingParameter("path".to_string()));
        }

        let result = sqlx::query("INSERT INTO folders (parent_id, name, path) VALUES (?, ?, ?)")
            .bind(folder.parent_id)
            .bind(&folder.name)
            .bind(&folder.path)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DriveError::DuplicatePath(folder.path.clone())
                } else {
                    e.into()
                }
            })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DriveError::FolderNotFound(folder.path.clone()))
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, parent_id, name, path, created_at FROM folders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// Get a folder by its normalized logical path.
    pub async fn get_by_path(&self, path: &str) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, parent_id, name, path, created_at FROM folders WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// List child folders of a parent folder, ordered by name.
    pub async fn list_by_parent(&self, parent_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT id, parent_id, name, path, created_at
             FROM folders WHERE parent_id = ? ORDER BY name, id",
        )
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// Search folders whose name contains `term`.
    ///
    /// The term is bound as a parameter; `%` and `_` in it match literally.
    pub async fn search(&self, term: &str, limit: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            r"SELECT id, parent_id, name, path, created_at
              FROM folders WHERE parent_id IS NOT NULL AND name LIKE ? ESCAPE '\'
              ORDER BY path LIMIT ?",
        )
        .bind(like_pattern(term))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// Delete a folder by ID.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
