//! File records and repository for the drive index.

use serde::Serialize;
use sqlx::SqlitePool;

use super::like_pattern;
use crate::error::is_unique_violation;
use crate::{DriveError, Result};

/// An indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Unique file ID.
    pub id: i64,
    /// Owning folder ID.
    pub folder_id: i64,
    /// File name.
    pub name: String,
    /// Extension derived from the name (case preserved, may be empty).
    pub extension: String,
    /// Size in bytes at upload time.
    pub size: i64,
    /// Normalized logical path.
    pub path: String,
    /// When the file was indexed.
    pub created_at: String,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub folder_id: i64,
    pub name: String,
    pub extension: String,
    pub size: i64,
    pub path: String,
}

impl NewFile {
    /// Create a new NewFile. The extension defaults to empty.
    pub fn new(folder_id: i64, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            folder_id,
            name: name.into(),
            extension: String::new(),
            size: 0,
            path: path.into(),
        }
    }

    /// Set the extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the size in bytes.
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }
}

/// Repository for file record operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a file row.
    ///
    /// Fails with `MissingParameter` when the name or path is empty and with
    /// `DuplicatePath` when another file already has the path.
    pub async fn create(&self, file: &NewFile) -> Result<DriveFile> {
        if file.name.is_empty() {
            return Err(DriveError::MissingParameter("name".to_string()));
        }
        if file.path.is_empty() {
            return Err(DriveError::MissingParameter("path".to_string()));
        }

        let result = sqlx::query(
            "INSERT INTO files (folder_id, name, extension, size, path) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(file.folder_id)
        .bind(&file.name)
        .bind(&file.extension)
        .bind(file.size)
        .bind(&file.path)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DriveError::DuplicatePath(file.path.clone())
            } else {
                e.into()
            }
        })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DriveError::FileNotFound(file.path.clone()))
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<DriveFile>> {
        let file = sqlx::query_as::<_, DriveFile>(
            "SELECT id, folder_id, name, extension, size, path, created_at FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// Get a file by its normalized logical path.
    pub async fn get_by_path(&self, path: &str) -> Result<Option<DriveFile>> {
        let file = sqlx::query_as::<_, DriveFile>(
            "SELECT id, folder_id, name, extension, size, path, created_at
             FROM files WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List files in a folder, ordered by name.
    pub async fn list_by_folder(&self, folder_id: i64) -> Result<Vec<DriveFile>> {
        let files = sqlx::query_as::<_, DriveFile>(
            "SELECT id, folder_id, name, extension, size, path, created_at
             FROM files WHERE folder_id = ? ORDER BY name, id",
        )
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Search files whose name contains `term`.
    pub async fn search(&self, term: &str, limit: i64) -> Result<Vec<DriveFile>> {
        let files = sqlx::query_as::<_, DriveFile>(
            r"SELECT id, folder_id, name, extension, size, path, created_at
              FROM files WHERE name LIKE ? ESCAPE '\'
              ORDER BY path LIMIT ?",
        )
        .bind(like_pattern(term))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::folder::{FolderRepository, NewFolder};
    use crate::Database;

    async fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let folders = FolderRepository::new(db.pool());
        let root = folders.get_by_path("/").await.unwrap().unwrap();
        let docs = folders
            .create(&NewFolder::new(root.id, "docs", "/docs"))
            .await
            .unwrap();
        (db, docs.id)
    }

    #[tokio::test]
    async fn test_create_file() {
        let (db, folder_id) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let file = repo
            .create(
                &NewFile::new(folder_id, "a.txt", "/docs/a.txt")
                    .with_extension("txt")
                    .with_size(5),
            )
            .await
            .unwrap();

        assert_eq!(file.folder_id, folder_id);
        assert_eq!(file.name, "a.txt");
        assert_eq!(file.extension, "txt");
        assert_eq!(file.size, 5);
        assert_eq!(file.path, "/docs/a.txt");
        assert!(crate::datetime::parse_sqlite(&file.created_at).is_some());
    }

    #[tokio::test]
    async fn test_create_duplicate_path() {
        let (db, folder_id) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let new_file = NewFile::new(folder_id, "a.txt", "/docs/a.txt");
        repo.create(&new_file).await.unwrap();

        let result = repo.create(&new_file).await;
        assert!(matches!(result, Err(DriveError::DuplicatePath(_))));
    }

    #[tokio::test]
    async fn test_create_missing_parameter() {
        let (db, folder_id) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let result = repo.create(&NewFile::new(folder_id, "", "/docs/")).await;
        assert!(matches!(result, Err(DriveError::MissingParameter(_))));
    }

    #[tokio::test]
    async fn test_create_requires_existing_folder() {
        let (db, _) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let result = repo.create(&NewFile::new(999, "a.txt", "/nowhere/a.txt")).await;
        assert!(matches!(result, Err(DriveError::Storage(_))));
    }

    #[tokio::test]
    async fn test_get_by_path() {
        let (db, folder_id) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let created = repo
            .create(&NewFile::new(folder_id, "b.bin", "/docs/b.bin"))
            .await
            .unwrap();

        assert_eq!(repo.get_by_path("/docs/b.bin").await.unwrap(), Some(created));
        assert!(repo.get_by_path("/docs/c.bin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_folder() {
        let (db, folder_id) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        for name in ["c.txt", "a.txt", "b.txt"] {
            repo.create(&NewFile::new(folder_id, name, format!("/docs/{name}")))
                .await
                .unwrap();
        }

        let names: Vec<String> = repo
            .list_by_folder(folder_id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
        assert!(repo.list_by_folder(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search() {
        let (db, folder_id) = setup_db().await;
        let repo = FileRepository::new(db.pool());

        repo.create(&NewFile::new(folder_id, "report_2024.pdf", "/docs/report_2024.pdf"))
            .await
            .unwrap();
        repo.create(&NewFile::new(folder_id, "reportX2024.pdf", "/docs/reportX2024.pdf"))
            .await
            .unwrap();

        let found = repo.search("report_", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "report_2024.pdf");

        assert_eq!(repo.search("REPORT", 10).await.unwrap().len(), 2);
        assert_eq!(repo.search("report", 1).await.unwrap().len(), 1);
    }
}
