//! Database module for HDrive.
//!
//! This module provides the SQLite connection pool that backs the drive index
//! and applies schema migrations when the database is opened.

mod schema;

pub use schema::MIGRATIONS;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::Result;

/// Database wrapper owning the shared SQLite pool.
///
/// Cloning is cheap and every clone shares the same pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a database at the specified path.
    ///
    /// If the database file doesn't exist, it will be created.
    /// Migrations are automatically applied.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Open an in-memory database for testing.
    ///
    /// The pool holds a single connection, since every SQLite in-memory
    /// connection is a separate database.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }

        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;

        Ok(version)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        if current_version as usize >= MIGRATIONS.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            MIGRATIONS.len()
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     INTEGER PRIMARY KEY,
                applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            debug!("Migration v{} applied successfully", version);
        }

        info!(
            "Database migration complete (now at version {})",
            MIGRATIONS.len()
        );
        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap() as usize, MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_drive_tables_exist() {
        let db = Database::open_in_memory().await.unwrap();

        for table in ["folders", "files", "shared_links", "activity_log", "schema_version"] {
            assert!(db.table_exists(table).await.unwrap(), "missing table {table}");
        }
        assert!(!db.table_exists("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_root_folder_seeded() {
        let db = Database::open_in_memory().await.unwrap();

        let (path, parent_id): (String, Option<i64>) =
            sqlx::query_as("SELECT path, parent_id FROM folders WHERE path = '/'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(path, "/");
        assert!(parent_id.is_none());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().await.unwrap();

        let fk_enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[tokio::test]
    async fn test_folder_path_is_unique() {
        let db = Database::open_in_memory().await.unwrap();

        let result = sqlx::query("INSERT INTO folders (parent_id, name, path) VALUES (NULL, '', '/')")
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_file_path_is_unique() {
        let db = Database::open_in_memory().await.unwrap();
        let insert = "INSERT INTO files (folder_id, name, size, path) VALUES (1, 'a.txt', 1, '/a.txt')";

        sqlx::query(insert).execute(db.pool()).await.unwrap();
        let result = sqlx::query(insert).execute(db.pool()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_shared_link_token_is_unique() {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO files (folder_id, name, size, path) VALUES (1, 'a.txt', 1, '/a.txt')")
            .execute(db.pool())
            .await
            .unwrap();
        let insert = "INSERT INTO shared_links (file_id, token) VALUES (1, 'same')";

        sqlx::query(insert).execute(db.pool()).await.unwrap();
        let result = sqlx::query(insert).execute(db.pool()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_file_requires_existing_folder() {
        let db = Database::open_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO files (folder_id, name, size, path) VALUES (999, 'a.txt', 1, '/x/a.txt')",
        )
        .execute(db.pool())
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("index.db");

        {
            let db = Database::open(&db_path).await.unwrap();
            assert!(db.table_exists("folders").await.unwrap());
            db.pool().close().await;
        }

        // Reopening must not reapply migrations
        let db = Database::open(&db_path).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap() as usize, MIGRATIONS.len());
    }
}
