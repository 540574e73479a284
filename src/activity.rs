//! Audit trail of drive operations.
//!
//! Every successful drive operation records an `(action, target)` event.
//! Recording is best effort: a failed insert is logged and never fails the
//! operation that triggered it.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::Result;

/// A recorded activity event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub target: String,
    pub timestamp: String,
}

/// Repository for activity_log rows.
pub struct ActivityRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ActivityRepository<'a> {
    /// Create a new ActivityRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an event.
    pub async fn insert(&self, user_id: Option<i64>, action: &str, target: &str) -> Result<i64> {
        let result =
            sqlx::query("INSERT INTO activity_log (user_id, action, target) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(action)
                .bind(target)
                .execute(self.pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent events first.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<ActivityEntry>> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            "SELECT id, user_id, action, target, timestamp
             FROM activity_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }
}

/// Fire-and-forget audit logger shared by the drive service.
#[derive(Debug, Clone)]
pub struct ActivityLogger {
    pool: SqlitePool,
}

impl ActivityLogger {
    /// Create a logger recording anonymous events.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an event. Failures are logged and swallowed.
    pub async fn log(&self, action: &str, target: &str) {
        if let Err(e) = ActivityRepository::new(&self.pool)
            .insert(None, action, target)
            .await
        {
            warn!(action = action, target = target, error = %e, "Failed to record activity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_log_and_list_recent() {
        let db = Database::open_in_memory().await.unwrap();
        let logger = ActivityLogger::new(db.pool().clone());

        logger.log("list_folder", "/").await;
        logger.log("file_info", "/a.txt").await;

        let entries = ActivityRepository::new(db.pool()).list_recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "file_info");
        assert_eq!(entries[0].target, "/a.txt");
        assert_eq!(entries[1].action, "list_folder");
        assert!(entries[1].user_id.is_none());
    }

    #[tokio::test]
    async fn test_insert_with_user() {
        let db = Database::open_in_memory().await.unwrap();
        ActivityRepository::new(db.pool())
            .insert(Some(7), "share_file", "/a.txt")
            .await
            .unwrap();

        let entries = ActivityRepository::new(db.pool()).list_recent(1).await.unwrap();
        assert_eq!(entries[0].user_id, Some(7));
    }

    #[tokio::test]
    async fn test_log_failure_is_swallowed() {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::query("DROP TABLE activity_log")
            .execute(db.pool())
            .await
            .unwrap();

        let logger = ActivityLogger::new(db.pool().clone());
        logger.log("list_folder", "/").await;
    }
}
