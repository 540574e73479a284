//! Database schema and migrations for HDrive.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded. The schema_version table tracks which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Folder hierarchy with the root folder seeded
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id   INTEGER REFERENCES folders(id),   -- NULL only for the root
    name        TEXT NOT NULL,
    path        TEXT NOT NULL UNIQUE,             -- normalized logical path
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_folders_parent_id ON folders(parent_id);

INSERT INTO folders (parent_id, name, path) VALUES (NULL, '', '/');
"#,
    // v2: Files indexed under their owning folder
    r#"
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_id   INTEGER NOT NULL REFERENCES folders(id),
    name        TEXT NOT NULL,
    extension   TEXT NOT NULL DEFAULT '',
    size        INTEGER NOT NULL,
    path        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_folder_id ON files(folder_id);
"#,
    // v3: Shared links
    r#"
CREATE TABLE shared_links (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id     INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT,                             -- NULL = never expires
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_shared_links_file_id ON shared_links(file_id);
"#,
    // v4: Activity log
    r#"
CREATE TABLE activity_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER,
    action      TEXT NOT NULL,
    target      TEXT NOT NULL,
    timestamp   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_activity_log_timestamp ON activity_log(timestamp);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
        for migration in MIGRATIONS {
            assert!(migration.contains("CREATE TABLE"));
        }
    }
}
