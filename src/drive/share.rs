//! Shared links: token issuance and persistence.
//!
//! A shared link grants access to one file through an unguessable token.
//! Tokens are 32 bytes from the thread-local CSPRNG, hex-encoded to 64
//! characters. Expiry is optional and is enforced when a token is resolved.

use chrono::{DateTime, Datelike, Duration, Utc};
use rand::RngCore;
use sqlx::SqlitePool;
use tracing::info;

use crate::datetime::to_sqlite;
use crate::{DriveError, Result};

/// Token length in bytes before hex encoding.
pub const TOKEN_BYTES: usize = 32;

/// Latest year an index timestamp can hold.
const MAX_EXPIRY_YEAR: i32 = 9999;

/// A persisted shared link.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SharedLink {
    pub id: i64,
    pub file_id: i64,
    pub token: String,
    /// Expiry timestamp in index format; None never expires.
    pub expires_at: Option<String>,
    pub created_at: String,
}

/// Expiry instant `minutes` after `now`.
///
/// Fails with `InvalidParameter` when the instant does not fit the
/// four-digit years of the index timestamp format.
fn expiry_after(now: DateTime<Utc>, minutes: u32) -> Result<DateTime<Utc>> {
    now.checked_add_signed(Duration::minutes(i64::from(minutes)))
        .filter(|at| at.year() <= MAX_EXPIRY_YEAR)
        .ok_or_else(|| {
            DriveError::InvalidParameter(format!("expires: {minutes} minutes is out of range"))
        })
}

/// Generate a new share token: 64 lowercase hex characters.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Repository for shared link rows.
pub struct SharedLinkRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SharedLinkRepository<'a> {
    /// Create a new SharedLinkRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a shared link.
    pub async fn create(
        &self,
        file_id: i64,
        token: &str,
        expires_at: Option<&DateTime<Utc>>,
    ) -> Result<SharedLink> {
        let expires_at = expires_at.map(to_sqlite);

        let result =
            sqlx::query("INSERT INTO shared_links (file_id, token, expires_at) VALUES (?, ?, ?)")
                .bind(file_id)
                .bind(token)
                .bind(&expires_at)
                .execute(self.pool)
                .await?;

        let link = sqlx::query_as::<_, SharedLink>(
            "SELECT id, file_id, token, expires_at, created_at FROM shared_links WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(self.pool)
        .await?;

        Ok(link)
    }

    /// Get a link by token if it has not expired.
    pub async fn get_valid_by_token(&self, token: &str) -> Result<Option<SharedLink>> {
        let link = sqlx::query_as::<_, SharedLink>(
            "SELECT id, file_id, token, expires_at, created_at FROM shared_links
             WHERE token = ? AND (expires_at IS NULL OR expires_at > datetime('now'))",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(link)
    }
}

/// Issues shared links and builds their public URLs.
#[derive(Debug, Clone)]
pub struct ShareLinkIssuer {
    base_url: String,
}

impl ShareLinkIssuer {
    /// Create an issuer whose URLs start with `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Issue and persist a new link for a file.
    ///
    /// `expires_in_minutes` of None or 0 produces a link that never expires.
    /// An expiry past the end of year 9999 is rejected before anything is
    /// stored.
    pub async fn issue(
        &self,
        pool: &SqlitePool,
        file_id: i64,
        expires_in_minutes: Option<u32>,
    ) -> Result<SharedLink> {
        let expires_at = match expires_in_minutes {
            Some(minutes) if minutes > 0 => Some(expiry_after(Utc::now(), minutes)?),
            _ => None,
        };

        let token = generate_token();
        let link = SharedLinkRepository::new(pool)
            .create(file_id, &token, expires_at.as_ref())
            .await?;

        info!(file_id = file_id, expires_at = ?link.expires_at, "Shared link issued");
        Ok(link)
    }

    /// Public URL for a token.
    pub fn share_url(&self, token: &str) -> String {
        format!("{}/shared/{}", self.base_url, token)
    }
}
