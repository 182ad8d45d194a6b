//! SQLite identity repository implementation.
//!
//! Implements `IdentityRepository` from `pronouns-core` over the
//! `identities` and `platform_links` tables.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use pronouns_core::repository::identity::IdentityRepository;
use pronouns_types::error::StoreError;
use pronouns_types::identity::{IdentityId, Platform, PlatformId, PlatformLink};
use sqlx::Row;

use super::error::{corrupt, is_constraint_violation, map_sqlx_error};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `IdentityRepository`.
pub struct SqliteIdentityRepository {
    pool: DatabasePool,
}

impl SqliteIdentityRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct LinkRow {
    platform: String,
    external_id: String,
    identity_id: String,
    linked_at: String,
}

impl LinkRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            platform: row.try_get("platform")?,
            external_id: row.try_get("external_id")?,
            identity_id: row.try_get("identity_id")?,
            linked_at: row.try_get("linked_at")?,
        })
    }

    fn into_link(self) -> Result<PlatformLink, StoreError> {
        let platform = Platform::from_str(&self.platform).map_err(|e| corrupt("platform", e))?;
        let platform_id =
            PlatformId::new(platform, &self.external_id).map_err(|e| corrupt("external_id", e))?;
        Ok(PlatformLink {
            platform_id,
            identity_id: parse_identity(&self.identity_id)?,
            linked_at: parse_datetime(&self.linked_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn parse_identity(s: &str) -> Result<IdentityId, StoreError> {
    IdentityId::from_str(s).map_err(|e| corrupt("identity_id", e))
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt("datetime", e))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// IdentityRepository implementation
// ---------------------------------------------------------------------------

impl IdentityRepository for SqliteIdentityRepository {
    async fn find(&self, platform_id: &PlatformId) -> Result<Option<IdentityId>, StoreError> {
        let row = sqlx::query(
            "SELECT identity_id FROM platform_links WHERE platform = ? AND external_id = ?",
        )
        .bind(platform_id.platform.as_str())
        .bind(&platform_id.external_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => {
                let id: String = row.try_get("identity_id").map_err(map_sqlx_error)?;
                Ok(Some(parse_identity(&id)?))
            }
            None => Ok(None),
        }
    }

    async fn find_or_create(
        &self,
        platform_id: &PlatformId,
        candidate: IdentityId,
    ) -> Result<IdentityId, StoreError> {
        let now = format_datetime(&Utc::now());
        let candidate_str = candidate.to_string();

        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        // Both inserts are no-ops when a previous attempt with the same
        // candidate already committed, or another writer won the link.
        sqlx::query("INSERT INTO identities (id, created_at) VALUES (?, ?) ON CONFLICT (id) DO NOTHING")
            .bind(&candidate_str)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"INSERT INTO platform_links (platform, external_id, identity_id, linked_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (platform, external_id) DO NOTHING"#,
        )
        .bind(platform_id.platform.as_str())
        .bind(&platform_id.external_id)
        .bind(&candidate_str)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let winner: String = sqlx::query(
            "SELECT identity_id FROM platform_links WHERE platform = ? AND external_id = ?",
        )
        .bind(platform_id.platform.as_str())
        .bind(&platform_id.external_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .try_get("identity_id")
        .map_err(map_sqlx_error)?;

        if winner != candidate_str {
            // Lost the race: drop the unused identity row.
            sqlx::query(
                "DELETE FROM identities WHERE id = ? AND NOT EXISTS (SELECT 1 FROM platform_links WHERE identity_id = ?)",
            )
            .bind(&candidate_str)
            .bind(&candidate_str)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        parse_identity(&winner)
    }

    async fn exists(&self, identity: &IdentityId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM identities WHERE id = ?")
            .bind(identity.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.is_some())
    }

    async fn link(&self, platform_id: &PlatformId, identity: &IdentityId) -> Result<(), StoreError> {
        let now = format_datetime(&Utc::now());

        let result = sqlx::query(
            r#"INSERT INTO platform_links (platform, external_id, identity_id, linked_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (platform, external_id)
               DO UPDATE SET identity_id = excluded.identity_id, linked_at = excluded.linked_at"#,
        )
        .bind(platform_id.platform.as_str())
        .bind(&platform_id.external_id)
        .bind(identity.to_string())
        .bind(&now)
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            // Foreign key on identity_id: the target identity does not exist.
            Err(e) if is_constraint_violation(&e) => Err(StoreError::NotFound),
            Err(e) => Err(map_sqlx_error(e)),
        }
    }

    async fn links(&self, identity: &IdentityId) -> Result<Vec<PlatformLink>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT platform, external_id, identity_id, linked_at
               FROM platform_links WHERE identity_id = ?
               ORDER BY linked_at, platform, external_id"#,
        )
        .bind(identity.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| LinkRow::from_row(row).map_err(map_sqlx_error)?.into_link())
            .collect()
    }
}
