//! SQLite preference repository implementation.
//!
//! Implements `PreferenceRepository` from `pronouns-core`. Each write is one
//! transaction on the writer connection: read the current version, compare,
//! upsert the row and append the history revision. The guarded UPDATE
//! (`WHERE version = ?`) keeps the compare-and-set correct even against
//! another process sharing the database file.

use std::str::FromStr;

use chrono::Utc;
use pronouns_core::repository::preference::PreferenceRepository;
use pronouns_types::error::StoreError;
use pronouns_types::identity::IdentityId;
use pronouns_types::record::{FrontEnd, PreferenceRecord, PreferenceRevision};
use sqlx::Row;

use super::error::{corrupt, map_sqlx_error};
use super::identity::{format_datetime, parse_datetime, parse_identity};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `PreferenceRepository`.
pub struct SqlitePreferenceRepository {
    pool: DatabasePool,
}

impl SqlitePreferenceRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Shared shape of `preferences` and `preference_history` rows.
struct PreferenceRow {
    identity_id: String,
    pronouns: String,
    version: i64,
    updated_at: String,
    updated_by: String,
}

struct Decoded {
    identity_id: IdentityId,
    pronouns: Vec<String>,
    version: u64,
    updated_at: chrono::DateTime<Utc>,
    updated_by: FrontEnd,
}

impl PreferenceRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            identity_id: row.try_get("identity_id")?,
            pronouns: row.try_get("pronouns")?,
            version: row.try_get("version")?,
            updated_at: row.try_get("updated_at")?,
            updated_by: row.try_get("updated_by")?,
        })
    }

    fn decode(self) -> Result<Decoded, StoreError> {
        let pronouns: Vec<String> =
            serde_json::from_str(&self.pronouns).map_err(|e| corrupt("pronouns JSON", e))?;
        Ok(Decoded {
            identity_id: parse_identity(&self.identity_id)?,
            pronouns,
            version: decode_version(self.version)?,
            updated_at: parse_datetime(&self.updated_at)?,
            updated_by: FrontEnd::from_str(&self.updated_by).map_err(|e| corrupt("updated_by", e))?,
        })
    }

    fn into_record(self) -> Result<PreferenceRecord, StoreError> {
        let d = self.decode()?;
        Ok(PreferenceRecord {
            identity_id: d.identity_id,
            pronouns: d.pronouns,
            version: d.version,
            updated_at: d.updated_at,
            updated_by: d.updated_by,
        })
    }

    fn into_revision(self) -> Result<PreferenceRevision, StoreError> {
        let d = self.decode()?;
        Ok(PreferenceRevision {
            identity_id: d.identity_id,
            pronouns: d.pronouns,
            version: d.version,
            updated_at: d.updated_at,
            updated_by: d.updated_by,
        })
    }
}

fn decode_version(version: i64) -> Result<u64, StoreError> {
    u64::try_from(version).map_err(|_| corrupt("version", version))
}

// ---------------------------------------------------------------------------
// PreferenceRepository implementation
// ---------------------------------------------------------------------------

impl PreferenceRepository for SqlitePreferenceRepository {
    async fn get(&self, identity: &IdentityId) -> Result<PreferenceRecord, StoreError> {
        let row = sqlx::query(
            "SELECT identity_id, pronouns, version, updated_at, updated_by FROM preferences WHERE identity_id = ?",
        )
        .bind(identity.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => PreferenceRow::from_row(&row)
                .map_err(map_sqlx_error)?
                .into_record(),
            None => Err(StoreError::NotFound),
        }
    }

    async fn set(
        &self,
        identity: &IdentityId,
        pronouns: &[String],
        expected_version: u64,
        updated_by: FrontEnd,
    ) -> Result<PreferenceRecord, StoreError> {
        let identity_str = identity.to_string();
        let pronouns_json = serde_json::to_string(pronouns)
            .map_err(|e| StoreError::StorageCorrupt(format!("failed to serialize pronouns: {e}")))?;
        let updated_at = Utc::now();
        let now = format_datetime(&updated_at);

        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let current: Option<i64> = sqlx::query("SELECT version FROM preferences WHERE identity_id = ?")
            .bind(&identity_str)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .map(|row| row.try_get("version"))
            .transpose()
            .map_err(map_sqlx_error)?;
        let actual = match current {
            Some(v) => decode_version(v)?,
            None => 0,
        };
        if actual != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual,
            });
        }

        // `actual` came out of an i64 column, so both fit.
        let expected_i = actual as i64;
        let new_version = expected_i + 1;

        let affected = if expected_i == 0 {
            sqlx::query(
                r#"INSERT INTO preferences (identity_id, pronouns, version, updated_at, updated_by)
                   VALUES (?, ?, ?, ?, ?)
                   ON CONFLICT (identity_id) DO NOTHING"#,
            )
            .bind(&identity_str)
            .bind(&pronouns_json)
            .bind(new_version)
            .bind(&now)
            .bind(updated_by.as_str())
            .execute(&mut *tx)
            .await
        } else {
            sqlx::query(
                r#"UPDATE preferences
                   SET pronouns = ?, version = ?, updated_at = ?, updated_by = ?
                   WHERE identity_id = ? AND version = ?"#,
            )
            .bind(&pronouns_json)
            .bind(new_version)
            .bind(&now)
            .bind(updated_by.as_str())
            .bind(&identity_str)
            .bind(expected_i)
            .execute(&mut *tx)
            .await
        }
        .map_err(map_sqlx_error)?
        .rows_affected();

        if affected != 1 {
            // Another connection committed between our read and write.
            let actual = sqlx::query("SELECT version FROM preferences WHERE identity_id = ?")
                .bind(&identity_str)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?
                .map(|row| row.try_get::<i64, _>("version"))
                .transpose()
                .map_err(map_sqlx_error)?
                .map(decode_version)
                .transpose()?
                .unwrap_or(0);
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual,
            });
        }

        sqlx::query(
            r#"INSERT INTO preference_history (identity_id, version, pronouns, updated_at, updated_by)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&identity_str)
        .bind(new_version)
        .bind(&pronouns_json)
        .bind(&now)
        .bind(updated_by.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        tracing::debug!(identity = %identity, version = new_version, "preference row written");
        Ok(PreferenceRecord {
            identity_id: *identity,
            pronouns: pronouns.to_vec(),
            version: decode_version(new_version)?,
            updated_at,
            updated_by,
        })
    }

    async fn history(&self, identity: &IdentityId) -> Result<Vec<PreferenceRevision>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT identity_id, pronouns, version, updated_at, updated_by
               FROM preference_history WHERE identity_id = ?
               ORDER BY version ASC"#,
        )
        .bind(identity.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| PreferenceRow::from_row(row).map_err(map_sqlx_error)?.into_revision())
            .collect()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<PreferenceRecord>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT identity_id, pronouns, version, updated_at, updated_by
               FROM preferences
               ORDER BY updated_at DESC, identity_id
               LIMIT ? OFFSET ?"#,
        )
        .bind(limit.max(0))
        .bind(offset.max(0))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| PreferenceRow::from_row(row).map_err(map_sqlx_error)?.into_record())
            .collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM preferences")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;
        let count: i64 = row.try_get("count").map_err(map_sqlx_error)?;
        decode_version(count)
    }
}
