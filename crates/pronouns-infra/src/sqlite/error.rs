//! Mapping from sqlx errors onto the store error taxonomy.
//!
//! Anything that might succeed on a later attempt (pool exhaustion, I/O,
//! `SQLITE_BUSY`/`SQLITE_LOCKED`) is `StorageUnavailable`. Data that cannot
//! be decoded, or a database SQLite itself reports as damaged, is
//! `StorageCorrupt`.

use pronouns_types::error::StoreError;

// Primary SQLite result codes (extended codes carry these in the low byte).
const SQLITE_READONLY: i32 = 8;
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_IOERR: i32 = 10;
const SQLITE_CORRUPT: i32 = 11;
const SQLITE_FULL: i32 = 13;
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_CONSTRAINT: i32 = 19;
const SQLITE_NOTADB: i32 = 26;

/// Primary result code of a database error, if SQLite reported one.
pub(crate) fn primary_code(err: &sqlx::Error) -> Option<i32> {
    match err {
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| code & 0xff),
        _ => None,
    }
}

pub(crate) fn is_constraint_violation(err: &sqlx::Error) -> bool {
    primary_code(err) == Some(SQLITE_CONSTRAINT)
}

pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_) => StoreError::StorageUnavailable(err.to_string()),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::StorageCorrupt(err.to_string()),
        sqlx::Error::Database(_) => match primary_code(&err) {
            Some(
                SQLITE_BUSY | SQLITE_LOCKED | SQLITE_IOERR | SQLITE_FULL | SQLITE_CANTOPEN
                | SQLITE_READONLY,
            ) => StoreError::StorageUnavailable(err.to_string()),
            Some(SQLITE_CORRUPT | SQLITE_NOTADB) => StoreError::StorageCorrupt(err.to_string()),
            // Constraint failures and schema errors mean the stored data no
            // longer matches what this code writes.
            _ => StoreError::StorageCorrupt(err.to_string()),
        },
        _ => StoreError::StorageUnavailable(err.to_string()),
    }
}

pub(crate) fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::StorageCorrupt(format!("invalid {what}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_transient() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
    }

    #[test]
    fn row_not_found_is_not_found() {
        assert_eq!(map_sqlx_error(sqlx::Error::RowNotFound), StoreError::NotFound);
    }

    #[test]
    fn missing_column_is_corrupt() {
        let err = map_sqlx_error(sqlx::Error::ColumnNotFound("pronouns".to_string()));
        assert!(matches!(err, StoreError::StorageCorrupt(_)));
    }

    #[test]
    fn io_error_is_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk went away");
        assert!(map_sqlx_error(sqlx::Error::Io(io)).is_transient());
    }

    #[tokio::test]
    async fn database_errors_use_result_code() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("codes.db").display());
        let pool = sqlx::SqlitePool::connect(&url).await.unwrap();

        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (id) VALUES (1)")
            .execute(&pool)
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO t (id) VALUES (1)")
            .execute(&pool)
            .await
            .unwrap_err();

        assert!(is_constraint_violation(&err));
        assert!(matches!(map_sqlx_error(err), StoreError::StorageCorrupt(_)));
    }
}
