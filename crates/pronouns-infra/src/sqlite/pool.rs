//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. `DatabasePool` keeps a
//! multi-connection reader pool for concurrent lookups and a single-connection
//! writer pool, so compare-and-set writes from this process never contend
//! with each other for the database lock.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use pronouns_types::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Env var overriding the configured database URL.
pub const DATABASE_URL_ENV: &str = "PRONOUNS_DATABASE_URL";

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: up to `max_readers` connections for SELECT queries.
/// - `writer`: one connection for INSERT/UPDATE/DELETE.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open both pools and run migrations on the writer.
    ///
    /// `acquire_timeout` bounds how long a query waits for a free
    /// connection; elapsing surfaces as a transient storage error.
    pub async fn new(
        database_url: &str,
        config: &DatabaseConfig,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(acquire_timeout)
            .connect_with(write_opts)
            .await?;

        // Run migrations on writer before opening reader pool
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(config.max_readers.max(1))
            .acquire_timeout(acquire_timeout)
            .connect_with(read_opts)
            .await?;

        tracing::debug!(max_readers = config.max_readers, "database pools ready");
        Ok(Self { reader, writer })
    }

    /// Close both pools, waiting for in-flight queries.
    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}

/// Database URL to open.
///
/// Priority: `PRONOUNS_DATABASE_URL`, then `database.url` from config, then
/// `{data_dir}/pronouns.db`.
pub fn database_url(data_dir: &Path, config: &DatabaseConfig) -> String {
    if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
        if !url.trim().is_empty() {
            return url;
        }
    }
    match &config.url {
        Some(url) => url.clone(),
        None => default_database_url(data_dir),
    }
}

/// `sqlite://{data_dir}/pronouns.db`
pub fn default_database_url(data_dir: &Path) -> String {
    format!("sqlite://{}", data_dir.join("pronouns.db").display())
}
