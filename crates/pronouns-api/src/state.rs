//! Application state wiring all services together.
//!
//! AppState holds the concrete adapters used by both CLI and REST API. The
//! core types are generic over repository traits; AppState pins them to the
//! SQLite implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pronouns_core::adapter::Frontends;
use pronouns_core::adapter::chat::ChatAdapter;
use pronouns_core::adapter::game::GameAdapter;
use pronouns_core::cache::PreferenceCache;
use pronouns_core::pronoun::PronounRegistry;
use pronouns_core::retry::RetryPolicy;
use pronouns_core::service::preference::PreferenceService;
use pronouns_core::service::resolver::IdentityResolver;
use pronouns_infra::cloud::load_shared_sets;
use pronouns_infra::config::{load_config, resolve_data_dir};
use pronouns_infra::sqlite::identity::SqliteIdentityRepository;
use pronouns_infra::sqlite::pool::{DatabasePool, database_url};
use pronouns_infra::sqlite::preference::SqlitePreferenceRepository;
use pronouns_types::config::PronounsConfig;
use tokio::runtime::Handle;

/// Concrete type aliases for the core generics pinned to infra implementations.
pub type SqliteFrontends = Frontends<SqliteIdentityRepository, SqlitePreferenceRepository>;

pub type SqliteGameAdapter = GameAdapter<SqliteIdentityRepository, SqlitePreferenceRepository>;

pub type SqliteChatAdapter = ChatAdapter<SqliteIdentityRepository, SqlitePreferenceRepository>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub frontends: Arc<SqliteFrontends>,
    pub game: Arc<SqliteGameAdapter>,
    pub chat: Arc<SqliteChatAdapter>,
    pub config: Arc<PronounsConfig>,
    pub data_dir: PathBuf,
    pub database_url: String,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;
        Self::open(&data_dir, config).await
    }

    /// Wire everything for an explicit data dir and config.
    pub async fn open(data_dir: &Path, config: PronounsConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_millis(config.storage.timeout_ms);
        let retry = RetryPolicy::from(&config.retry);

        let url = database_url(data_dir, &config.database);
        let db_pool = DatabasePool::new(&url, &config.database, timeout)
            .await
            .with_context(|| format!("opening database {url}"))?;

        // Capacity and filter patterns are validated here, at construction.
        let cache = Arc::new(PreferenceCache::new(config.cache.capacity).context("invalid [cache] config")?);
        let mut registry = PronounRegistry::from_config(&config).context("invalid pronoun config")?;
        let shared = load_shared_sets(data_dir, &config.cloud).await;
        if !shared.is_empty() {
            let added = registry.merge_shared(&shared);
            tracing::info!(added, "merged shared pronoun sets");
        }

        let resolver = IdentityResolver::new(
            SqliteIdentityRepository::new(db_pool.clone()),
            timeout,
            retry.clone(),
        );
        let preferences = PreferenceService::new(
            SqlitePreferenceRepository::new(db_pool.clone()),
            cache,
            timeout,
            retry,
        );

        let frontends = Arc::new(Frontends::new(resolver, preferences, registry));
        let game = GameAdapter::new(Arc::clone(&frontends), Handle::current());
        let chat = ChatAdapter::new(Arc::clone(&frontends), config.chat.command_prefix.clone());

        tracing::debug!(data_dir = %data_dir.display(), "application state ready");

        Ok(Self {
            frontends,
            game: Arc::new(game),
            chat: Arc::new(chat),
            config: Arc::new(config),
            data_dir: data_dir.to_path_buf(),
            database_url: url,
            db_pool,
        })
    }

    /// Drain background adapter work and close the database.
    pub async fn shutdown(&self) {
        self.game.shutdown().await;
        self.chat.shutdown().await;
        self.db_pool.close().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// State over a throwaway database. Keep the `TempDir` alive for the test.
    pub(crate) async fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PronounsConfig::default();
        config.database.url = Some(format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("test.db").display()
        ));
        config.retry.base_delay_ms = 1;
        config.retry.max_delay_ms = 5;
        let state = AppState::open(dir.path(), config).await.unwrap();
        (dir, state)
    }

    #[tokio::test]
    async fn open_wires_config_into_adapters() {
        let (_dir, state) = test_state().await;
        assert_eq!(state.chat.prefix(), "pn!");
        assert_eq!(state.frontends.registry.predefined().len(), 7);
        assert!(state.database_url.ends_with("test.db?mode=rwc"));
    }

    #[tokio::test]
    async fn open_merges_cached_shared_sets() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("cloud.json"),
            r#"{"source": "test", "sets": ["ey/em/ey's/eir/eirs/emself"]}"#,
        )
        .await
        .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let unreachable = format!("http://{}/api/", listener.local_addr().unwrap());
        drop(listener);

        let mut config = PronounsConfig::default();
        config.database.url = Some(format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("test.db").display()
        ));
        config.cloud.enabled = true;
        config.cloud.url = unreachable;

        let state = AppState::open(dir.path(), config).await.unwrap();
        assert_eq!(state.frontends.registry.predefined().len(), 8);
        assert!(state.frontends.registry.lookup("ey").is_some());
    }

    #[tokio::test]
    async fn open_rejects_zero_cache_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PronounsConfig::default();
        config.database.url = Some(format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("test.db").display()
        ));
        config.cache.capacity = 0;
        assert!(AppState::open(dir.path(), config).await.is_err());
    }
}
