//! Shared pronoun-set database.
//!
//! When `[cloud] enabled = true`, startup downloads the shared database and
//! keeps the raw response at `{data_dir}/{cache_file}`. If the download fails
//! the last cached copy is used instead, so an offline server still knows the
//! sets it saw before. The sets are merged into the registry by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use pronouns_types::config::CloudConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Contents of the shared database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDatabase {
    /// Who published this copy.
    #[serde(default)]
    pub source: String,
    #[serde(default, rename = "updatedAt")]
    pub updated_at: Option<String>,
    /// Six-form set strings, e.g. `ey/em/ey's/eir/eirs/emself`.
    #[serde(default)]
    pub sets: Vec<String>,
}

pub fn parse_database(content: &str) -> Result<SharedDatabase, serde_json::Error> {
    serde_json::from_str(content)
}

pub struct CloudClient {
    url: String,
    cache_path: PathBuf,
    http: reqwest::Client,
}

impl CloudClient {
    pub fn new(data_dir: &Path, config: &CloudConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pronouns/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();

        Self {
            url: config.url.clone(),
            cache_path: data_dir.join(&config.cache_file),
            http,
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Download the database and replace the cached copy.
    pub async fn update(&self) -> anyhow::Result<SharedDatabase> {
        info!(url = %self.url, "updating shared pronoun database");
        let body = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("Failed to reach shared pronoun database")?
            .error_for_status()
            .context("Shared pronoun database returned error")?
            .text()
            .await
            .context("Failed to read shared pronoun database response")?;

        // Validate before overwriting a good cache with garbage.
        let database = parse_database(&body).context("Failed to parse shared pronoun database")?;
        tokio::fs::write(&self.cache_path, &body)
            .await
            .with_context(|| format!("Failed to write {}", self.cache_path.display()))?;
        Ok(database)
    }

    /// The cached copy, if there is a readable one.
    pub async fn load_cached(&self) -> Option<SharedDatabase> {
        let content = match tokio::fs::read_to_string(&self.cache_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read {}: {e}", self.cache_path.display());
                return None;
            }
        };
        match parse_database(&content) {
            Ok(database) => Some(database),
            Err(e) => {
                warn!("Failed to parse {}: {e}", self.cache_path.display());
                None
            }
        }
    }

    /// Fresh sets if the download works, else cached ones, else none.
    pub async fn sets(&self) -> Vec<String> {
        match self.update().await {
            Ok(database) => {
                info!(source = %database.source, sets = database.sets.len(), "shared pronoun database updated");
                database.sets
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "shared pronoun database unavailable, using cached copy");
                self.load_cached().await.map(|d| d.sets).unwrap_or_default()
            }
        }
    }
}

/// Sets from the shared database, or none when syncing is disabled.
pub async fn load_shared_sets(data_dir: &Path, config: &CloudConfig) -> Vec<String> {
    if !config.enabled {
        debug!("shared pronoun database disabled");
        return Vec::new();
    }
    CloudClient::new(data_dir, config).sets().await
}
