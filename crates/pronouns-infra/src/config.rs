//! Configuration loader for ProNouns.
//!
//! Reads `pronouns.toml` from the data directory (`~/.pronouns/` in
//! production) and deserializes it into [`PronounsConfig`]. Falls back to
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use pronouns_types::config::PronounsConfig;

/// Env var overriding the data directory.
pub const DATA_DIR_ENV: &str = "PRONOUNS_DATA_DIR";

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "pronouns.toml";

/// Resolve the data directory: `PRONOUNS_DATA_DIR`, else `~/.pronouns`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pronouns")
}

/// Load configuration from `{data_dir}/pronouns.toml`.
///
/// - If the file does not exist, returns [`PronounsConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Otherwise returns the parsed config; missing fields take their defaults.
pub async fn load_config(data_dir: &Path) -> PronounsConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", config_path.display());
            return PronounsConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return PronounsConfig::default();
        }
    };

    parse_config(&content).unwrap_or_else(|err| {
        tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
        PronounsConfig::default()
    })
}

pub fn parse_config(content: &str) -> Result<PronounsConfig, toml::de::Error> {
    toml::from_str::<PronounsConfig>(content)
}

/// Render a config as TOML, e.g. for a starter file written by `pronouns init`.
pub fn render_config(config: &PronounsConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}
