//! Configuration types.
//!
//! `PronounsConfig` represents the top-level `pronouns.toml`. Every field has
//! a default, so an empty or missing file yields a working setup.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.pronouns/pronouns.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PronounsConfig {
    /// Full six-form sets users can pick by subjective (e.g. `she`).
    #[serde(default = "default_predefined_sets")]
    pub predefined_sets: Vec<String>,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cloud: CloudConfig,
}

fn default_predefined_sets() -> Vec<String> {
    [
        "she/her/she's/her/hers/herself",
        "he/him/he's/his/his/himself",
        "they/them/they're/their/theirs/themself",
        "it/it/it's/its/its/itself",
        "xe/xem/xe's/xyr/xyrs/xemself",
        "ze/zir/ze's/zir/zirs/zirself",
        "fae/faer/fae's/faer/faers/faerself",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for PronounsConfig {
    fn default() -> Self {
        Self {
            predefined_sets: default_predefined_sets(),
            filter: FilterConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            retry: RetryConfig::default(),
            chat: ChatConfig::default(),
            server: ServerConfig::default(),
            cloud: CloudConfig::default(),
        }
    }
}

/// Content filter applied to custom (non-predefined) sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Case-insensitive regular expressions. A match rejects the set.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// SQLite connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Explicit database URL. Defaults to `{data_dir}/pronouns.db`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_max_readers() -> u32 {
    8
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_readers: default_max_readers(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

/// In-memory preference cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached records before LRU eviction.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_capacity() -> usize {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

/// Store call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Per-call timeout in milliseconds. Elapsed calls fail as unavailable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    3_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Bounded exponential backoff for transient storage failures and
/// version conflicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    50
}

fn default_max_delay_ms() -> u64 {
    1_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Chat bot front-end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Messages must start with this prefix to be treated as commands.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

fn default_command_prefix() -> String {
    "pn!".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
        }
    }
}

/// REST server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Shared pronoun-set database merged into the predefined sets at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Download the shared database. Off unless opted in.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cloud_url")]
    pub url: String,
    #[serde(default = "default_cloud_timeout_ms")]
    pub timeout_ms: u64,
    /// Last good download, relative to the data directory. Used when the
    /// database cannot be reached.
    #[serde(default = "default_cloud_cache_file")]
    pub cache_file: String,
}

fn default_cloud_url() -> String {
    "https://pn.lucypoulton.net/api/".to_string()
}

fn default_cloud_timeout_ms() -> u64 {
    3_000
}

fn default_cloud_cache_file() -> String {
    "cloud.json".to_string()
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_cloud_url(),
            timeout_ms: default_cloud_timeout_ms(),
            cache_file: default_cloud_cache_file(),
        }
    }
}
