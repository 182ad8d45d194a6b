use thiserror::Error;

/// Errors from the preference store and identity resolver.
///
/// `NotFound` is not a failure for display purposes: front-ends treat it
/// as an empty record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage corrupt: {0}")]
    StorageCorrupt(String),
}

impl StoreError {
    /// Whether retrying the same call after a backoff may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable(_))
    }
}

/// Errors from validating a platform-specific user ID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformIdError {
    #[error("platform id cannot be empty")]
    Empty,

    #[error("unknown platform: '{0}'")]
    UnknownPlatform(String),

    #[error("invalid game id: '{0}'")]
    InvalidGameId(String),

    #[error("invalid chat snowflake: '{0}'")]
    InvalidSnowflake(String),
}

/// Errors from parsing user-supplied pronouns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PronounError {
    #[error("no pronouns given")]
    Empty,

    #[error("unknown pronoun '{0}'")]
    UnknownPronoun(String),

    #[error("invalid pronoun set: {0}")]
    InvalidSet(String),

    #[error("pronoun set '{0}' is not allowed")]
    Filtered(String),
}

/// Errors from building runtime components out of configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid filter pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid predefined set '{set}': {source}")]
    InvalidPredefinedSet {
        set: String,
        #[source]
        source: PronounError,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::VersionConflict {
            expected: 1,
            actual: 3,
        };
        assert_eq!(err.to_string(), "version conflict: expected 1, found 3");
        assert_eq!(
            StoreError::StorageUnavailable("pool timed out".to_string()).to_string(),
            "storage unavailable: pool timed out"
        );
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(StoreError::StorageUnavailable("busy".into()).is_transient());
        assert!(!StoreError::StorageCorrupt("bad json".into()).is_transient());
        assert!(!StoreError::NotFound.is_transient());
        assert!(
            !StoreError::VersionConflict {
                expected: 0,
                actual: 1
            }
            .is_transient()
        );
    }

    #[test]
    fn test_pronoun_error_display() {
        let err = PronounError::UnknownPronoun("xyz".to_string());
        assert_eq!(err.to_string(), "unknown pronoun 'xyz'");
    }

    #[test]
    fn test_config_error_wraps_source() {
        let err = ConfigError::InvalidPredefinedSet {
            set: "she/her".to_string(),
            source: PronounError::InvalidSet("expected 6 parts, got 2".to_string()),
        };
        assert!(err.to_string().contains("she/her"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
