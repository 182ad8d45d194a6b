//! Deny-list for custom pronoun sets.

use pronouns_types::config::FilterConfig;
use pronouns_types::error::{ConfigError, PronounError};
use pronouns_types::pronoun::PronounSet;
use regex::{Regex, RegexBuilder};

/// Compiled case-insensitive patterns. A match rejects the set.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    enabled: bool,
    patterns: Vec<Regex>,
}

impl ContentFilter {
    /// Patterns are compiled even when the filter is disabled.
    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        let patterns = config
            .patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enabled: config.enabled,
            patterns,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn check(&self, set: &PronounSet) -> Result<(), PronounError> {
        if !self.enabled {
            return Ok(());
        }
        let text = set.to_string();
        if self.patterns.iter().any(|p| p.is_match(&text)) {
            tracing::debug!(set = %text, "custom pronoun set rejected by filter");
            return Err(PronounError::Filtered(text));
        }
        Ok(())
    }
}
