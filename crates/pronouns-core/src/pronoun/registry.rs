//! Predefined pronoun sets and input parsing.

use std::fmt;

use pronouns_types::config::PronounsConfig;
use pronouns_types::error::{ConfigError, PronounError};
use pronouns_types::pronoun::{PronounSet, SEPARATOR, SET_FORMS};

use super::filter::ContentFilter;

const ANY: &str = "any";
const ASK: &str = "ask";

/// One stored pronoun preference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PronounEntry {
    Set(PronounSet),
    /// Any pronouns are fine.
    Any,
    /// Ask the user.
    Ask,
}

impl PronounEntry {
    /// Parse the stored form: a full six-form set, `any` or `ask`.
    pub fn from_stored(value: &str) -> Result<Self, PronounError> {
        match value.trim().to_lowercase().as_str() {
            ANY => Ok(Self::Any),
            ASK => Ok(Self::Ask),
            other => PronounSet::parse(other).map(Self::Set),
        }
    }

    /// Short display name, e.g. `She/Her`.
    pub fn formatted(&self) -> String {
        match self {
            Self::Set(set) => set.formatted(),
            Self::Any => "Any".to_string(),
            Self::Ask => "Ask me".to_string(),
        }
    }

    pub fn as_set(&self) -> Option<&PronounSet> {
        match self {
            Self::Set(set) => Some(set),
            _ => None,
        }
    }
}

impl fmt::Display for PronounEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(set) => write!(f, "{set}"),
            Self::Any => f.write_str(ANY),
            Self::Ask => f.write_str(ASK),
        }
    }
}

/// Known sets plus the rules for reading user input.
#[derive(Debug, Clone)]
pub struct PronounRegistry {
    predefined: Vec<PronounSet>,
    fallback: PronounSet,
    filter: ContentFilter,
}

impl PronounRegistry {
    pub fn new(predefined: Vec<PronounSet>, filter: ContentFilter) -> Self {
        let fallback = predefined
            .iter()
            .find(|s| s.subjective == "they")
            .cloned()
            .unwrap_or_else(they_them);
        Self {
            predefined,
            fallback,
            filter,
        }
    }

    pub fn from_config(config: &PronounsConfig) -> Result<Self, ConfigError> {
        let predefined = config
            .predefined_sets
            .iter()
            .map(|set| {
                PronounSet::parse(set).map_err(|source| ConfigError::InvalidPredefinedSet {
                    set: set.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let filter = ContentFilter::from_config(&config.filter)?;
        Ok(Self::new(predefined, filter))
    }

    /// Append sets from the shared database after the configured ones.
    ///
    /// Configured sets keep precedence in `lookup`. Exact duplicates,
    /// unparseable strings and sets the content filter rejects are skipped.
    /// Returns how many sets were added.
    pub fn merge_shared<I, S>(&mut self, sets: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for raw in sets {
            let raw = raw.as_ref();
            let set = match PronounSet::parse(raw) {
                Ok(set) => set,
                Err(e) => {
                    tracing::warn!(set = %raw, error = %e, "skipping unreadable shared pronoun set");
                    continue;
                }
            };
            if self.predefined.contains(&set) || self.filter.check(&set).is_err() {
                continue;
            }
            self.predefined.push(set);
            added += 1;
        }
        added
    }

    pub fn predefined(&self) -> &[PronounSet] {
        &self.predefined
    }

    /// Set shown for users who have none: they/them.
    pub fn default_set(&self) -> &PronounSet {
        &self.fallback
    }

    pub fn filter(&self) -> &ContentFilter {
        &self.filter
    }

    /// Predefined set by subjective, case-insensitive.
    pub fn lookup(&self, subjective: &str) -> Option<&PronounSet> {
        self.predefined
            .iter()
            .find(|s| s.subjective.eq_ignore_ascii_case(subjective))
    }

    /// Parse user input such as `she/her`, `she/they`, `any` or a full
    /// six-form custom set.
    ///
    /// Tokens are split on `/` and whitespace. Each token must name a
    /// predefined subjective; a following token equal to that set's
    /// objective is consumed with it. When that fails and exactly six tokens
    /// were given, they are read as one custom set and run through the
    /// content filter. Duplicates are dropped, keeping first occurrence.
    pub fn parse_input(&self, input: &str) -> Result<Vec<PronounEntry>, PronounError> {
        let tokens: Vec<&str> = input
            .split(|c: char| c == SEPARATOR || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(PronounError::Empty);
        }

        let entries = match self.parse_tokens(&tokens) {
            Ok(entries) => entries,
            Err(_) if tokens.len() == SET_FORMS => vec![self.parse_custom(&tokens)?],
            Err(e) => return Err(e),
        };

        let mut unique = Vec::with_capacity(entries.len());
        for entry in entries {
            if !unique.contains(&entry) {
                unique.push(entry);
            }
        }
        Ok(unique)
    }

    fn parse_tokens(&self, tokens: &[&str]) -> Result<Vec<PronounEntry>, PronounError> {
        let mut entries = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            if token.eq_ignore_ascii_case(ANY) {
                entries.push(PronounEntry::Any);
            } else if token.eq_ignore_ascii_case(ASK) {
                entries.push(PronounEntry::Ask);
            } else {
                let set = self
                    .lookup(token)
                    .ok_or_else(|| PronounError::UnknownPronoun(token.to_string()))?;
                if tokens
                    .get(i + 1)
                    .is_some_and(|next| next.eq_ignore_ascii_case(&set.objective))
                {
                    i += 1;
                }
                entries.push(PronounEntry::Set(set.clone()));
            }
            i += 1;
        }
        Ok(entries)
    }

    fn parse_custom(&self, tokens: &[&str]) -> Result<PronounEntry, PronounError> {
        let set = PronounSet::parse(&tokens.join(&SEPARATOR.to_string()))?;
        if !self.predefined.contains(&set) {
            self.filter.check(&set)?;
        }
        Ok(PronounEntry::Set(set))
    }

    /// Read stored strings back into entries.
    ///
    /// Besides full sets, bare words written through the record API are
    /// understood: `["they", "them"]` reads as the they/them set. Anything
    /// else is skipped with a warning.
    pub fn interpret(&self, stored: &[String]) -> Vec<PronounEntry> {
        let mut entries: Vec<PronounEntry> = Vec::with_capacity(stored.len());
        for value in stored {
            if let Ok(entry) = PronounEntry::from_stored(value) {
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
                continue;
            }
            if let Some(set) = self.lookup(value.trim()) {
                let entry = PronounEntry::Set(set.clone());
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
                continue;
            }
            let is_objective_of_previous = entries
                .last()
                .and_then(PronounEntry::as_set)
                .is_some_and(|set| set.objective.eq_ignore_ascii_case(value.trim()));
            if !is_objective_of_previous {
                tracing::warn!(value = %value, "skipping unreadable stored pronoun");
            }
        }
        entries
    }

    /// Display line for a user's entries, e.g. `She/Her, They/Them`.
    pub fn describe(&self, entries: &[PronounEntry]) -> String {
        if entries.is_empty() {
            return "Unset".to_string();
        }
        entries
            .iter()
            .map(PronounEntry::formatted)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for PronounRegistry {
    fn default() -> Self {
        // The built-in sets always parse.
        Self::from_config(&PronounsConfig::default())
            .unwrap_or_else(|_| Self::new(vec![they_them()], ContentFilter::default()))
    }
}

fn they_them() -> PronounSet {
    PronounSet {
        subjective: "they".to_string(),
        objective: "them".to_string(),
        progressive: "they're".to_string(),
        possessive_adjective: "their".to_string(),
        possessive_pronoun: "theirs".to_string(),
        reflexive: "themself".to_string(),
    }
}
