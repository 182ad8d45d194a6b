//! Pronoun sets.
//!
//! A [`PronounSet`] holds the six grammatical forms of one set of pronouns
//! and serialises as `subjective/objective/progressive/possessive-adjective/
//! possessive-pronoun/reflexive`, e.g. `she/her/she's/her/hers/herself`.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::error::PronounError;

/// Number of forms in a full pronoun set.
pub const SET_FORMS: usize = 6;

/// Separator between forms in the serialised representation.
pub const SEPARATOR: char = '/';

/// The six grammatical forms of one set of pronouns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PronounSet {
    pub subjective: String,
    pub objective: String,
    pub progressive: String,
    pub possessive_adjective: String,
    pub possessive_pronoun: String,
    pub reflexive: String,
}

impl PronounSet {
    /// Parse `s/o/p/pa/pp/r`. Exactly six non-empty parts are required.
    pub fn parse(input: &str) -> Result<Self, PronounError> {
        let parts: Vec<&str> = input.split(SEPARATOR).map(str::trim).collect();
        if parts.len() != SET_FORMS {
            return Err(PronounError::InvalidSet(format!(
                "expected {SET_FORMS} parts, got {}",
                parts.len()
            )));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(PronounError::InvalidSet("empty pronoun form".to_string()));
        }

        Ok(Self {
            subjective: parts[0].to_lowercase(),
            objective: parts[1].to_lowercase(),
            progressive: parts[2].to_lowercase(),
            possessive_adjective: parts[3].to_lowercase(),
            possessive_pronoun: parts[4].to_lowercase(),
            reflexive: parts[5].to_lowercase(),
        })
    }

    /// Short display name, e.g. `She/Her`.
    pub fn formatted(&self) -> String {
        format!(
            "{}{SEPARATOR}{}",
            capitalise(&self.subjective),
            capitalise(&self.objective)
        )
    }
}

impl fmt::Display for PronounSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.subjective,
            self.objective,
            self.progressive,
            self.possessive_adjective,
            self.possessive_pronoun,
            self.reflexive
        )
    }
}

impl FromStr for PronounSet {
    type Err = PronounError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PronounSet {
    type Error = PronounError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PronounSet> for String {
    fn from(set: PronounSet) -> Self {
        set.to_string()
    }
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
