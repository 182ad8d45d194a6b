//! Preference records.
//!
//! A [`PreferenceRecord`] is the versioned pronoun data for one identity.
//! Each successful write bumps `version` by one and appends a
//! [`PreferenceRevision`] to the history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::identity::IdentityId;

/// Which front-end performed a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontEnd {
    Game,
    Chat,
    Cli,
    Api,
}

impl FrontEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrontEnd::Game => "game",
            FrontEnd::Chat => "chat",
            FrontEnd::Cli => "cli",
            FrontEnd::Api => "api",
        }
    }
}

impl fmt::Display for FrontEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrontEnd {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "game" => Ok(FrontEnd::Game),
            "chat" => Ok(FrontEnd::Chat),
            "cli" => Ok(FrontEnd::Cli),
            "api" => Ok(FrontEnd::Api),
            other => Err(format!("invalid front-end: '{other}'")),
        }
    }
}

/// Current pronoun preference for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub identity_id: IdentityId,
    /// Ordered pronoun entries. Opaque to the store.
    pub pronouns: Vec<String>,
    /// Monotonic write counter. 0 means "never written".
    pub version: u64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: FrontEnd,
}

impl PreferenceRecord {
    /// The record an identity has before its first write.
    pub fn empty(identity_id: IdentityId) -> Self {
        Self {
            identity_id,
            pronouns: Vec::new(),
            version: 0,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_by: FrontEnd::Api,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pronouns.is_empty()
    }
}

/// An immutable snapshot of one write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRevision {
    pub identity_id: IdentityId,
    pub version: u64,
    pub pronouns: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: FrontEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record() {
        let id = IdentityId::new();
        let record = PreferenceRecord::empty(id);
        assert_eq!(record.version, 0);
        assert!(record.is_empty());
        assert_eq!(record.identity_id, id);
    }

    #[test]
    fn test_front_end_roundtrip() {
        for fe in [FrontEnd::Game, FrontEnd::Chat, FrontEnd::Cli, FrontEnd::Api] {
            assert_eq!(fe.as_str().parse::<FrontEnd>().unwrap(), fe);
        }
        assert!("web".parse::<FrontEnd>().is_err());
    }

    #[test]
    fn test_record_serialize() {
        let record = PreferenceRecord {
            identity_id: IdentityId::new(),
            pronouns: vec!["they".to_string(), "them".to_string()],
            version: 1,
            updated_at: Utc::now(),
            updated_by: FrontEnd::Chat,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"pronouns\":[\"they\",\"them\"]"));
        assert!(json.contains("\"updated_by\":\"chat\""));
    }
}
