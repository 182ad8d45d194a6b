//! Identity types.
//!
//! An [`IdentityId`] is the canonical internal key for one real-world user.
//! Platform-specific user IDs ([`PlatformId`]) map onto exactly one identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::error::PlatformIdError;

/// Longest accepted non-UUID game ID.
pub const MAX_GAME_ID_LEN: usize = 64;

/// Canonical identity key, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityId(pub Uuid);

impl IdentityId {
    /// Create a new IdentityId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IdentityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The platform a user ID comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Game server player (UUID, or an offline-mode player key).
    Game,
    /// Chat platform user (snowflake).
    Chat,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Game => "game",
            Platform::Chat => "chat",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PlatformIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "game" | "minecraft" => Ok(Platform::Game),
            "chat" | "discord" => Ok(Platform::Chat),
            other => Err(PlatformIdError::UnknownPlatform(other.to_string())),
        }
    }
}

/// A user ID as seen by one platform.
///
/// Construct through [`PlatformId::new`], which validates and normalises
/// the external ID for its platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformId {
    pub platform: Platform,
    pub external_id: String,
}

impl PlatformId {
    /// Validate and normalise an external ID.
    ///
    /// - Game: a UUID is rewritten to lowercase hyphenated form; anything else
    ///   must be a whitespace-free token of at most [`MAX_GAME_ID_LEN`] chars.
    /// - Chat: a snowflake, i.e. a decimal string that fits in a `u64`.
    pub fn new(platform: Platform, external_id: &str) -> Result<Self, PlatformIdError> {
        let raw = external_id.trim();
        if raw.is_empty() {
            return Err(PlatformIdError::Empty);
        }

        let external_id = match platform {
            Platform::Game => {
                if let Ok(uuid) = Uuid::parse_str(raw) {
                    uuid.hyphenated().to_string()
                } else if raw.len() > MAX_GAME_ID_LEN || raw.chars().any(char::is_whitespace) {
                    return Err(PlatformIdError::InvalidGameId(raw.to_string()));
                } else {
                    raw.to_string()
                }
            }
            Platform::Chat => {
                if !raw.bytes().all(|b| b.is_ascii_digit()) || raw.parse::<u64>().is_err() {
                    return Err(PlatformIdError::InvalidSnowflake(raw.to_string()));
                }
                raw.to_string()
            }
        };

        Ok(Self {
            platform,
            external_id,
        })
    }

    /// Shorthand for a game player ID.
    pub fn game(external_id: &str) -> Result<Self, PlatformIdError> {
        Self::new(Platform::Game, external_id)
    }

    /// Shorthand for a chat user ID.
    pub fn chat(external_id: &str) -> Result<Self, PlatformIdError> {
        Self::new(Platform::Chat, external_id)
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.external_id)
    }
}

/// Mapping of one platform ID to its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLink {
    pub platform_id: PlatformId,
    pub identity_id: IdentityId,
    pub linked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_uuid_is_normalised() {
        let id = PlatformId::game("0F3E2B7C-8A1D-4C55-9E0B-2D3F4A5B6C7D").unwrap();
        assert_eq!(id.external_id, "0f3e2b7c-8a1d-4c55-9e0b-2d3f4a5b6c7d");

        let simple = PlatformId::game("0f3e2b7c8a1d4c559e0b2d3f4a5b6c7d").unwrap();
        assert_eq!(simple, id);
    }

    #[test]
    fn test_game_accepts_offline_token() {
        let id = PlatformId::game("uuid-123").unwrap();
        assert_eq!(id.external_id, "uuid-123");
        assert_eq!(id.to_string(), "game:uuid-123");
    }

    #[test]
    fn test_game_rejects_whitespace_and_long_ids() {
        assert!(matches!(
            PlatformId::game("two words"),
            Err(PlatformIdError::InvalidGameId(_))
        ));
        let long = "x".repeat(MAX_GAME_ID_LEN + 1);
        assert!(PlatformId::game(&long).is_err());
    }

    #[test]
    fn test_chat_requires_snowflake() {
        assert!(PlatformId::chat("80351110224678912").is_ok());
        assert!(matches!(
            PlatformId::chat("abc"),
            Err(PlatformIdError::InvalidSnowflake(_))
        ));
        // Larger than u64::MAX
        assert!(PlatformId::chat("99999999999999999999999").is_err());
        assert!(matches!(PlatformId::chat("  "), Err(PlatformIdError::Empty)));
    }

    #[test]
    fn test_platform_from_str_aliases() {
        assert_eq!("minecraft".parse::<Platform>().unwrap(), Platform::Game);
        assert_eq!("Discord".parse::<Platform>().unwrap(), Platform::Chat);
        assert!("irc".parse::<Platform>().is_err());
    }

    #[test]
    fn test_identity_id_roundtrip() {
        let id = IdentityId::new();
        let parsed: IdentityId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
