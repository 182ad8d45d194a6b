//! `/{platform}/{id}` path segments as a validated [`PlatformId`].

use std::str::FromStr;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use pronouns_types::error::PlatformIdError;
use pronouns_types::identity::{Platform, PlatformId};

use crate::http::error::AppError;

/// A platform ID taken from the first two path parameters.
pub struct PlatformPath(pub PlatformId);

impl<S: Send + Sync> FromRequestParts<S> for PlatformPath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((platform, id)) = Path::<(String, String)>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        Ok(PlatformPath(parse_platform_id(&platform, &id)?))
    }
}

pub fn parse_platform_id(platform: &str, id: &str) -> Result<PlatformId, PlatformIdError> {
    PlatformId::new(Platform::from_str(platform)?, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_normalises() {
        let pid = parse_platform_id("minecraft", "0F3E2B7C8A1D4C559E0B2D3F4A5B6C7D").unwrap();
        assert_eq!(pid.platform, Platform::Game);
        assert_eq!(pid.external_id, "0f3e2b7c-8a1d-4c55-9e0b-2d3f4a5b6c7d");

        assert_eq!(
            parse_platform_id("discord", "1234").unwrap(),
            PlatformId::chat("1234").unwrap()
        );
    }

    #[test]
    fn rejects_unknown_platform_and_bad_ids() {
        assert!(matches!(
            parse_platform_id("irc", "nick"),
            Err(PlatformIdError::UnknownPlatform(_))
        ));
        assert!(matches!(
            parse_platform_id("chat", "not-a-number"),
            Err(PlatformIdError::InvalidSnowflake(_))
        ));
    }
}
