//! API key authentication extractor.
//!
//! Extracts and verifies API keys from:
//! - `Authorization: Bearer <key>` header
//! - `X-API-Key: <key>` header
//!
//! Keys are SHA-256 hashed and compared against the `api_keys` table.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pronouns_infra::sqlite::error::map_sqlx_error;
use sha2::{Digest, Sha256};
use sqlx::Row;

use crate::http::error::AppError;
use crate::state::AppState;

/// Prefix of generated keys, so they are recognisable in config files.
const KEY_PREFIX: &str = "pn_";

/// Authenticated request marker. Extracting this validates the API key.
pub struct Authenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = extract_api_key(parts)?;
        let key_hash = hash_api_key(&api_key);

        let row = sqlx::query("SELECT id FROM api_keys WHERE key_hash = ?")
            .bind(&key_hash)
            .fetch_optional(&state.db_pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            tracing::debug!("rejected request with unknown api key");
            return Err(AppError::Unauthorized(
                "Invalid API key. Provide a valid key via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
            ));
        };

        // Best effort: a failed timestamp update does not fail the request.
        let id: String = row.try_get("id").map_err(map_sqlx_error)?;
        let now = chrono::Utc::now().to_rfc3339();
        if let Err(e) = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&id)
            .execute(&state.db_pool.writer)
            .await
        {
            tracing::debug!(error = %e, "could not record api key use");
        }
        Ok(Authenticated)
    }
}

/// Extract the API key from request headers.
fn extract_api_key(parts: &Parts) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            return Ok(key.trim().to_string());
        }
    }

    if let Some(key) = parts.headers.get("x-api-key") {
        let key_str = key.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid X-API-Key header encoding".to_string())
        })?;
        return Ok(key_str.trim().to_string());
    }

    Err(AppError::Unauthorized(
        "Missing API key. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
    ))
}

/// Compute SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}

/// Create the first API key if none exists.
///
/// Returns the plaintext key when one was generated. Only the hash is
/// stored, so this is the one chance to show it.
pub async fn ensure_api_key(state: &AppState) -> anyhow::Result<Option<String>> {
    let existing = sqlx::query("SELECT id FROM api_keys LIMIT 1")
        .fetch_optional(&state.db_pool.reader)
        .await?;
    if existing.is_some() {
        return Ok(None);
    }

    use aes_gcm::aead::{OsRng, rand_core::RngCore};
    let mut key_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut key_bytes);
    let plaintext_key = format!(
        "{KEY_PREFIX}{}",
        key_bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    );

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("INSERT INTO api_keys (id, key_hash, name, created_at) VALUES (?, ?, 'default', ?)")
        .bind(&id)
        .bind(hash_api_key(&plaintext_key))
        .bind(&now)
        .execute(&state.db_pool.writer)
        .await?;

    tracing::info!(key_id = %id, "generated api key");
    Ok(Some(plaintext_key))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;
    use crate::state::tests::test_state;

    fn parts(header: Option<(&str, &str)>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/sets");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_api_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn extracts_bearer_and_header_keys() {
        let bearer = parts(Some(("authorization", "Bearer pn_abc ")));
        assert_eq!(extract_api_key(&bearer).unwrap(), "pn_abc");

        let header = parts(Some(("x-api-key", "pn_def")));
        assert_eq!(extract_api_key(&header).unwrap(), "pn_def");
    }

    #[test]
    fn missing_key_is_unauthorized() {
        assert!(matches!(
            extract_api_key(&parts(None)),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn generated_key_authenticates_once_created() {
        let (_dir, state) = test_state().await;

        let key = ensure_api_key(&state).await.unwrap().unwrap();
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), KEY_PREFIX.len() + 64);
        // Second call keeps the existing key.
        assert!(ensure_api_key(&state).await.unwrap().is_none());

        let bearer = format!("Bearer {key}");
        let mut good = parts(Some(("authorization", bearer.as_str())));
        assert!(Authenticated::from_request_parts(&mut good, &state).await.is_ok());

        let mut bad = parts(Some(("x-api-key", "pn_nope")));
        assert!(matches!(
            Authenticated::from_request_parts(&mut bad, &state).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
