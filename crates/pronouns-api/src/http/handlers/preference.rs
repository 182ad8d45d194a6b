//! Direct record API: read, compare-and-set, clear and history.
//!
//! Writes here are plain CAS calls. A stale `expected_version` is a 409 and
//! the client decides whether to re-read and retry.

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pronouns_core::adapter::stored_form;
use pronouns_core::pronoun::PronounRegistry;
use pronouns_types::error::StoreError;
use pronouns_types::identity::{IdentityId, PlatformId};
use pronouns_types::record::{FrontEnd, PreferenceRecord, PreferenceRevision};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::platform::PlatformPath;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// A record as returned over HTTP, with its display form.
#[derive(Debug, Serialize)]
pub struct PreferenceView {
    pub platform_id: PlatformId,
    pub identity_id: IdentityId,
    pub pronouns: Vec<String>,
    /// e.g. `She/Her, They/Them`, or `Unset`.
    pub display: String,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: FrontEnd,
}

impl PreferenceView {
    pub fn new(platform_id: PlatformId, record: PreferenceRecord, registry: &PronounRegistry) -> Self {
        let display = registry.describe(&registry.interpret(&record.pronouns));
        Self {
            platform_id,
            identity_id: record.identity_id,
            pronouns: record.pronouns,
            display,
            version: record.version,
            updated_at: record.updated_at,
            updated_by: record.updated_by,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetPronounsRequest {
    /// User-style input, e.g. `she/her they/them` or `any`.
    pub pronouns: String,
    /// Version the client last read; 0 when no record exists yet.
    pub expected_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct ExpectedVersionQuery {
    pub expected_version: Option<u64>,
}

fn self_link(platform_id: &PlatformId) -> String {
    format!(
        "/api/v1/identities/{}/{}/pronouns",
        platform_id.platform, platform_id.external_id
    )
}

/// Identity behind a platform ID, without creating one.
async fn existing_identity(state: &AppState, platform_id: &PlatformId) -> Result<IdentityId, AppError> {
    state
        .frontends
        .resolver
        .find(platform_id)
        .await?
        .ok_or(AppError::Store(StoreError::NotFound))
}

/// GET /api/v1/identities/{platform}/{id}/pronouns - Current record.
///
/// An identity that exists but never wrote gets the empty version-0 record.
pub async fn get_pronouns(
    State(state): State<AppState>,
    _auth: Authenticated,
    PlatformPath(platform_id): PlatformPath,
) -> Result<Json<ApiResponse<PreferenceView>>, AppError> {
    let start = Instant::now();

    let identity = existing_identity(&state, &platform_id).await?;
    let record = state.frontends.preferences.get_or_default(&identity).await?;

    let link = self_link(&platform_id);
    let view = PreferenceView::new(platform_id, record, &state.frontends.registry);
    Ok(Json(ApiResponse::timed(view, start).with_link("self", &link)))
}

/// PUT /api/v1/identities/{platform}/{id}/pronouns - Compare-and-set.
pub async fn set_pronouns(
    State(state): State<AppState>,
    _auth: Authenticated,
    PlatformPath(platform_id): PlatformPath,
    Json(body): Json<SetPronounsRequest>,
) -> Result<Json<ApiResponse<PreferenceView>>, AppError> {
    let start = Instant::now();

    let entries = state.frontends.registry.parse_input(&body.pronouns)?;
    let pronouns = stored_form(&entries);

    let identity = state.frontends.resolver.resolve(&platform_id).await?;
    let record = state
        .frontends
        .preferences
        .set(&identity, &pronouns, body.expected_version, FrontEnd::Api)
        .await?;
    let link = self_link(&platform_id);
    let view = PreferenceView::new(platform_id, record, &state.frontends.registry);
    Ok(Json(ApiResponse::timed(view, start).with_link("self", &link)))
}

/// DELETE /api/v1/identities/{platform}/{id}/pronouns?expected_version=N - Clear.
///
/// Clearing writes a new, empty version; history is kept.
pub async fn clear_pronouns(
    State(state): State<AppState>,
    _auth: Authenticated,
    PlatformPath(platform_id): PlatformPath,
    Query(query): Query<ExpectedVersionQuery>,
) -> Result<Json<ApiResponse<PreferenceView>>, AppError> {
    let start = Instant::now();

    let expected_version = query
        .expected_version
        .ok_or_else(|| AppError::Validation("expected_version query parameter is required".to_string()))?;

    let identity = existing_identity(&state, &platform_id).await?;
    let record = state
        .frontends
        .preferences
        .clear(&identity, expected_version, FrontEnd::Api)
        .await?;
    let link = self_link(&platform_id);
    let view = PreferenceView::new(platform_id, record, &state.frontends.registry);
    Ok(Json(ApiResponse::timed(view, start).with_link("self", &link)))
}

/// GET /api/v1/identities/{platform}/{id}/pronouns/history - Every write, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    _auth: Authenticated,
    PlatformPath(platform_id): PlatformPath,
) -> Result<Json<ApiResponse<Vec<PreferenceRevision>>>, AppError> {
    let start = Instant::now();

    let identity = existing_identity(&state, &platform_id).await?;
    let history = state.frontends.preferences.history(&identity).await?;

    let link = format!("{}/history", self_link(&platform_id));
    Ok(Json(ApiResponse::timed(history, start).with_link("self", &link)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;

    fn path(id: &str) -> PlatformPath {
        PlatformPath(PlatformId::game(id).unwrap())
    }

    fn set_body(pronouns: &str, expected_version: u64) -> Json<SetPronounsRequest> {
        Json(SetPronounsRequest {
            pronouns: pronouns.to_string(),
            expected_version,
        })
    }

    #[tokio::test]
    async fn unknown_player_is_not_found() {
        let (_dir, state) = test_state().await;
        let err = get_pronouns(State(state), Authenticated, path("nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn set_then_get_round_trip() {
        let (_dir, state) = test_state().await;

        let Json(resp) = set_pronouns(State(state.clone()), Authenticated, path("uuid-123"), set_body("they/them", 0))
            .await
            .unwrap();
        let written = resp.data.unwrap();
        assert_eq!(written.version, 1);
        assert_eq!(written.display, "They/Them");
        assert_eq!(written.updated_by, FrontEnd::Api);

        let Json(resp) = get_pronouns(State(state), Authenticated, path("uuid-123"))
            .await
            .unwrap();
        let read = resp.data.unwrap();
        assert_eq!(read.version, 1);
        assert_eq!(read.pronouns, vec!["they/them/they're/their/theirs/themself"]);
        assert_eq!(read.identity_id, written.identity_id);
        assert_eq!(read.updated_at, written.updated_at);
    }

    #[tokio::test]
    async fn stale_version_conflicts() {
        let (_dir, state) = test_state().await;
        set_pronouns(State(state.clone()), Authenticated, path("alex"), set_body("she", 0))
            .await
            .unwrap();

        let err = set_pronouns(State(state), Authenticated, path("alex"), set_body("he", 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Store(StoreError::VersionConflict { expected: 0, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn invalid_pronouns_are_rejected() {
        let (_dir, state) = test_state().await;
        let err = set_pronouns(State(state), Authenticated, path("alex"), set_body("", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn clear_requires_version_and_keeps_history() {
        let (_dir, state) = test_state().await;
        set_pronouns(State(state.clone()), Authenticated, path("steve"), set_body("he/him", 0))
            .await
            .unwrap();

        let missing = ExpectedVersionQuery { expected_version: None };
        let err = clear_pronouns(State(state.clone()), Authenticated, path("steve"), Query(missing))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let query = ExpectedVersionQuery { expected_version: Some(1) };
        let Json(resp) = clear_pronouns(State(state.clone()), Authenticated, path("steve"), Query(query))
            .await
            .unwrap();
        let cleared = resp.data.unwrap();
        assert_eq!(cleared.version, 2);
        assert!(cleared.pronouns.is_empty());
        assert_eq!(cleared.display, "Unset");

        let Json(resp) = get_history(State(state), Authenticated, path("steve")).await.unwrap();
        let history = resp.data.unwrap();
        let versions: Vec<u64> = history.iter().map(|r| r.version).collect();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(history[1].updated_at, cleared.updated_at);
    }
}
